//! JSON and CSV export of results and reports.
//!
//! Report CSV layout, one block per successful indicator:
//!
//! ```text
//! \u{feff}Indicateur: <title>
//! <col1>;<col2>
//! <v1>;<v2>
//!
//! ```

use std::io::Write;

use csv::{Terminator, WriterBuilder};
use serde_json::Value;

use super::report::{GeneratedReport, SlotOutcome};
use super::service::ExecutionResult;
use crate::error::ExportError;

/// UTF-8 byte order mark, so spreadsheet tools pick the right encoding.
pub const CSV_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Delimiter of report CSV files.
pub const REPORT_CSV_DELIMITER: u8 = b';';

/// The report envelope as pretty-printed JSON.
pub fn report_to_json(report: &GeneratedReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write a report as CSV. Failed indicators are skipped.
pub fn report_to_csv<W: Write>(report: &GeneratedReport, mut out: W) -> Result<(), ExportError> {
    out.write_all(CSV_BOM)?;

    for slot in &report.results {
        let SlotOutcome::Success(result) = &slot.execution_result else {
            continue;
        };

        let mut writer = WriterBuilder::new()
            .delimiter(REPORT_CSV_DELIMITER)
            .terminator(Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(&mut out);
        writer.write_record([format!("Indicateur: {}", slot.indicator_title)])?;
        write_table(&mut writer, result)?;
        writer.flush()?;
        drop(writer);

        // Blank separator line; an empty record would be written as `""`
        out.write_all(b"\n")?;
    }

    out.flush()?;
    Ok(())
}

/// Write one result as CSV: header then rows.
///
/// Only `,`, `;` and tab are accepted.
pub fn result_to_csv<W: Write>(
    result: &ExecutionResult,
    delimiter: char,
    out: W,
) -> Result<(), ExportError> {
    let delimiter = match delimiter {
        ',' | ';' | '\t' => delimiter as u8,
        other => return Err(ExportError::Delimiter(other)),
    };

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);
    write_table(&mut writer, result)?;
    writer.flush()?;
    Ok(())
}

fn write_table<W: Write>(writer: &mut csv::Writer<W>, result: &ExecutionResult) -> Result<(), ExportError> {
    writer.write_record(&result.columns)?;
    for row in &result.rows {
        writer.write_record(
            result
                .columns
                .iter()
                .map(|column| cell(row.get(column).unwrap_or(&Value::Null))),
        )?;
    }
    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
