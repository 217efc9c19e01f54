//! Report generation: several indicators, one envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::service::{ExecutionResult, Row, SessionFactory};
use super::{run_indicator, RunOptions};
use crate::error::{IndicatorError, IndicatorResult};

/// A stored report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDefinition {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub indicators: Vec<ReportIndicator>,
}

impl ReportDefinition {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// One slot of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportIndicator {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    /// The indicator JSON, parsed when the slot runs.
    pub indicator: Value,
}

/// Generated report envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub report_id: i64,
    pub report_title: String,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ReportResult>,
}

/// Outcome of one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub indicator_id: i64,
    pub indicator_title: String,
    pub chart_type: Option<String>,
    pub execution_result: SlotOutcome,
}

/// Rows of a successful slot, or the error of a failed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotOutcome {
    Success(ExecutionResult),
    Failure(FailedExecution),
}

/// A failed slot keeps the result shape with no rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedExecution {
    pub error: String,
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
}

impl SlotOutcome {
    fn failed(err: &IndicatorError) -> Self {
        SlotOutcome::Failure(FailedExecution {
            error: err.to_string(),
            rows: vec![],
            columns: vec![],
            row_count: 0,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SlotOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SlotOutcome::Success(_) => None,
            SlotOutcome::Failure(failed) => Some(&failed.error),
        }
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            SlotOutcome::Success(result) => &result.rows,
            SlotOutcome::Failure(failed) => &failed.rows,
        }
    }
}

/// Runs every indicator of a report, strictly in sequence.
pub struct ReportRunner<'a, F: SessionFactory> {
    sessions: &'a F,
    options: &'a RunOptions,
}

impl<'a, F: SessionFactory> ReportRunner<'a, F> {
    pub fn new(sessions: &'a F, options: &'a RunOptions) -> Self {
        Self { sessions, options }
    }

    /// Evaluate slots in `display_order`; a failing slot is recorded and the
    /// next one still runs.
    pub fn generate(&self, report: &ReportDefinition) -> GeneratedReport {
        let mut slots: Vec<&ReportIndicator> = report.indicators.iter().collect();
        slots.sort_by_key(|slot| slot.display_order);

        info!(
            report_id = report.id,
            indicators = slots.len(),
            "generating report"
        );

        let results = slots
            .into_iter()
            .map(|slot| {
                let execution_result = match self.run_slot(slot) {
                    Ok(result) => SlotOutcome::Success(result),
                    Err(err) => {
                        warn!(
                            report_id = report.id,
                            indicator_id = slot.id,
                            kind = err.kind(),
                            error = %err,
                            "report indicator failed"
                        );
                        SlotOutcome::failed(&err)
                    }
                };
                ReportResult {
                    indicator_id: slot.id,
                    indicator_title: slot.title.clone(),
                    chart_type: slot.chart_type.clone(),
                    execution_result,
                }
            })
            .collect::<Vec<_>>();

        let failed = results
            .iter()
            .filter(|r| !r.execution_result.is_success())
            .count();
        info!(report_id = report.id, failed, "report generated");

        GeneratedReport {
            report_id: report.id,
            report_title: report.title.clone(),
            generated_at: Utc::now(),
            results,
        }
    }

    fn run_slot(&self, slot: &ReportIndicator) -> IndicatorResult<ExecutionResult> {
        let mut session = self.sessions.open_session()?;
        let result = run_indicator(&mut session, &slot.indicator, self.options)?;
        Ok(result.with_indicator(slot.id, &slot.title))
    }
}
