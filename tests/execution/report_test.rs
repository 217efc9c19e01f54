//! Integration tests for report generation and export.

use indicator_sql::execution::{
    report_to_csv, report_to_json, ExecutionService, GeneratedReport, ReportDefinition,
    ReportRunner, RunOptions, SlotOutcome, SqliteSessionFactory, CSV_BOM,
};
use serde_json::{json, Value};
use std::path::PathBuf;

struct TempDb(PathBuf);

impl TempDb {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("indicator-sql-{}.db", uuid::Uuid::new_v4())))
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn seeded() -> TempDb {
    let db = TempDb::new();
    let service = ExecutionService::open(&db.0).unwrap();
    service
        .connection()
        .execute_batch(
            "CREATE TABLE etudiants (id INTEGER, genre TEXT, filiere TEXT, bourse TEXT);
             INSERT INTO etudiants VALUES (1, 'f', 'info', 'oui'), (2, 'm', 'info', 'non'), (3, 'f', 'bio', 'non');
             ALTER TABLE etudiants DROP COLUMN bourse;",
        )
        .unwrap();
    db
}

fn report() -> ReportDefinition {
    ReportDefinition::from_json_str(
        &json!({
            "id": 4,
            "title": "Bilan annuel",
            "indicators": [
                {"id": 30, "title": "Par filière", "chart_type": "bar", "display_order": 3, "indicator": {
                    "sujet": {"tables": ["etudiants"]},
                    "colonnes": [
                        {"type": "group_by", "titre": "Filière", "expr": {"col": "filiere"}},
                        {"type": "aggregation", "titre": "Nombre", "expr": {"agg": "count", "col": "1"}}
                    ]
                }},
                {"id": 10, "title": "Femmes", "chart_type": "kpi", "display_order": 1, "indicator": {
                    "sujet": {"tables": ["etudiants"], "conditions": {"=": [{"col": "genre"}, "F"]}},
                    "colonnes": [{"type": "aggregation", "titre": "Nombre", "expr": {"agg": "count", "col": "1"}}]
                }},
                {"id": 20, "title": "Boursiers", "display_order": 2, "indicator": {
                    "sujet": {"tables": ["etudiants"], "conditions": {"=": [{"col": "bourse"}, "oui"]}},
                    "colonnes": [{"type": "aggregation", "titre": "Nombre", "expr": {"agg": "count", "col": "1"}}]
                }}
            ]
        })
        .to_string(),
    )
    .unwrap()
}

fn generate(db: &TempDb) -> GeneratedReport {
    let sessions = SqliteSessionFactory::new(&db.0);
    let options = RunOptions::default();
    ReportRunner::new(&sessions, &options).generate(&report())
}

#[test]
fn test_scenario_d_failed_slot_does_not_stop_report() {
    let db = seeded();
    let generated = generate(&db);

    assert_eq!(generated.report_id, 4);
    assert_eq!(generated.results.len(), 3);

    let ids: Vec<i64> = generated.results.iter().map(|r| r.indicator_id).collect();
    assert_eq!(ids, vec![10, 20, 30]);

    let first = &generated.results[0].execution_result;
    assert!(first.is_success());
    assert_eq!(first.rows()[0]["Nombre"], json!(2));

    let second = &generated.results[1].execution_result;
    assert!(second.error().is_some_and(|e| e.contains("bourse")));
    assert!(second.rows().is_empty());

    let third = &generated.results[2].execution_result;
    assert_eq!(third.rows().len(), 2);

    match first {
        SlotOutcome::Success(result) => {
            assert_eq!(result.indicator_id, Some(10));
            assert_eq!(result.indicator_title.as_deref(), Some("Femmes"));
        }
        SlotOutcome::Failure(failed) => panic!("unexpected failure: {}", failed.error),
    }
}

#[test]
fn test_report_json_envelope() {
    let db = seeded();
    let text = report_to_json(&generate(&db)).unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value["report_title"], json!("Bilan annuel"));
    assert!(chrono::DateTime::parse_from_rfc3339(value["generated_at"].as_str().unwrap()).is_ok());
    assert_eq!(value["results"][0]["chart_type"], json!("kpi"));
    assert_eq!(value["results"][1]["chart_type"], json!(null));

    let failed = &value["results"][1]["execution_result"];
    assert_eq!(failed["rows"], json!([]));
    assert_eq!(failed["columns"], json!([]));
    assert_eq!(failed["row_count"], json!(0));

    let parsed: GeneratedReport = serde_json::from_str(&text).unwrap();
    assert!(!parsed.results[1].execution_result.is_success());
}

#[test]
fn test_report_csv_skips_failed_indicators() {
    let db = seeded();
    let mut out = Vec::new();
    report_to_csv(&generate(&db), &mut out).unwrap();

    assert!(out.starts_with(CSV_BOM));
    let text = String::from_utf8(out[CSV_BOM.len()..].to_vec()).unwrap();
    assert!(!text.contains("Boursiers"));

    let blocks: Vec<&str> = text.split("\n\n").filter(|b| !b.is_empty()).collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0], "Indicateur: Femmes\nNombre\n2");

    let mut lines: Vec<&str> = blocks[1].lines().collect();
    assert_eq!(lines[..2], ["Indicateur: Par filière", "Filière;Nombre"]);
    let mut rows = lines.split_off(2);
    rows.sort();
    assert_eq!(rows, vec!["bio;1", "info;2"]);
}
