//! Integration tests for the execution service on SQLite files.

use indicator_sql::error::{ExecutionError, IndicatorError};
use indicator_sql::execution::{
    result_to_csv, run_indicator, ExecutionService, RunOptions, SessionFactory,
    SqliteSessionFactory,
};
use serde_json::json;
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
            "CREATE TABLE mobilite (id INTEGER PRIMARY KEY, pays TEXT, duree REAL, justificatif BLOB);
             INSERT INTO mobilite VALUES (1, 'espagne', 5.5, X'48656C6C6F');
             INSERT INTO mobilite VALUES (2, 'espagne', 3.0, NULL);
             INSERT INTO mobilite VALUES (3, 'canada', NULL, NULL);",
        )
        .unwrap();
    db
}

#[test]
fn test_scalar_coercion() {
    let db = seeded();
    let mut service = SqliteSessionFactory::new(&db.0).open_session().unwrap();

    let result = service
        .execute("SELECT id, pays, duree, justificatif, 1e999 AS infini FROM mobilite WHERE id = 1;")
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(row["id"], json!(1));
    assert_eq!(row["pays"], json!("espagne"));
    assert_eq!(row["duree"], json!(5.5));
    assert_eq!(row["justificatif"], json!("SGVsbG8="));
    assert_eq!(row["infini"], json!(null));
}

#[test]
fn test_failure_leaves_database_unchanged() {
    let db = seeded();
    let mut service = ExecutionService::open(&db.0).unwrap();

    // Second row collides with an existing key after the first was written
    let err = service
        .execute("INSERT INTO mobilite (id, pays) VALUES (10, 'italie'), (1, 'doublon');")
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Query { .. }));
    assert!(service.connection().is_autocommit());

    let mut fresh = ExecutionService::open(&db.0).unwrap();
    let result = fresh.execute("SELECT COUNT(*) AS n FROM mobilite;").unwrap();
    assert_eq!(result.rows[0]["n"], json!(3));
}

#[test]
fn test_missing_column_is_execution_error() {
    let db = seeded();
    let mut service = ExecutionService::open(&db.0).unwrap();

    let err = run_indicator(
        &mut service,
        &json!({
            "sujet": {"tables": ["mobilite"]},
            "colonnes": [{"type": "group_by", "titre": "Ville", "expr": {"col": "ville"}}]
        }),
        &RunOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), "execution");
    assert!(matches!(err, IndicatorError::Execution(ExecutionError::Query { .. })));
    assert!(err.to_string().contains("ville"));
}

#[test]
fn test_grouped_result_and_csv_export() {
    let db = seeded();
    let mut service = ExecutionService::open(&db.0).unwrap();

    let result = run_indicator(
        &mut service,
        &json!({
            "sujet": {"tables": ["mobilite"]},
            "colonnes": [
                {"type": "group_by", "titre": "Pays", "expr": {"col": "pays"}},
                {"type": "aggregation", "titre": "Durée totale", "expr": {"agg": "sum", "col": "duree"}},
                {"type": "aggregation", "titre": "Séjours", "expr": {"agg": "count_distinct", "col": "id"}}
            ]
        }),
        &RunOptions::default(),
    )
    .unwrap();

    assert_eq!(result.columns, vec!["Pays", "Durée totale", "Séjours"]);
    assert_eq!(result.row_count, 2);

    let mut out = Vec::new();
    result_to_csv(&result, ';', &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.remove(0), "Pays;Durée totale;Séjours");
    lines.sort();
    assert_eq!(lines, vec!["canada;;1", "espagne;8.5;2"]);
}
