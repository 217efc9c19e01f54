//! Integration tests for logical → physical schema resolution on a real
//! SQLite file.

use chrono::NaiveDate;
use indicator_sql::config::Settings;
use indicator_sql::error::{DataAvailabilityError, IndicatorError};
use indicator_sql::execution::{run_indicator, ExecutionService, RunOptions};
use indicator_sql::schema::{resolve_schema, ImportRecord, ImportRegistry, ResolveRequest};
use indicator_sql::IndicatorSpec;
use serde_json::json;
use std::path::PathBuf;

const SETTINGS: &str = r#"
[schema.periods]
6_mois = "_6m"
30_mois = "_30m"

[schema.tables.insertion_diplomes]
data_types = ["insertion"]

[[schema.tables.insertion_diplomes.columns]]
name = "situation"
prefixes = ["quelle_est_votre_situation"]
priority = ["actuelle"]
"#;

/// Temporary database file, removed on drop.
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

fn seed(db: &TempDb) {
    let service = ExecutionService::open(&db.0).unwrap();
    let conn = service.connection();
    conn.execute_batch(
        "CREATE TABLE imp_2021_a (id INTEGER, quelle_est_votre_situation_actuelle TEXT);
         INSERT INTO imp_2021_a VALUES (1, 'en emploi');

         CREATE TABLE imp_2022_b (
             id INTEGER,
             quelle_est_votre_situation_au_31_12 TEXT,
             quelle_est_votre_situation_actuelle TEXT
         );
         INSERT INTO imp_2022_b VALUES
             (1, 'etudiant', 'en emploi'),
             (2, 'en emploi', 'en emploi'),
             (3, 'en recherche', 'en recherche d''emploi');",
    )
    .unwrap();

    let at = |day| {
        NaiveDate::from_ymd_opt(2023, 2, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    };
    ImportRegistry::record(conn, &ImportRecord::new("insertion_2021_6m", "imp_2021_a", at(1))).unwrap();
    ImportRegistry::record(conn, &ImportRecord::new("insertion_2022_6m", "imp_2022_b", at(2))).unwrap();
}

fn indicator() -> serde_json::Value {
    json!({
        "sujet": {"tables": ["insertion_diplomes"], "conditions": {"=": [{"col": "situation"}, "En emploi"]}},
        "colonnes": [{"type": "aggregation", "titre": "En emploi", "expr": {"agg": "count", "col": "1"}}]
    })
}

#[test]
fn test_scenario_c_selects_requested_year() {
    let db = TempDb::new();
    seed(&db);
    let settings = Settings::from_toml(SETTINGS).unwrap();
    let service = ExecutionService::open(&db.0).unwrap();

    let request = ResolveRequest::new().with_period("6_mois").with_year("2022");
    let spec = IndicatorSpec::parse(&indicator()).unwrap();
    let catalog = resolve_schema(service.connection(), &settings.schema, &spec, &request).unwrap();

    assert_eq!(catalog.tables["insertion_diplomes"], "imp_2022_b");
    assert_eq!(
        catalog.columns["insertion_diplomes"]["situation"],
        "quelle_est_votre_situation_actuelle"
    );
}

#[test]
fn test_scenario_c_missing_year_is_data_availability_error() {
    let db = TempDb::new();
    seed(&db);
    let settings = Settings::from_toml(SETTINGS).unwrap();
    let mut service = ExecutionService::open(&db.0).unwrap();

    let options = RunOptions::from_settings(&settings)
        .with_request(ResolveRequest::new().with_period("6_mois").with_year("2023"));
    let err = run_indicator(&mut service, &indicator(), &options).unwrap_err();

    assert_eq!(err.kind(), "data_availability");
    match err {
        IndicatorError::DataAvailability(DataAvailabilityError::Table { table, available, .. }) => {
            assert_eq!(table, "insertion_diplomes");
            assert_eq!(available, vec!["insertion_2021_6m", "insertion_2022_6m"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_run_with_resolution() {
    let db = TempDb::new();
    seed(&db);
    let settings = Settings::from_toml(SETTINGS).unwrap();
    let mut service = ExecutionService::open(&db.0).unwrap();

    let options = RunOptions::from_settings(&settings)
        .with_request(ResolveRequest::new().with_period("6_mois").with_year("2022"));
    let result = run_indicator(&mut service, &indicator(), &options).unwrap();

    assert_eq!(
        result.sql,
        "SELECT COUNT(1) AS \"En emploi\" FROM imp_2022_b \
         WHERE quelle_est_votre_situation_actuelle = 'en emploi';"
    );
    assert_eq!(result.rows[0]["En emploi"], json!(2));

    // Without filters the newest import wins
    let options = RunOptions::from_settings(&settings);
    let result = run_indicator(&mut service, &indicator(), &options).unwrap();
    assert!(result.sql.contains("FROM imp_2022_b"));
}

#[test]
fn test_unconfigured_tables_pass_through() {
    let db = TempDb::new();
    seed(&db);
    let mut service = ExecutionService::open(&db.0).unwrap();

    let result = run_indicator(
        &mut service,
        &json!({
            "sujet": {"tables": ["imp_2021_a"]},
            "colonnes": [{"type": "aggregation", "titre": "N", "expr": {"agg": "count"}}]
        }),
        &RunOptions::default(),
    )
    .unwrap();
    assert_eq!(result.sql, "SELECT COUNT(*) AS \"N\" FROM imp_2021_a;");
    assert_eq!(result.rows[0]["N"], json!(1));
}

#[test]
fn test_empty_registry_reports_no_tags() {
    let db = TempDb::new();
    let settings = Settings::from_toml(SETTINGS).unwrap();
    let mut service = ExecutionService::open(&db.0).unwrap();

    let err = run_indicator(&mut service, &indicator(), &RunOptions::from_settings(&settings)).unwrap_err();
    assert!(matches!(
        err,
        IndicatorError::DataAvailability(DataAvailabilityError::Table { ref available, .. }) if available.is_empty()
    ));
}

#[test]
fn test_column_named_only_in_titles_and_literals_is_not_resolved() {
    let db = TempDb::new();
    seed(&db);
    let settings = Settings::from_toml(SETTINGS).unwrap();
    let mut service = ExecutionService::open(&db.0).unwrap();
    // The only import has no situation column at all
    service
        .connection()
        .execute_batch("CREATE TABLE imp_2024_c (id INTEGER, genre TEXT); INSERT INTO imp_2024_c VALUES (1, 'en situation');")
        .unwrap();
    ImportRegistry::record(
        service.connection(),
        &ImportRecord::new(
            "insertion_2024_6m",
            "imp_2024_c",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        ),
    )
    .unwrap();

    let result = run_indicator(
        &mut service,
        &json!({
            "sujet": {"tables": ["insertion_diplomes"], "conditions": {"=": [{"col": "genre"}, "en situation"]}},
            "colonnes": [{"type": "aggregation", "titre": "situation", "expr": {"agg": "count"}}]
        }),
        &RunOptions::from_settings(&settings).with_request(ResolveRequest::new().with_year("2024")),
    )
    .unwrap();

    assert_eq!(
        result.sql,
        "SELECT COUNT(*) AS \"situation\" FROM imp_2024_c WHERE genre = 'en situation';"
    );
    assert_eq!(result.rows[0]["situation"], json!(1));
}

const TWO_TABLES: &str = r#"
[schema.tables.la]
data_types = ["enquete_a"]

[[schema.tables.la.columns]]
name = "situation"
prefixes = ["situation_a"]

[schema.tables.lb]
data_types = ["enquete_b"]

[[schema.tables.lb.columns]]
name = "situation"
prefixes = ["situation_b"]
"#;

#[test]
fn test_shared_logical_column_resolves_per_table() {
    let db = TempDb::new();
    let settings = Settings::from_toml(TWO_TABLES).unwrap();
    let mut service = ExecutionService::open(&db.0).unwrap();
    let conn = service.connection();
    conn.execute_batch(
        "CREATE TABLE imp_a (id INTEGER, situation_a_x TEXT);
         INSERT INTO imp_a VALUES (1, 'x'), (2, 'z');
         CREATE TABLE imp_b (id INTEGER, situation_b_y TEXT);
         INSERT INTO imp_b VALUES (1, 'y'), (2, 'w'), (3, 'w');",
    )
    .unwrap();
    let at = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
    ImportRegistry::record(conn, &ImportRecord::new("enquete_a", "imp_a", at)).unwrap();
    ImportRegistry::record(conn, &ImportRecord::new("enquete_b", "imp_b", at)).unwrap();

    let result = run_indicator(
        &mut service,
        &json!({
            "sujet": {"tables": ["la"], "conditions": {"=": [{"col": "situation"}, "x"]}},
            "colonnes": [
                {"type": "aggregation", "titre": "A", "expr": {"agg": "count"}},
                {"type": "aggregation", "titre": "B", "expr": {"agg": "count", "subject": {
                    "tables": ["lb"], "condition": {"=": [{"col": "situation"}, "y"]}
                }}}
            ]
        }),
        &RunOptions::from_settings(&settings),
    )
    .unwrap();

    assert_eq!(
        result.sql,
        "SELECT COUNT(*) AS \"A\", \
         (SELECT COUNT(*) FROM imp_b WHERE situation_b_y = 'y') AS \"B\" \
         FROM imp_a WHERE situation_a_x = 'x';"
    );
    assert_eq!(result.rows[0]["A"], json!(1));
    assert_eq!(result.rows[0]["B"], json!(1));
}
