//! Integration tests for JSON indicator → SQL translation.
//!
//! Exact SQL is pinned with inline snapshots; every generated statement is
//! also parsed back with sqlparser to catch malformed output.

use indicator_sql::error::SpecificationError;
use indicator_sql::sql::Dialect;
use indicator_sql::{compile_json, CompileOptions};
use insta::assert_snapshot;
use serde_json::{json, Value};
use sqlparser::dialect::{PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

fn compile_for(spec: Value, dialect: Dialect) -> String {
    let options = CompileOptions::default().with_dialect(dialect);
    let sql = compile_json(&spec, &options)
        .unwrap_or_else(|e| panic!("spec should compile: {e}"))
        .sql;
    validate(&sql, dialect);
    sql
}

fn compile(spec: Value) -> String {
    compile_for(spec, Dialect::Postgres)
}

fn validate(sql: &str, dialect: Dialect) {
    let result = match dialect {
        Dialect::Postgres => Parser::parse_sql(&PostgreSqlDialect {}, sql),
        Dialect::Sqlite => Parser::parse_sql(&SQLiteDialect {}, sql),
    };
    if let Err(e) = result {
        panic!("invalid SQL for {dialect}: {e}\nSQL: {sql}");
    }
}

fn count_where(conditions: Value) -> Value {
    json!({
        "sujet": {"tables": ["t"], "conditions": conditions},
        "colonnes": [{"type": "aggregation", "titre": "N", "expr": {"agg": "count"}}]
    })
}

// ============================================================================
// Null handling
// ============================================================================

#[test]
fn test_absent_operand_equality_is_null() {
    assert_snapshot!(
        compile(count_where(json!({"=": [{"col": "pays"}, null]}))),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE pays IS NULL;"#
    );
    assert_snapshot!(
        compile(count_where(json!({"==": [{"col": "pays"}, "  "]}))),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE pays IS NULL;"#
    );
}

#[test]
fn test_absent_operand_other_ops_is_not_null() {
    for op in ["!=", "<>", "<", "<=", ">", ">=", "like", "NOT_LIKE"] {
        let sql = compile(count_where(json!({op: [{"col": "pays"}, null]})));
        assert!(sql.ends_with("WHERE pays IS NOT NULL;"), "{op}: {sql}");
    }
}

// ============================================================================
// Wildcards and pattern matching
// ============================================================================

#[test]
fn test_wildcard_equality_becomes_pattern_match() {
    assert_snapshot!(
        compile(count_where(json!({"=": [{"col": "pays"}, "%France%"]}))),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE pays ILIKE '%france%';"#
    );
    assert_snapshot!(
        compile(count_where(json!({"!=": [{"col": "pays"}, "%France%"]}))),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE pays NOT ILIKE '%france%';"#
    );
}

#[test]
fn test_pattern_match_sqlite() {
    assert_snapshot!(
        compile_for(count_where(json!({"like": [{"col": "pays"}, "%France%"]})), Dialect::Sqlite),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE LOWER(pays) LIKE '%france%';"#
    );
    assert_snapshot!(
        compile_for(count_where(json!({"Not_Like": [{"col": "pays"}, "%France%"]})), Dialect::Sqlite),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE LOWER(pays) NOT LIKE '%france%';"#
    );
}

#[test]
fn test_literals_are_normalized_and_escaped() {
    assert_snapshot!(
        compile(count_where(json!({"=": [{"col": "avis"}, " L'ÉCOLE\n \"Paris\" "]}))),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE avis = 'l école paris';"#
    );
}

// ============================================================================
// Conditions
// ============================================================================

#[test]
fn test_nested_and_or() {
    assert_snapshot!(
        compile(count_where(json!({"and": [
            {"=": [{"col": "genre"}, "F"]},
            {"or": [{">=": [{"col": "age"}, 25]}, {"=": [{"col": "boursier"}, true]}]}
        ]}))),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE (genre = 'f' AND (age >= 25 OR boursier = TRUE));"#
    );
}

#[test]
fn test_condition_list_is_conjunction() {
    assert_snapshot!(
        compile(count_where(json!([
            {"=": [{"col": "genre"}, "F"]},
            {"<": [{"col": "age"}, 30]}
        ]))),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE (genre = 'f' AND age < 30);"#
    );
}

#[test]
fn test_arithmetic_in_condition() {
    assert_snapshot!(
        compile(count_where(json!({">": [
            {"op": "-", "args": [{"col": "annee_sortie"}, {"col": "annee_entree"}]},
            2
        ]}))),
        @r#"SELECT COUNT(*) AS "N" FROM t WHERE (annee_sortie - annee_entree) > 2;"#
    );
}

// ============================================================================
// Columns and grouping
// ============================================================================

#[test]
fn test_group_by_entries_match_select_expressions() {
    let sql = compile(json!({
        "sujet": {"tables": ["insertion"]},
        "colonnes": [
            {"type": "group_by", "titre": "Genre", "expr": {"col": "genre"}},
            {"type": "aggregation", "titre": "Nombre", "expr": {"agg": "count", "col": "1"}},
            {"type": "case", "titre": "Age", "cases": [
                {"when": {"<": [{"col": "age"}, 25]}, "label": "Moins de 25 ans"},
                {"when": {">=": [{"col": "age"}, 25]}, "label": "25 ans et plus"}
            ]},
            {"type": "group_by", "titre": "Annee", "expr": {"col": "annee"}}
        ]
    }));

    let case = "CASE WHEN age < 25 THEN 'Moins de 25 ans' WHEN age >= 25 THEN '25 ans et plus' END";
    let (_, group_by) = sql.split_once(" GROUP BY ").unwrap();
    assert_eq!(group_by, format!("genre, {case}, annee;"));
    assert!(sql.contains(&format!("{case} AS \"Age\"")));
}

#[test]
fn test_no_group_by_without_grouping_columns() {
    let sql = compile(json!({
        "sujet": {"tables": ["t"]},
        "colonnes": [
            {"type": "aggregation", "titre": "Total", "expr": {"agg": "sum", "col": "montant"}},
            {"type": "aggregation", "titre": "Moyenne", "expr": {"agg": "avg", "col": "montant"}}
        ]
    }));
    assert_snapshot!(sql, @r#"SELECT SUM(montant) AS "Total", AVG(montant) AS "Moyenne" FROM t;"#);
}

#[test]
fn test_conditional_aggregation_shape() {
    assert_snapshot!(
        compile(json!({
            "sujet": {"tables": ["insertion"]},
            "colonnes": [
                {"type": "aggregation", "titre": "Femmes", "expr": {"agg": "count", "col": "1",
                    "condition": {"=": [{"col": "genre"}, "F"]}}},
                {"type": "aggregation", "titre": "Salaire F", "expr": {"agg": "avg", "col": "salaire",
                    "condition": {"=": [{"col": "genre"}, "F"]}}}
            ]
        })),
        @r#"SELECT COUNT(CASE WHEN genre = 'f' THEN 1 END) AS "Femmes", AVG(CASE WHEN genre = 'f' THEN salaire END) AS "Salaire F" FROM insertion;"#
    );
}

#[test]
fn test_ratio_with_nested_subject() {
    assert_snapshot!(
        compile(json!({
            "sujet": {"tables": ["insertion"], "conditions": {"=": [{"col": "annee"}, 2022]}},
            "colonnes": [{"type": "aggregation", "titre": "Taux de réponse", "expr": {"op": "/", "args": [
                {"agg": "count", "col": "1"},
                {"agg": "count", "col": "1", "sujet": {"tables": ["etudiants"], "condition": {"=": [{"col": "annee"}, 2022]}}}
            ]}}]
        })),
        @r#"SELECT (COUNT(1) / (SELECT COUNT(1) FROM etudiants WHERE annee = 2022)) AS "Taux de réponse" FROM insertion WHERE annee = 2022;"#
    );
}

#[test]
fn test_alias_with_quote_is_escaped() {
    let sql = compile(json!({
        "sujet": {"tables": ["t"]},
        "colonnes": [{"type": "aggregation", "titre": "Nombre \"total\"", "expr": {"agg": "count"}}]
    }));
    assert_snapshot!(sql, @r#"SELECT COUNT(*) AS "Nombre ""total""" FROM t;"#);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_specification_errors() {
    let options = CompileOptions::default();

    let err = compile_json(&count_where(json!({"between": [{"col": "a"}, 1]})), &options).unwrap_err();
    assert!(matches!(err, SpecificationError::UnknownOperator { ref op, .. } if op == "between"));

    let err = compile_json(
        &json!({"sujet": {"tables": ["t"]}, "colonnes": [
            {"type": "aggregation", "titre": "x", "expr": {"agg": "median", "col": "a"}}
        ]}),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, SpecificationError::UnknownFunction(ref f) if f == "median"));

    let err = compile_json(
        &count_where(json!({">": [{"op": "+", "args": [{"col": "a"}, {"raw": "1; DROP TABLE t"}]}, 1]})),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, SpecificationError::InvalidNode { .. }));

    let err = compile_json(&json!({"sujet": {"tables": []}, "colonnes": []}), &options).unwrap_err();
    assert!(matches!(err, SpecificationError::NoTables));
}
