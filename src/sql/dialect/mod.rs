//! SQL dialect definitions and formatting rules.
//!
//! Indicators run against two engines: PostgreSQL (the production store fed
//! by the spreadsheet import pipeline) and SQLite (embedded execution and
//! tests). They render almost everything identically; the differences live
//! behind the [`SqlDialect`] trait:
//!
//! | Construct                     | PostgreSQL        | SQLite                  |
//! |-------------------------------|-------------------|-------------------------|
//! | Case-insensitive pattern      | `x ILIKE 'p'`     | `LOWER(x) LIKE 'p'`     |
//! | Identifier quoting            | `"x"`             | `"x"`                   |
//! | Boolean literal               | `TRUE` / `FALSE`  | `TRUE` / `FALSE`        |
//!
//! # Usage
//!
//! ```
//! use indicator_sql::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! assert_eq!(dialect.quote_identifier("Nombre"), "\"Nombre\"");
//! ```

pub mod helpers;
mod postgres;
mod sqlite;

pub use postgres::Postgres;
pub use sqlite::Sqlite;

use serde::{Deserialize, Serialize};

use super::token::{Token, TokenStream};

/// SQL dialect trait - defines how SQL constructs are rendered.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (alias, or a physical name that is not plain).
    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_keyword(b)
    }

    /// Emit a case-insensitive pattern match of `expr` against `pattern`.
    ///
    /// The pattern is already lowercased by the literal normalizer.
    fn emit_case_insensitive_like(
        &self,
        expr: TokenStream,
        pattern: TokenStream,
        negated: bool,
    ) -> TokenStream;
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::Sqlite => &Sqlite,
        }
    }

    /// Parse a dialect name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "sqlite" | "sqlite3" => Some(Dialect::Sqlite),
            _ => None,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn emit_case_insensitive_like(
        &self,
        expr: TokenStream,
        pattern: TokenStream,
        negated: bool,
    ) -> TokenStream {
        self.dialect()
            .emit_case_insensitive_like(expr, pattern, negated)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `expr [NOT] <keyword> pattern`, shared by both dialects.
pub(crate) fn emit_pattern_match(
    expr: TokenStream,
    keyword: Token,
    pattern: TokenStream,
    negated: bool,
) -> TokenStream {
    let mut ts = expr;
    if negated {
        ts.space().push(Token::Not);
    }
    ts.space().push(keyword).space().append(&pattern);
    ts
}
