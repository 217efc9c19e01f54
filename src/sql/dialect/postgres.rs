//! PostgreSQL SQL dialect.
//!
//! The production target: survey tables imported from spreadsheets live in
//! PostgreSQL and indicators use `ILIKE` for case-insensitive matching.

use super::{emit_pattern_match, SqlDialect};
use crate::sql::token::{Token, TokenStream};

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn emit_case_insensitive_like(
        &self,
        expr: TokenStream,
        pattern: TokenStream,
        negated: bool,
    ) -> TokenStream {
        emit_pattern_match(expr, Token::ILike, pattern, negated)
    }
}
