//! SQLite SQL dialect.
//!
//! SQLite has no `ILIKE`. The matched expression is lowered and compared
//! with `LIKE` against the already lowercase pattern. The built-in `lower()`
//! only folds ASCII, so execution sessions register a Unicode one in its
//! place (see `ExecutionService`).

use super::{emit_pattern_match, SqlDialect};
use crate::sql::token::{Token, TokenStream};

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn emit_case_insensitive_like(
        &self,
        expr: TokenStream,
        pattern: TokenStream,
        negated: bool,
    ) -> TokenStream {
        let mut lowered = TokenStream::new();
        lowered
            .push(Token::FunctionName("LOWER".into()))
            .lparen()
            .append(&expr)
            .rparen();
        emit_pattern_match(lowered, Token::Like, pattern, negated)
    }
}
