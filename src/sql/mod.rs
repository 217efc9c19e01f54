//! SQL generation module.
//!
//! A small, type-safe SQL builder shared by every indicator compiler:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - PostgreSQL and SQLite rendering rules

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    col, count_distinct, count_star, func, lit_bool, lit_float, lit_int, lit_null, lit_str,
    table_col, CompareOp, Expr, ExprExt, Literal,
};
pub use query::{Join, Query, SelectExpr, TableRef};
pub use token::{Token, TokenStream};
