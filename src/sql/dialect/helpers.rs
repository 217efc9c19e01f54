//! Shared helper functions for SQL dialect implementations.

use once_cell::sync::Lazy;
use regex::Regex;

// =============================================================================
// Identifier Quoting
// =============================================================================

static PLAIN_IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$|^1$|^\*$")
        .expect("static regex")
});

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Whether an identifier can be emitted bare.
///
/// Plain names (`genre`), qualified plain names (`t.genre`), the counting
/// shorthands `1` and `*`.
pub fn is_plain_identifier(ident: &str) -> bool {
    PLAIN_IDENT.is_match(ident)
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as the SQL keywords TRUE/FALSE.
/// Used by: Postgres, SQLite (3.23+)
pub fn format_bool_keyword(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}
