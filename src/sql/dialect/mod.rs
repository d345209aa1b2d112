//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for the places where the
//! supported back ends disagree on filter syntax:
//!
//! | Capability | Postgres | SQLite |
//! |------------|----------|--------|
//! | JSON path extract | `col#>>$n`, path `{key}` | `IFNULL(col, JSON('{}'))->>$n`, path `$.key` |
//! | Regex match | `col ~ $n` | `IFNULL(col, '') REGEXP $n` |
//! | Regex non-match | `col !~ $n` | `IFNULL(col, '') NOT REGEXP $n` |
//! | List/map literals | `'[1, 2, 3]'` | `'[1,2,3]'` |
//!
//! Identifier quoting, placeholders (`$n`) and LIKE templates are shared.
//!
//! # Usage
//!
//! ```ignore
//! use runfilter::sql::{Dialect, SqlDialect};
//!
//! let dialect: Dialect = "sqlite".parse()?;
//! let path = dialect.json_path("subset");  // $.subset
//! ```

pub mod helpers;
mod postgres;
mod sqlite;

pub use postgres::Postgres;
pub use sqlite::Sqlite;

use std::str::FromStr;

use super::token::{Token, TokenStream};
use crate::config::ConfigError;
use crate::error::SyntaxResult;
use crate::filter::{CompareOp, Literal};

/// Which LIKE template a string-matching predicate uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeMode {
    /// `needle in attr` → `%needle%`
    Contains,
    /// `attr.startswith(needle)` → `needle%`
    Prefix,
    /// `attr.endswith(needle)` → `%needle`
    Suffix,
}

/// SQL dialect trait - defines how filter constructs are rendered.
///
/// The default implementations are shared by every supported back end.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal with `''` escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Positional placeholder for the `n`th bound parameter (1-based).
    fn placeholder(&self, n: usize) -> String {
        format!("${}", n)
    }

    /// Encode a list or map literal as the JSON text stored in context rows.
    fn encode_literal(&self, literal: &Literal) -> SyntaxResult<String>;

    // =========================================================================
    // JSON
    // =========================================================================

    /// The bound path value that addresses `key` in a JSON document.
    fn json_path(&self, key: &str) -> String;

    /// Extract the text at `path` from the JSON `column`.
    fn compile_json_extract(&self, column: Token, path: Token) -> TokenStream;

    // =========================================================================
    // Operators
    // =========================================================================

    /// `lhs <op> rhs`
    fn compile_comparison(
        &self,
        lhs: &TokenStream,
        op: CompareOp,
        rhs: &TokenStream,
    ) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.append(lhs)
            .space()
            .push(comparison_token(op))
            .space()
            .append(rhs);
        ts
    }

    /// `target [NOT] LIKE pattern`
    fn compile_like(&self, target: &TokenStream, negated: bool, pattern: Token) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.append(target).space();
        if negated {
            ts.push(Token::Not).space();
        }
        ts.push(Token::Like).space().push(pattern);
        ts
    }

    /// Regular-expression match (or non-match) of `target` against `pattern`.
    fn compile_regex(&self, target: &TokenStream, negated: bool, pattern: Token) -> TokenStream;

    /// LIKE pattern text for a substring, prefix or suffix match.
    fn like_pattern(&self, mode: LikeMode, needle: &str) -> String {
        helpers::like_template(mode, needle)
    }
}

/// The comparison operator token for `op`.
pub fn comparison_token(op: CompareOp) -> Token {
    match op {
        CompareOp::Eq => Token::Eq,
        CompareOp::Ne => Token::Ne,
        CompareOp::Lt => Token::Lt,
        CompareOp::Le => Token::Lte,
        CompareOp::Gt => Token::Gt,
        CompareOp::Ge => Token::Gte,
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
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

    fn placeholder(&self, n: usize) -> String {
        self.dialect().placeholder(n)
    }

    fn encode_literal(&self, literal: &Literal) -> SyntaxResult<String> {
        self.dialect().encode_literal(literal)
    }

    fn json_path(&self, key: &str) -> String {
        self.dialect().json_path(key)
    }

    fn compile_json_extract(&self, column: Token, path: Token) -> TokenStream {
        self.dialect().compile_json_extract(column, path)
    }

    fn compile_comparison(
        &self,
        lhs: &TokenStream,
        op: CompareOp,
        rhs: &TokenStream,
    ) -> TokenStream {
        self.dialect().compile_comparison(lhs, op, rhs)
    }

    fn compile_like(&self, target: &TokenStream, negated: bool, pattern: Token) -> TokenStream {
        self.dialect().compile_like(target, negated, pattern)
    }

    fn compile_regex(&self, target: &TokenStream, negated: bool, pattern: Token) -> TokenStream {
        self.dialect().compile_regex(target, negated, pattern)
    }

    fn like_pattern(&self, mode: LikeMode, needle: &str) -> String {
        self.dialect().like_pattern(mode, needle)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

impl FromStr for Dialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            _ => Err(ConfigError::UnknownDialect(s.to_string())),
        }
    }
}
