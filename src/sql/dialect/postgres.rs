//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features used by filters:
//! - ANSI identifier quoting (`"`)
//! - `#>>` text extraction with a `{key}` path array
//! - POSIX regex operators `~` / `!~`

use super::helpers;
use super::SqlDialect;
use crate::error::SyntaxResult;
use crate::filter::Literal;
use crate::sql::token::{Token, TokenStream};

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn encode_literal(&self, literal: &Literal) -> SyntaxResult<String> {
        helpers::encode_json_spaced(literal)
    }

    fn json_path(&self, key: &str) -> String {
        format!("{{{}}}", key)
    }

    fn compile_json_extract(&self, column: Token, path: Token) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(column).push(Token::Raw("#>>")).push(path);
        ts
    }

    fn compile_regex(&self, target: &TokenStream, negated: bool, pattern: Token) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.append(target)
            .space()
            .push(Token::Raw(if negated { "!~" } else { "~" }))
            .space()
            .push(pattern);
        ts
    }
}
