//! SQLite SQL dialect.
//!
//! SQLite features used by filters:
//! - ANSI identifier quoting (`"`)
//! - `->>` extraction with a `$.key` path; NULL documents read as `{}`
//! - `REGEXP` (supplied by the driver), with NULL values read as `''`

use super::helpers;
use super::SqlDialect;
use crate::error::SyntaxResult;
use crate::filter::Literal;
use crate::sql::token::{Token, TokenStream};

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn encode_literal(&self, literal: &Literal) -> SyntaxResult<String> {
        helpers::encode_json_compact(literal)
    }

    fn json_path(&self, key: &str) -> String {
        format!("$.{}", key)
    }

    fn compile_json_extract(&self, column: Token, path: Token) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Raw("IFNULL("))
            .push(column)
            .push(Token::Raw(", JSON('{}'))->>"))
            .push(path);
        ts
    }

    fn compile_regex(&self, target: &TokenStream, negated: bool, pattern: Token) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Raw("IFNULL("))
            .append(target)
            .push(Token::Raw(", '')"))
            .space()
            .push(Token::Raw(if negated { "NOT REGEXP" } else { "REGEXP" }))
            .space()
            .push(pattern);
        ts
    }
}
