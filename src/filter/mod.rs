//! The filter expression language.
//!
//! A small Python-flavoured boolean language used to search runs and metrics:
//!
//! ```text
//! run.metrics["loss", {"subset": "val"}].last < 0.5 and not run.archived
//! re.search("bert", run.name) or run.name.startswith("baseline")
//! ```
//!
//! - [`lexer`] - chumsky tokenizer
//! - [`parser`] - recursive-descent parser producing [`ast::Expression`]
//! - [`ast`] - the syntax tree

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    AttributePath, BoolOp, CompareOp, Expression, Literal, RegexMode, SubscriptAccess,
    SubscriptKey,
};

use crate::error::SyntaxResult;

/// Parse filter text into an expression tree.
pub fn parse(source: &str) -> SyntaxResult<Expression> {
    let tokens = lexer::lex(source)?;
    parser::parse_tokens(&tokens, source.len())
}
