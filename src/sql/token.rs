//! SQL Tokens - the atomic units of a compiled predicate.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings. Bound parameters are kept as indices so the
//! same stream can be numbered from `$1` on its own or after the parameters
//! of the JOIN clauses that precede it.

use super::dialect::{Dialect, SqlDialect};

/// SQL Token - every element a filter fragment can contain.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Where,
    And,
    Or,
    Not,
    Like,
    In,
    Left,
    Join,
    On,

    // === Punctuation ===
    Comma,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,

    // === Whitespace ===
    Space,

    // === Dynamic Content ===
    /// Quoted `"table"."column"`.
    QualifiedIdent { table: String, column: String },
    /// Unquoted `table.column`, as written in join conditions.
    BareQualified { table: String, column: String },
    /// Unquoted table or alias name.
    BareIdent(String),
    /// Zero-based index into the stream's parameter list.
    Param(usize),
    /// Inline string literal, quoted by the dialect.
    LitString(String),

    // === Escape Hatch ===
    /// Trusted SQL text passed through unchanged.
    ///
    /// Only dialect code emits this, never user input.
    Raw(&'static str),
}

impl Token {
    /// Serialize this token for the given dialect.
    ///
    /// `param_base` is the number of placeholders already emitted before this
    /// stream; `Param(0)` renders as `$<param_base + 1>`.
    pub fn serialize(&self, dialect: Dialect, param_base: usize) -> String {
        match self {
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::Or => "OR".into(),
            Token::Not => "NOT".into(),
            Token::Like => "LIKE".into(),
            Token::In => "IN".into(),
            Token::Left => "LEFT".into(),
            Token::Join => "JOIN".into(),
            Token::On => "ON".into(),

            Token::Comma => ",".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),

            Token::Space => " ".into(),

            Token::QualifiedIdent { table, column } => format!(
                "{}.{}",
                dialect.quote_identifier(table),
                dialect.quote_identifier(column)
            ),
            Token::BareQualified { table, column } => format!("{}.{}", table, column),
            Token::BareIdent(name) => name.clone(),
            Token::Param(index) => dialect.placeholder(param_base + index + 1),
            Token::LitString(s) => dialect.quote_string(s),

            Token::Raw(s) => (*s).to_string(),
        }
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Serialize with placeholders numbered from `$1`.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.serialize_from(dialect, 0)
    }

    /// Serialize with placeholders numbered after `param_base` earlier ones.
    pub fn serialize_from(&self, dialect: Dialect, param_base: usize) -> String {
        self.tokens
            .iter()
            .map(|t| t.serialize(dialect, param_base))
            .collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}

impl From<Token> for TokenStream {
    fn from(token: Token) -> Self {
        Self {
            tokens: vec![token],
        }
    }
}
