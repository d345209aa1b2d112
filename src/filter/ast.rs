//! Abstract syntax tree for filter expressions.
//!
//! The tree is produced by [`super::parser`] and consumed by the compiler in
//! [`crate::compile`]. Nodes are plain data; nothing here knows about tables
//! or dialects.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::Span;

// ============================================================================
// Literals
// ============================================================================

/// A literal value written in a query.
///
/// Scalars become bound parameters when compiled; lists and maps are encoded
/// as JSON text and inlined (see [`crate::sql::SqlDialect::encode_literal`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    List(Vec<Literal>),
    /// Entries keep the order they were written in.
    Map(Vec<(String, Literal)>),
}

impl Literal {
    /// True for Int, Float, String and Bool.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Literal::List(_) | Literal::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the literal kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "integer",
            Literal::Float(_) => "float",
            Literal::String(_) => "string",
            Literal::Bool(_) => "boolean",
            Literal::List(_) => "list",
            Literal::Map(_) => "map",
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Int(n)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Float(n)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Literal::Int(n) => serializer.serialize_i64(*n),
            Literal::Float(n) => serializer.serialize_f64(*n),
            Literal::String(s) => serializer.serialize_str(s),
            Literal::Bool(b) => serializer.serialize_bool(*b),
            Literal::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Literal::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(n) => f.write_str(ryu::Buffer::new().format(*n)),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Literal::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

// ============================================================================
// Attribute access
// ============================================================================

/// A dotted attribute chain such as `run.name` or `metric.context.key1`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    /// Root identifier first; never empty.
    pub segments: Vec<String>,
    pub span: Span,
}

impl AttributePath {
    pub fn new(segments: Vec<String>, span: Span) -> Self {
        Self { segments, span }
    }

    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// Segments after the root.
    pub fn attributes(&self) -> &[String] {
        &self.segments[1..]
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// The key inside `[...]`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptKey {
    /// `run.metrics["loss"]`
    Name(String),
    /// `run.metrics["loss", {"subset": "train"}]`
    NameWithContext(String, Vec<(String, Literal)>),
}

impl SubscriptKey {
    pub fn name(&self) -> &str {
        match self {
            SubscriptKey::Name(name) | SubscriptKey::NameWithContext(name, _) => name,
        }
    }

    pub fn context(&self) -> Option<&[(String, Literal)]> {
        match self {
            SubscriptKey::Name(_) => None,
            SubscriptKey::NameWithContext(_, ctx) => Some(ctx),
        }
    }
}

/// `base[key].field`, e.g. `run.metrics["loss"].last`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptAccess {
    pub base: AttributePath,
    pub key: SubscriptKey,
    /// Attribute read after the closing bracket, if any.
    pub field: Option<String>,
    pub span: Span,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator that holds when the operands are swapped (`a < b` ⇔ `b > a`).
    pub fn swapped(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }

    /// The logical complement (`a < b` ⇔ `not a >= b`).
    pub fn negated(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }
}

/// `re.match` anchors at the start of the value; `re.search` matches anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexMode {
    Match,
    Search,
}

/// A filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Two or more operands joined by the same connective.
    BooleanOp {
        op: BoolOp,
        operands: Vec<Expression>,
    },
    Negation(Box<Expression>),
    Comparison {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `needle in haystack` / `needle not in haystack`.
    Membership {
        negated: bool,
        needle: Box<Expression>,
        haystack: Box<Expression>,
    },
    /// `target.startswith(literal)`
    PrefixMatch {
        target: Box<Expression>,
        literal: Literal,
    },
    /// `target.endswith(literal)`
    SuffixMatch {
        target: Box<Expression>,
        literal: Literal,
    },
    /// `re.match(pattern, target)` / `re.search(pattern, target)`.
    RegexMatch {
        negated: bool,
        mode: RegexMode,
        pattern: String,
        target: Box<Expression>,
    },
    Attribute(AttributePath),
    Subscript(SubscriptAccess),
    Literal(Literal),
}

impl Expression {
    pub fn not(operand: Expression) -> Self {
        Expression::Negation(Box::new(operand))
    }
}
