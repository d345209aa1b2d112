//! Predicate IR, lowering and rendering.
//!
//! Lowering turns an [`Expression`] into a [`Predicate`] tree whose leaves
//! are already tied to physical columns and join aliases. Negation is pushed
//! into the leaves while lowering, so `not` only survives in front of groups.
//! Rendering walks the tree once, left to right, binding parameters in the
//! order their placeholders appear in the text.

use super::joins::JoinPlanner;
use super::resolve::Resolved;
use super::resolve::Slice;
use crate::error::{SyntaxError, SyntaxErrorKind, SyntaxResult};
use crate::filter::{BoolOp, CompareOp, Expression, Literal, RegexMode};
use crate::sql::{Dialect, LikeMode, SqlDialect, Token, TokenStream};

// ============================================================================
// IR
// ============================================================================

/// A value position in a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `"table"."column"`
    Column { table: String, column: &'static str },
    /// Text at `key` in the JSON `column`; the path is bound as a parameter.
    JsonExtract {
        table: String,
        column: &'static str,
        key: String,
    },
    /// A bound scalar.
    Param(Literal),
    /// A list or map, encoded by the dialect and inlined as a string.
    Inline(Literal),
}

impl Operand {
    /// Scalars are bound, lists and maps inlined.
    pub fn literal(literal: Literal) -> Self {
        if literal.is_scalar() {
            Operand::Param(literal)
        } else {
            Operand::Inline(literal)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    /// `pattern` already carries its `%` wildcards.
    Like {
        target: Operand,
        pattern: String,
        negated: bool,
    },
    Regex {
        target: Operand,
        pattern: String,
        negated: bool,
    },
    In {
        target: Operand,
        values: Vec<Literal>,
        negated: bool,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Logical complement. Leaves flip their operator; groups are wrapped.
    pub fn negate(self) -> Predicate {
        match self {
            Predicate::Compare { lhs, op, rhs } => Predicate::Compare {
                lhs,
                op: op.negated(),
                rhs,
            },
            Predicate::Like {
                target,
                pattern,
                negated,
            } => Predicate::Like {
                target,
                pattern,
                negated: !negated,
            },
            Predicate::Regex {
                target,
                pattern,
                negated,
            } => Predicate::Regex {
                target,
                pattern,
                negated: !negated,
            },
            Predicate::In {
                target,
                values,
                negated,
            } => Predicate::In {
                target,
                values,
                negated: !negated,
            },
            Predicate::Not(inner) => *inner,
            group => Predicate::Not(Box::new(group)),
        }
    }

    /// AND of `parts`, collapsing a single part to itself.
    pub fn all(mut parts: Vec<Predicate>) -> Option<Predicate> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Predicate::And(parts)),
        }
    }

    /// A group with two or more operands, rendered in parentheses when nested.
    fn is_compound(&self) -> bool {
        matches!(self, Predicate::And(parts) | Predicate::Or(parts) if parts.len() >= 2)
    }

    /// Render to tokens plus the parameters the tokens reference.
    pub fn render(&self, dialect: Dialect) -> SyntaxResult<Rendered> {
        let mut renderer = Renderer {
            dialect,
            params: Vec::new(),
        };
        let tokens = renderer.predicate(self)?;
        Ok(Rendered {
            tokens,
            params: renderer.params,
        })
    }
}

/// A rendered predicate. `Token::Param(i)` refers to `params[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub tokens: TokenStream,
    pub params: Vec<Literal>,
}

// ============================================================================
// Rendering
// ============================================================================

struct Renderer {
    dialect: Dialect,
    params: Vec<Literal>,
}

impl Renderer {
    fn bind(&mut self, literal: Literal) -> Token {
        self.params.push(literal);
        Token::Param(self.params.len() - 1)
    }

    fn operand(&mut self, operand: &Operand) -> SyntaxResult<TokenStream> {
        let ts = match operand {
            Operand::Column { table, column } => TokenStream::from(Token::QualifiedIdent {
                table: table.clone(),
                column: column.to_string(),
            }),
            Operand::JsonExtract { table, column, key } => {
                let path = self.bind(Literal::String(self.dialect.json_path(key)));
                let column = Token::QualifiedIdent {
                    table: table.clone(),
                    column: column.to_string(),
                };
                self.dialect.compile_json_extract(column, path)
            }
            Operand::Param(literal) => TokenStream::from(self.bind(literal.clone())),
            Operand::Inline(literal) => {
                TokenStream::from(Token::LitString(self.dialect.encode_literal(literal)?))
            }
        };
        Ok(ts)
    }

    fn predicate(&mut self, predicate: &Predicate) -> SyntaxResult<TokenStream> {
        match predicate {
            Predicate::Compare { lhs, op, rhs } => {
                let lhs = self.operand(lhs)?;
                let rhs = self.operand(rhs)?;
                Ok(self.dialect.compile_comparison(&lhs, *op, &rhs))
            }
            Predicate::Like {
                target,
                pattern,
                negated,
            } => {
                let target = self.operand(target)?;
                let pattern = self.bind(Literal::String(pattern.clone()));
                Ok(self.dialect.compile_like(&target, *negated, pattern))
            }
            Predicate::Regex {
                target,
                pattern,
                negated,
            } => {
                let target = self.operand(target)?;
                let pattern = self.bind(Literal::String(pattern.clone()));
                Ok(self.dialect.compile_regex(&target, *negated, pattern))
            }
            Predicate::In {
                target,
                values,
                negated,
            } => {
                let mut ts = TokenStream::new();
                let target = self.operand(target)?;
                ts.append(&target).space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::In).space().lparen();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        ts.comma();
                    }
                    let param = self.bind(value.clone());
                    ts.push(param);
                }
                ts.rparen();
                Ok(ts)
            }
            Predicate::And(parts) => self.group(parts, Token::And),
            Predicate::Or(parts) => self.group(parts, Token::Or),
            Predicate::Not(inner) => {
                let mut ts = TokenStream::new();
                let inner = self.predicate(inner)?;
                ts.push(Token::Not).space().lparen().append(&inner).rparen();
                Ok(ts)
            }
        }
    }

    fn group(&mut self, parts: &[Predicate], connective: Token) -> SyntaxResult<TokenStream> {
        let mut ts = TokenStream::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                ts.space().push(connective.clone()).space();
            }
            let inner = self.predicate(part)?;
            if part.is_compound() {
                ts.lparen().append(&inner).rparen();
            } else {
                ts.append(&inner);
            }
        }
        Ok(ts)
    }
}

// ============================================================================
// Lowering
// ============================================================================

/// A boolean attribute stored as `column = value`.
#[derive(Debug, Clone)]
struct Flag {
    table: String,
    column: &'static str,
    value: &'static str,
}

impl Flag {
    fn predicate(self, holds: bool) -> Predicate {
        Predicate::Compare {
            lhs: Operand::Column {
                table: self.table,
                column: self.column,
            },
            op: if holds { CompareOp::Eq } else { CompareOp::Ne },
            rhs: Operand::Param(Literal::from(self.value)),
        }
    }
}

enum Value {
    Operand(Operand),
    Literal(Literal),
    Flag(Flag),
}

/// Lowers expressions to predicates, allocating joins through the planner.
///
/// Operands are visited left to right, so joins are allocated in the order
/// their accesses appear in the query.
pub struct PredicateCompiler<'p, 'a> {
    planner: &'p mut JoinPlanner<'a>,
    dialect: Dialect,
}

impl<'p, 'a> PredicateCompiler<'p, 'a> {
    pub fn new(planner: &'p mut JoinPlanner<'a>, dialect: Dialect) -> Self {
        Self { planner, dialect }
    }

    pub fn compile(&mut self, expr: &Expression) -> SyntaxResult<Predicate> {
        match expr {
            Expression::BooleanOp { op, operands } => {
                let parts = operands
                    .iter()
                    .map(|operand| self.compile(operand))
                    .collect::<SyntaxResult<Vec<_>>>()?;
                Ok(match op {
                    BoolOp::And => Predicate::And(parts),
                    BoolOp::Or => Predicate::Or(parts),
                })
            }
            Expression::Negation(inner) => Ok(self.compile(inner)?.negate()),
            Expression::Comparison { op, left, right } => self.comparison(*op, left, right),
            Expression::Membership {
                negated,
                needle,
                haystack,
            } => self.membership(*negated, needle, haystack),
            Expression::PrefixMatch { target, literal } => {
                self.like(target, literal, LikeMode::Prefix)
            }
            Expression::SuffixMatch { target, literal } => {
                self.like(target, literal, LikeMode::Suffix)
            }
            Expression::RegexMatch {
                negated,
                mode,
                pattern,
                target,
            } => {
                let target = self.target(target)?;
                let pattern = match mode {
                    RegexMode::Match if !pattern.starts_with('^') => format!("^{}", pattern),
                    _ => pattern.clone(),
                };
                Ok(Predicate::Regex {
                    target,
                    pattern,
                    negated: *negated,
                })
            }
            Expression::Attribute(path) => match self.value(expr)? {
                Value::Flag(flag) => Ok(flag.predicate(true)),
                _ => Err(SyntaxError::at(
                    SyntaxErrorKind::Unsupported,
                    format!("'{}' is not a condition; compare it with a value", path),
                    path.span.clone(),
                )),
            },
            Expression::Subscript(access) => Err(SyntaxError::at(
                SyntaxErrorKind::Unsupported,
                "a slice is not a condition; compare it with a value",
                access.span.clone(),
            )),
            Expression::Literal(literal) => Err(SyntaxError::unsupported(format!(
                "literal {} is not a condition",
                literal
            ))),
        }
    }

    fn value(&mut self, expr: &Expression) -> SyntaxResult<Value> {
        let resolver = self.planner.resolver();
        match expr {
            Expression::Attribute(path) => Ok(match resolver.resolve_attribute(path)? {
                Resolved::Column { table, column } => Value::Operand(Operand::Column { table, column }),
                Resolved::ContextKey { table, key } => Value::Operand(Operand::JsonExtract {
                    table,
                    column: "json",
                    key,
                }),
                Resolved::Flag {
                    table,
                    column,
                    value,
                } => Value::Flag(Flag {
                    table,
                    column,
                    value,
                }),
                Resolved::ExperimentColumn { column } => Value::Operand(Operand::Column {
                    table: self.planner.experiment_alias()?,
                    column,
                }),
            }),
            Expression::Subscript(access) => {
                let slice = resolver.resolve_subscript(access)?;
                let table = self.planner.slice_alias(&slice)?;
                let column = match slice {
                    Slice::Metric { column, .. } => column,
                    Slice::Tag { .. } => "value",
                };
                Ok(Value::Operand(Operand::Column { table, column }))
            }
            Expression::Literal(literal) => Ok(Value::Literal(literal.clone())),
            _ => Err(SyntaxError::unsupported(
                "expected an attribute or a literal, found a condition",
            )),
        }
    }

    fn target(&mut self, expr: &Expression) -> SyntaxResult<Operand> {
        match self.value(expr)? {
            Value::Operand(operand) => Ok(operand),
            Value::Literal(literal) => Err(SyntaxError::unsupported(format!(
                "expected an attribute, found literal {}",
                literal
            ))),
            Value::Flag(_) => Err(SyntaxError::unsupported(
                "boolean attributes cannot be matched as text",
            )),
        }
    }

    fn comparison(
        &mut self,
        op: CompareOp,
        left: &Expression,
        right: &Expression,
    ) -> SyntaxResult<Predicate> {
        let left = self.value(left)?;
        let right = self.value(right)?;

        match (left, right) {
            (Value::Flag(flag), Value::Literal(Literal::Bool(b)))
            | (Value::Literal(Literal::Bool(b)), Value::Flag(flag)) => match op {
                CompareOp::Eq => Ok(flag.predicate(b)),
                CompareOp::Ne => Ok(flag.predicate(!b)),
                _ => Err(SyntaxError::unsupported(
                    "boolean attributes only support == and !=",
                )),
            },
            (Value::Flag(_), _) | (_, Value::Flag(_)) => Err(SyntaxError::unsupported(
                "boolean attributes can only be compared with True or False",
            )),
            (Value::Operand(lhs), Value::Operand(rhs)) => Ok(Predicate::Compare { lhs, op, rhs }),
            (Value::Operand(lhs), Value::Literal(literal)) => Ok(Predicate::Compare {
                lhs,
                op,
                rhs: Operand::literal(literal),
            }),
            (Value::Literal(literal), Value::Operand(rhs)) => Ok(Predicate::Compare {
                lhs: rhs,
                op: op.swapped(),
                rhs: Operand::literal(literal),
            }),
            (Value::Literal(_), Value::Literal(_)) => Err(SyntaxError::unsupported(
                "comparison between two literals",
            )),
        }
    }

    fn membership(
        &mut self,
        negated: bool,
        needle: &Expression,
        haystack: &Expression,
    ) -> SyntaxResult<Predicate> {
        let needle = self.value(needle)?;
        let haystack = self.value(haystack)?;

        match (needle, haystack) {
            (Value::Literal(Literal::String(s)), Value::Operand(target)) => Ok(Predicate::Like {
                target,
                pattern: self.dialect.like_pattern(LikeMode::Contains, &s),
                negated,
            }),
            (Value::Operand(target), Value::Literal(Literal::List(values))) => {
                if values.is_empty() {
                    return Err(SyntaxError::unsupported("'in' needs a non-empty list"));
                }
                if let Some(bad) = values.iter().find(|v| !v.is_scalar()) {
                    return Err(SyntaxError::unsupported(format!(
                        "'in' list items must be scalars, found {}",
                        bad.kind_name()
                    )));
                }
                Ok(Predicate::In {
                    target,
                    values,
                    negated,
                })
            }
            _ => Err(SyntaxError::unsupported(
                "'in' needs a string and an attribute, or an attribute and a list",
            )),
        }
    }

    fn like(
        &mut self,
        target: &Expression,
        literal: &Literal,
        mode: LikeMode,
    ) -> SyntaxResult<Predicate> {
        let target = self.target(target)?;
        let needle = literal.as_str().ok_or_else(|| {
            SyntaxError::unsupported(format!(
                "string match needs a string, found {}",
                literal.kind_name()
            ))
        })?;
        Ok(Predicate::Like {
            target,
            pattern: self.dialect.like_pattern(mode, needle),
            negated: false,
        })
    }
}
