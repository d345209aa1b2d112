//! Recursive-descent parser for filter expressions.
//!
//! Consumes the token vector produced by [`super::lexer`] and builds an
//! [`Expression`]. Precedence, loosest first:
//!
//! ```text
//! or  →  and  →  not  →  comparison / in / not in  →  postfix (. [] ())
//! ```
//!
//! `a and b and c` becomes one `BooleanOp` with three operands; explicit
//! parentheses keep their nesting. Structural checks that do not need table
//! information (subscript shape, context depth) happen here, so a malformed
//! query never reaches the compiler.

use chumsky::span::SimpleSpan;

use super::ast::*;
use super::lexer::Token;
use crate::error::{Span, SyntaxError, SyntaxErrorKind, SyntaxResult};

/// Deepest nesting of groups, `not` and collection literals a query may use.
/// Lowering and rendering recurse along the same structure.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parse a token stream into an expression.
///
/// `eoi` is the byte length of the source, used to place end-of-input errors.
pub fn parse_tokens(tokens: &[(Token<'_>, SimpleSpan)], eoi: usize) -> SyntaxResult<Expression> {
    let mut parser = FilterParser::new(tokens, eoi);

    if parser.at_end() {
        return Err(SyntaxError::grammar("empty filter expression", 0..eoi));
    }

    let expr = parser.parse_or()?;

    if let Some((tok, span)) = parser.peek_spanned() {
        return Err(SyntaxError::grammar(format!("unexpected '{}'", tok), span));
    }

    Ok(expr)
}

struct FilterParser<'t, 'src> {
    tokens: &'t [(Token<'src>, SimpleSpan)],
    pos: usize,
    eoi: usize,
    depth: usize,
}

impl<'t, 'src> FilterParser<'t, 'src> {
    fn new(tokens: &'t [(Token<'src>, SimpleSpan)], eoi: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            eoi,
            depth: 0,
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(tok, _)| tok)
    }

    fn peek_spanned(&self) -> Option<(Token<'src>, Span)> {
        self.tokens
            .get(self.pos)
            .map(|(tok, span)| (tok.clone(), span.start..span.end))
    }

    /// Span of the current token, or an empty span at end of input.
    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.start..span.end,
            None => self.eoi..self.eoi,
        }
    }

    /// End offset of the last consumed token.
    fn last_end(&self) -> usize {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some((_, span)) => span.end,
            None => 0,
        }
    }

    fn check(&self, expected: &Token<'_>) -> bool {
        self.peek() == Some(expected)
    }

    fn eat(&mut self, expected: &Token<'_>) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token<'_>) -> SyntaxResult<Span> {
        if self.check(&expected) {
            let span = self.current_span();
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn expect_ident(&mut self) -> SyntaxResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.to_string();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("expected an attribute name")),
        }
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING_DEPTH`].
    /// The error points at the token that opened the level.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> SyntaxResult<T>) -> SyntaxResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            let span = match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
                Some((_, span)) => span.start..span.end,
                None => self.current_span(),
            };
            return Err(SyntaxError::at(
                SyntaxErrorKind::Unsupported,
                "expression nested too deeply",
                span,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Grammar error at the current token.
    fn error(&self, message: &str) -> SyntaxError {
        let found = match self.peek() {
            Some(tok) => format!("'{}'", tok),
            None => "end of input".to_string(),
        };
        SyntaxError::grammar(format!("{}, found {}", message, found), self.current_span())
    }

    // ========================================================================
    // Boolean structure
    // ========================================================================

    fn parse_or(&mut self) -> SyntaxResult<Expression> {
        let mut operands = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            operands.push(self.parse_and()?);
        }
        Ok(connective(BoolOp::Or, operands))
    }

    fn parse_and(&mut self) -> SyntaxResult<Expression> {
        let mut operands = vec![self.parse_not()?];
        while self.eat(&Token::And) {
            operands.push(self.parse_not()?);
        }
        Ok(connective(BoolOp::And, operands))
    }

    fn parse_not(&mut self) -> SyntaxResult<Expression> {
        if !self.eat(&Token::Not) {
            return self.parse_comparison();
        }

        // `not (re.match(...))` folds into the regex node
        Ok(match self.nested(Self::parse_not)? {
            Expression::RegexMatch {
                negated,
                mode,
                pattern,
                target,
            } => Expression::RegexMatch {
                negated: !negated,
                mode,
                pattern,
                target,
            },
            other => Expression::not(other),
        })
    }

    fn parse_comparison(&mut self) -> SyntaxResult<Expression> {
        let left = self.parse_operand()?;

        let expr = if let Some(op) = self.compare_op() {
            self.pos += 1;
            let right = self.parse_operand()?;
            Expression::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            }
        } else if let Some(negated) = self.membership_op() {
            self.pos += if negated { 2 } else { 1 };
            let haystack = self.parse_operand()?;
            Expression::Membership {
                negated,
                needle: Box::new(left),
                haystack: Box::new(haystack),
            }
        } else {
            return Ok(left);
        };

        if self.compare_op().is_some() || self.membership_op().is_some() {
            return Err(SyntaxError::at(
                SyntaxErrorKind::Unsupported,
                "chained comparisons are not supported",
                self.current_span(),
            ));
        }

        Ok(expr)
    }

    fn compare_op(&self) -> Option<CompareOp> {
        match self.peek()? {
            Token::EqEq => Some(CompareOp::Eq),
            Token::NotEq => Some(CompareOp::Ne),
            Token::Lt => Some(CompareOp::Lt),
            Token::Le => Some(CompareOp::Le),
            Token::Gt => Some(CompareOp::Gt),
            Token::Ge => Some(CompareOp::Ge),
            _ => None,
        }
    }

    /// `Some(false)` for `in`, `Some(true)` for `not in`.
    fn membership_op(&self) -> Option<bool> {
        match (self.peek(), self.peek_at(1)) {
            (Some(Token::In), _) => Some(false),
            (Some(Token::Not), Some(Token::In)) => Some(true),
            _ => None,
        }
    }

    // ========================================================================
    // Operands
    // ========================================================================

    fn parse_operand(&mut self) -> SyntaxResult<Expression> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.nested(Self::parse_or)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(_)) => self.parse_access(),
            Some(
                Token::Number(_)
                | Token::Str(_)
                | Token::True
                | Token::False
                | Token::LBracket
                | Token::LBrace,
            ) => Ok(Expression::Literal(self.parse_literal()?)),
            _ => Err(self.error("expected an expression")),
        }
    }

    /// Attribute chains, subscripts and calls: `a.b["k"].c`, `a.b.startswith("x")`,
    /// `re.match("p", a.b)`.
    fn parse_access(&mut self) -> SyntaxResult<Expression> {
        let start = self.current_span().start;
        let mut segments = vec![self.expect_ident()?];
        let mut subscript: Option<(AttributePath, SubscriptKey)> = None;
        let mut fields: Vec<String> = Vec::new();

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = self.expect_ident()?;
                    if subscript.is_some() {
                        fields.push(name);
                    } else {
                        segments.push(name);
                    }
                }
                Some(Token::LBracket) => {
                    if subscript.is_some() {
                        return Err(SyntaxError::at(
                            SyntaxErrorKind::Unsupported,
                            "only one subscript per attribute is supported",
                            self.current_span(),
                        ));
                    }
                    let base = AttributePath::new(segments.clone(), start..self.last_end());
                    let open = self.expect(Token::LBracket)?;
                    let key = self.parse_subscript_key(open.start)?;
                    subscript = Some((base, key));
                }
                Some(Token::LParen) => {
                    return self.parse_call(start, segments, subscript, fields);
                }
                _ => break,
            }
        }

        let span = start..self.last_end();
        finish_access(segments, subscript, fields, span)
    }

    fn parse_subscript_key(&mut self, open: usize) -> SyntaxResult<SubscriptKey> {
        // `x["a", {...}]` and `x[("a", {...})]` are the same tuple
        let parenthesized = self.eat(&Token::LParen);
        let closing = if parenthesized {
            Token::RParen
        } else {
            Token::RBracket
        };

        let mut items = vec![self.parse_literal()?];
        while self.eat(&Token::Comma) {
            if self.check(&closing) {
                break;
            }
            items.push(self.parse_literal()?);
        }

        if parenthesized {
            self.expect(Token::RParen)?;
        }
        self.expect(Token::RBracket)?;
        let span = open..self.last_end();

        let mut items = items.into_iter();
        match (items.next(), items.next(), items.next()) {
            (Some(Literal::String(name)), None, None) => Ok(SubscriptKey::Name(name)),
            (Some(Literal::String(name)), Some(Literal::Map(context)), None) => {
                Ok(SubscriptKey::NameWithContext(name, context))
            }
            (Some(Literal::Map(_)), None, None) => Err(SyntaxError::invalid_subscript(
                "subscript needs a name before the context map",
                span,
            )),
            (Some(Literal::Map(_)), Some(_), None) => Err(SyntaxError::invalid_subscript(
                "subscript tuple must be ordered (name, context)",
                span,
            )),
            _ => Err(SyntaxError::invalid_subscript(
                "subscript must be a name or a (name, context) pair",
                span,
            )),
        }
    }

    fn parse_call(
        &mut self,
        start: usize,
        mut segments: Vec<String>,
        mut subscript: Option<(AttributePath, SubscriptKey)>,
        mut fields: Vec<String>,
    ) -> SyntaxResult<Expression> {
        let open = self.expect(Token::LParen)?;

        if subscript.is_none() && segments.len() == 2 && segments[0] == "re" {
            let mode = match segments[1].as_str() {
                "match" => RegexMode::Match,
                "search" => RegexMode::Search,
                other => {
                    return Err(SyntaxError::at(
                        SyntaxErrorKind::Unsupported,
                        format!("unsupported function 're.{}'", other),
                        start..open.end,
                    ))
                }
            };
            let pattern = match self.parse_literal()? {
                Literal::String(p) => p,
                other => {
                    return Err(SyntaxError::at(
                        SyntaxErrorKind::Unsupported,
                        format!("regex pattern must be a string, got {}", other.kind_name()),
                        start..self.last_end(),
                    ))
                }
            };
            self.expect(Token::Comma)?;
            let target = self.nested(Self::parse_operand)?;
            self.expect(Token::RParen)?;
            return Ok(Expression::RegexMatch {
                negated: false,
                mode,
                pattern,
                target: Box::new(target),
            });
        }

        // Method call: the last name is the method
        let method = if subscript.is_some() {
            fields.pop()
        } else if segments.len() > 1 {
            segments.pop()
        } else {
            None
        };

        let Some(method) = method else {
            return Err(SyntaxError::at(
                SyntaxErrorKind::Unsupported,
                format!("unsupported function '{}'", segments.join(".")),
                start..open.end,
            ));
        };

        if method != "startswith" && method != "endswith" {
            return Err(SyntaxError::at(
                SyntaxErrorKind::Unsupported,
                format!("unsupported method '{}'", method),
                start..open.end,
            ));
        }

        let target_end = open.start;
        let literal = self.parse_literal()?;
        if literal.as_str().is_none() {
            return Err(SyntaxError::at(
                SyntaxErrorKind::Unsupported,
                format!("{}() takes a string, got {}", method, literal.kind_name()),
                start..self.last_end(),
            ));
        }
        self.expect(Token::RParen)?;

        let target = finish_access(segments, subscript.take(), fields, start..target_end)?;
        let target = Box::new(target);
        Ok(if method == "startswith" {
            Expression::PrefixMatch { target, literal }
        } else {
            Expression::SuffixMatch { target, literal }
        })
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn parse_literal(&mut self) -> SyntaxResult<Literal> {
        let Some((tok, span)) = self.peek_spanned() else {
            return Err(self.error("expected a literal"));
        };

        match tok {
            Token::Number(text) => {
                self.pos += 1;
                parse_number(text, span)
            }
            Token::Str(raw) => {
                self.pos += 1;
                Ok(Literal::String(unescape(raw)))
            }
            Token::True => {
                self.pos += 1;
                Ok(Literal::Bool(true))
            }
            Token::False => {
                self.pos += 1;
                Ok(Literal::Bool(false))
            }
            Token::LBracket => {
                self.pos += 1;
                self.nested(Self::parse_list)
            }
            Token::LBrace => {
                self.pos += 1;
                self.nested(Self::parse_map)
            }
            _ => Err(self.error("expected a literal")),
        }
    }

    fn parse_list(&mut self) -> SyntaxResult<Literal> {
        let mut items = Vec::new();
        while !self.eat(&Token::RBracket) {
            items.push(self.parse_literal()?);
            if !self.eat(&Token::Comma) {
                self.expect(Token::RBracket)?;
                break;
            }
        }
        Ok(Literal::List(items))
    }

    fn parse_map(&mut self) -> SyntaxResult<Literal> {
        let mut entries = Vec::new();
        while !self.eat(&Token::RBrace) {
            let key = match self.peek() {
                Some(Token::Str(raw)) => {
                    let key = unescape(raw);
                    self.pos += 1;
                    key
                }
                _ => return Err(self.error("map keys must be strings")),
            };
            self.expect(Token::Colon)?;
            let value = self.parse_literal()?;
            entries.push((key, value));
            if !self.eat(&Token::Comma) {
                self.expect(Token::RBrace)?;
                break;
            }
        }
        Ok(Literal::Map(entries))
    }
}

fn connective(op: BoolOp, mut operands: Vec<Expression>) -> Expression {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        Expression::BooleanOp { op, operands }
    }
}

fn finish_access(
    segments: Vec<String>,
    subscript: Option<(AttributePath, SubscriptKey)>,
    mut fields: Vec<String>,
    span: Span,
) -> SyntaxResult<Expression> {
    match subscript {
        Some((base, key)) => {
            check_context_depth(&base.segments, &span)?;
            if fields.len() > 1 {
                return Err(SyntaxError::at(
                    SyntaxErrorKind::Unsupported,
                    format!("unexpected attribute chain '.{}'", fields.join(".")),
                    span,
                ));
            }
            Ok(Expression::Subscript(SubscriptAccess {
                base,
                key,
                field: fields.pop(),
                span,
            }))
        }
        None => {
            check_context_depth(&segments, &span)?;
            Ok(Expression::Attribute(AttributePath::new(segments, span)))
        }
    }
}

/// `metric.context.<key>` must name exactly one key.
fn check_context_depth(segments: &[String], span: &Span) -> SyntaxResult<()> {
    let Some(pos) = segments.iter().skip(1).position(|s| s == "context") else {
        return Ok(());
    };
    let depth = segments.len() - (pos + 2);
    if depth == 1 {
        return Ok(());
    }
    let message = if depth == 0 {
        format!("'{}' needs a context key", segments.join("."))
    } else {
        format!(
            "'{}' is nested too deeply; context keys are one level deep",
            segments.join(".")
        )
    };
    Err(SyntaxError::at(
        SyntaxErrorKind::ContextDepth,
        message,
        span.clone(),
    ))
}

fn parse_number(text: &str, span: Span) -> SyntaxResult<Literal> {
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>()
            .map(Literal::Float)
            .map_err(|e| SyntaxError::lexical(format!("invalid float '{}': {}", text, e), span))
    } else {
        text.parse::<i64>()
            .map(Literal::Int)
            .map_err(|e| SyntaxError::lexical(format!("invalid integer '{}': {}", text, e), span))
    }
}

/// Resolve backslash escapes. Unknown escapes are kept as written so regex
/// patterns such as `'\d+'` survive.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(q @ ('\\' | '\'' | '"')) => out.push(q),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
