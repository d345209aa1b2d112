//! The query parser facade.
//!
//! [`QueryParser`] is built once from a [`QueryParserConfig`] and then turns
//! filter text into a [`CompiledPredicate`]:
//!
//! ```ignore
//! use runfilter::{QueryParser, QueryParserConfig};
//!
//! let config = QueryParserConfig::default()
//!     .with_dialect("postgres")
//!     .with_default_expression("run.archived", "not run.archived");
//! let parser = QueryParser::new(config)?;
//!
//! let compiled = parser.parse(r#"run.metrics["loss"].last < 0.5"#)?;
//! println!("{}", compiled.to_sql());
//! // LEFT JOIN latest_metrics metrics_0 ON runs.run_uuid = metrics_0.run_uuid
//! //   AND metrics_0.key = $1 WHERE "metrics_0"."value" < $2
//! //   AND "runs"."lifecycle_stage" <> $3
//! ```

use serde::Serialize;
use tracing::debug;

use crate::compile::{JoinDescriptor, JoinKind, JoinPlanner, Predicate, PredicateCompiler};
use crate::compile::{Resolver, TableMapping};
use crate::config::{ConfigError, DefaultExpression, QueryParserConfig};
use crate::error::SyntaxResult;
use crate::filter::{self, Expression, Literal};
use crate::sql::{Dialect, Token, TokenStream};

pub use crate::compile::resolve::LIFECYCLE_STAGE_DELETED;

/// Compiles filter text into parameterized SQL fragments.
///
/// Configuration is read-only after construction; the parser can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct QueryParser {
    dialect: Dialect,
    tables: TableMapping,
    default_expression: DefaultExpression,
    default_ast: Option<Expression>,
}

impl QueryParser {
    /// Validate `config` and build a parser.
    ///
    /// Fails on an unknown dialect, a table name that is not a plain
    /// identifier, or a default expression that does not compile.
    pub fn new(config: QueryParserConfig) -> Result<Self, ConfigError> {
        let dialect: Dialect = config.dialect.parse()?;
        let tables = TableMapping::new(&config.tables)?;

        let default_ast = if config.default_expression.expression.trim().is_empty() {
            None
        } else {
            Some(
                filter::parse(&config.default_expression.expression)
                    .map_err(ConfigError::InvalidDefaultExpression)?,
            )
        };

        let parser = Self {
            dialect,
            tables,
            default_expression: config.default_expression,
            default_ast,
        };

        // Resolution errors in the default only show up when it is compiled
        if let Some(ast) = &parser.default_ast {
            parser
                .compile(None, Some(ast))
                .map_err(ConfigError::InvalidDefaultExpression)?;
        }

        Ok(parser)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parse and compile `query`.
    ///
    /// An empty query compiles to the default expression alone (or to an
    /// empty predicate when there is none).
    pub fn parse(&self, query: &str) -> SyntaxResult<CompiledPredicate> {
        let user = if query.trim().is_empty() {
            None
        } else {
            Some(filter::parse(query)?)
        };

        let default = self.default_ast.as_ref().filter(|_| {
            let contains = &self.default_expression.contains;
            let suppressed = !contains.is_empty() && query.contains(contains.as_str());
            if suppressed {
                debug!(contains = %contains, "default expression suppressed");
            }
            !suppressed
        });

        let compiled = self.compile(user.as_ref(), default)?;

        debug!(
            dialect = %self.dialect,
            joins = compiled.joins.len(),
            params = compiled.bound_values().len(),
            "compiled filter query"
        );

        Ok(compiled)
    }

    fn compile(
        &self,
        user: Option<&Expression>,
        default: Option<&Expression>,
    ) -> SyntaxResult<CompiledPredicate> {
        let resolver = Resolver::new(&self.tables);
        let mut planner = JoinPlanner::new(&resolver, self.dialect);

        let mut parts = Vec::new();
        {
            let mut compiler = PredicateCompiler::new(&mut planner, self.dialect);
            for expr in user.iter().chain(default.iter()) {
                parts.push(compiler.compile(expr)?);
            }
        }
        let main = Predicate::all(parts);

        let joins = planner.into_joins();

        // Context slice filters go first, in join order
        let mut conditions: Vec<Predicate> = joins
            .iter()
            .flat_map(|join| join.filters().iter().cloned())
            .collect();
        conditions.extend(main);

        let (where_clause, params) = match Predicate::all(conditions) {
            Some(predicate) => {
                let rendered = predicate.render(self.dialect)?;
                (Some(rendered.tokens), rendered.params)
            }
            None => (None, Vec::new()),
        };

        Ok(CompiledPredicate {
            dialect: self.dialect,
            joins,
            where_clause,
            params,
        })
    }
}

/// The result of one [`QueryParser::parse`] call.
///
/// Placeholders in [`where_text`](Self::where_text) are numbered from `$1`
/// and match [`params`](Self::params). [`to_sql`](Self::to_sql) numbers the
/// JOIN parameters first, then the WHERE ones, matching
/// [`bound_values`](Self::bound_values).
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    dialect: Dialect,
    joins: Vec<JoinDescriptor>,
    where_clause: Option<TokenStream>,
    params: Vec<Literal>,
}

impl CompiledPredicate {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Joins in alias order.
    pub fn joins(&self) -> &[JoinDescriptor] {
        &self.joins
    }

    /// The WHERE condition without the keyword; empty when there is none.
    pub fn where_text(&self) -> String {
        self.where_clause
            .as_ref()
            .map(|ts| ts.serialize(self.dialect))
            .unwrap_or_default()
    }

    /// Parameters of [`where_text`](Self::where_text).
    pub fn params(&self) -> &[Literal] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty() && self.where_clause.is_none()
    }

    fn join_param_count(&self) -> usize {
        self.joins.iter().map(|j| j.bound_values().len()).sum()
    }

    /// `LEFT JOIN ... WHERE ...` with placeholders numbered across the
    /// whole fragment.
    pub fn to_sql(&self) -> String {
        let mut parts = Vec::with_capacity(self.joins.len() + 1);
        let mut base = 0;
        for join in &self.joins {
            parts.push(join.render_from(base));
            base += join.bound_values().len();
        }

        if let Some(where_clause) = &self.where_clause {
            let mut ts = TokenStream::new();
            ts.push(Token::Where).space().append(where_clause);
            parts.push(ts.serialize_from(self.dialect, base));
        }

        parts.join(" ")
    }

    /// Every bound value of [`to_sql`](Self::to_sql), in placeholder order.
    pub fn bound_values(&self) -> Vec<Literal> {
        let mut values = Vec::with_capacity(self.join_param_count() + self.params.len());
        for join in &self.joins {
            values.extend(join.bound_values().iter().cloned());
        }
        values.extend(self.params.iter().cloned());
        values
    }

    /// Serializable snapshot of the fragment.
    pub fn summary(&self) -> CompiledSummary {
        CompiledSummary {
            dialect: self.dialect.to_string(),
            joins: self
                .joins
                .iter()
                .map(|j| JoinSummary {
                    kind: j.kind(),
                    source_table: j.source_table().to_string(),
                    alias: j.alias().to_string(),
                    on_clause: j.on_clause(),
                    bound_values: j.bound_values().to_vec(),
                })
                .collect(),
            where_text: self.where_text(),
            params: self.params.clone(),
            sql: self.to_sql(),
            bound_values: self.bound_values(),
        }
    }
}

/// JSON-friendly view of a [`CompiledPredicate`].
#[derive(Debug, Clone, Serialize)]
pub struct CompiledSummary {
    pub dialect: String,
    pub joins: Vec<JoinSummary>,
    pub where_text: String,
    pub params: Vec<Literal>,
    pub sql: String,
    pub bound_values: Vec<Literal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinSummary {
    pub kind: JoinKind,
    pub source_table: String,
    pub alias: String,
    pub on_clause: String,
    pub bound_values: Vec<Literal>,
}
