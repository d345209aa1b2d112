//! Join planning.
//!
//! Every metric slice, context slice and tag slice in a query needs a LEFT
//! JOIN. The planner gives each distinct access one join, in the order the
//! accesses first appear in the query text, with aliases numbered by a single
//! counter shared across join kinds:
//!
//! ```text
//! run.metrics["loss", {"subset": "val"}].last < 1 and run.tags["team"] == "nlp"
//!
//! LEFT JOIN latest_metrics metrics_0 ON runs.run_uuid = metrics_0.run_uuid AND metrics_0.key = $1
//! LEFT JOIN contexts contexts_1 ON metrics_0.context_id = contexts_1.id
//! LEFT JOIN tags tags_2 ON runs.run_uuid = tags_2.run_uuid AND tags_2.key = $2
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tracing::trace;

use super::predicate::{Operand, Predicate};
use super::resolve::{Entity, Resolver, Slice, CONTEXTS, LATEST_METRICS, TAGS};
use crate::error::{SyntaxError, SyntaxResult};
use crate::filter::{CompareOp, Literal};
use crate::sql::{Dialect, Token, TokenStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Metric,
    Context,
    Tag,
    Experiment,
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Metric => write!(f, "metric"),
            JoinKind::Context => write!(f, "context"),
            JoinKind::Tag => write!(f, "tag"),
            JoinKind::Experiment => write!(f, "experiment"),
        }
    }
}

/// Identity of a join. Accesses with equal signatures share one alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinSignature {
    pub kind: JoinKind,
    /// Metric or tag name.
    pub name: Option<String>,
    /// Compact JSON of the context map, keys normalized.
    pub context: Option<String>,
    /// Index of the join this one hangs off.
    pub parent: Option<usize>,
}

/// One planned LEFT JOIN.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinDescriptor {
    kind: JoinKind,
    source_table: String,
    alias: String,
    on: TokenStream,
    bound_values: Vec<Literal>,
    filters: Vec<Predicate>,
    dialect: Dialect,
}

impl JoinDescriptor {
    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn source_table(&self) -> &str {
        &self.source_table
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The ON condition, placeholders numbered from `$1`.
    pub fn on_clause(&self) -> String {
        self.on.serialize(self.dialect)
    }

    /// Values bound by the ON condition, in placeholder order.
    pub fn bound_values(&self) -> &[Literal] {
        &self.bound_values
    }

    /// WHERE conditions this join contributes (context slice entries).
    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    /// `LEFT JOIN <table> <alias> ON <condition>` with placeholders numbered
    /// after `param_base` earlier ones.
    pub fn render_from(&self, param_base: usize) -> String {
        let mut ts = TokenStream::new();
        ts.push(Token::Left)
            .space()
            .push(Token::Join)
            .space()
            .push(Token::BareIdent(self.source_table.clone()))
            .space()
            .push(Token::BareIdent(self.alias.clone()))
            .space()
            .push(Token::On)
            .space()
            .append(&self.on);
        ts.serialize_from(self.dialect, param_base)
    }
}

/// Per-query join state: signature table plus the ordered join list.
pub struct JoinPlanner<'a> {
    resolver: &'a Resolver<'a>,
    dialect: Dialect,
    signatures: HashMap<JoinSignature, usize>,
    joins: Vec<JoinDescriptor>,
}

impl<'a> JoinPlanner<'a> {
    pub fn new(resolver: &'a Resolver<'a>, dialect: Dialect) -> Self {
        Self {
            resolver,
            dialect,
            signatures: HashMap::new(),
            joins: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &'a Resolver<'a> {
        self.resolver
    }

    /// Alias whose value column a slice reads, allocating joins as needed.
    ///
    /// Called in the order accesses appear in the query, which fixes the
    /// alias numbering.
    pub fn slice_alias(&mut self, slice: &Slice) -> SyntaxResult<String> {
        let index = match slice {
            Slice::Metric { name, context, .. } => self.metric_join(name, context)?,
            Slice::Tag { name } => self.tag_join(name)?,
        };
        Ok(self.joins[index].alias.clone())
    }

    /// Alias of the run's experiment, joining the experiments table once.
    pub fn experiment_alias(&mut self) -> SyntaxResult<String> {
        let signature = JoinSignature {
            kind: JoinKind::Experiment,
            name: None,
            context: None,
            parent: None,
        };
        let runs = self.runs_table()?;
        let source = self
            .resolver
            .tables()
            .table(Entity::Experiments, "experiments")?
            .to_string();
        let index = self.allocate(signature, source, |alias| {
            let mut on = TokenStream::new();
            on.push(bare(&runs, "experiment_id"))
                .space()
                .push(Token::Eq)
                .space()
                .push(bare(alias, "experiment_id"));
            (on, Vec::new(), Vec::new())
        });
        Ok(self.joins[index].alias.clone())
    }

    /// `context` keys are already normalized by the resolver.
    fn metric_join(&mut self, name: &str, context: &[(String, Literal)]) -> SyntaxResult<usize> {
        let serialized = if context.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&Literal::Map(context.to_vec())).map_err(|e| {
                SyntaxError::unsupported(format!("cannot encode context: {}", e))
            })?)
        };

        let signature = JoinSignature {
            kind: JoinKind::Metric,
            name: Some(name.to_string()),
            context: serialized.clone(),
            parent: None,
        };
        let runs = self.runs_table()?;
        let source = self.resolver.tables().auxiliary(LATEST_METRICS).to_string();
        let metric = self.allocate(signature, source, |alias| {
            let mut on = TokenStream::new();
            on.push(bare(&runs, "run_uuid"))
                .space()
                .push(Token::Eq)
                .space()
                .push(bare(alias, "run_uuid"))
                .space()
                .push(Token::And)
                .space()
                .push(bare(alias, "key"))
                .space()
                .push(Token::Eq)
                .space()
                .push(Token::Param(0));
            (on, vec![Literal::from(name)], Vec::new())
        });

        if serialized.is_none() {
            return Ok(metric);
        }

        let signature = JoinSignature {
            kind: JoinKind::Context,
            name: None,
            context: serialized,
            parent: Some(metric),
        };
        let metric_alias = self.joins[metric].alias.clone();
        let source = self.resolver.tables().auxiliary(CONTEXTS).to_string();
        self.allocate(signature, source, |alias| {
            let mut on = TokenStream::new();
            on.push(bare(&metric_alias, "context_id"))
                .space()
                .push(Token::Eq)
                .space()
                .push(bare(alias, "id"));
            let filters = context
                .iter()
                .map(|(key, value)| Predicate::Compare {
                    lhs: Operand::JsonExtract {
                        table: alias.to_string(),
                        column: "json",
                        key: key.clone(),
                    },
                    op: CompareOp::Eq,
                    rhs: Operand::literal(value.clone()),
                })
                .collect();
            (on, Vec::new(), filters)
        });

        Ok(metric)
    }

    fn tag_join(&mut self, name: &str) -> SyntaxResult<usize> {
        let signature = JoinSignature {
            kind: JoinKind::Tag,
            name: Some(name.to_string()),
            context: None,
            parent: None,
        };
        let runs = self.runs_table()?;
        let source = self.resolver.tables().auxiliary(TAGS).to_string();
        Ok(self.allocate(signature, source, |alias| {
            let mut on = TokenStream::new();
            on.push(bare(&runs, "run_uuid"))
                .space()
                .push(Token::Eq)
                .space()
                .push(bare(alias, "run_uuid"))
                .space()
                .push(Token::And)
                .space()
                .push(bare(alias, "key"))
                .space()
                .push(Token::Eq)
                .space()
                .push(Token::Param(0));
            (on, vec![Literal::from(name)], Vec::new())
        }))
    }

    fn runs_table(&self) -> SyntaxResult<String> {
        self.resolver
            .tables()
            .table(Entity::Runs, "run")
            .map(str::to_string)
    }

    /// Lookup-or-insert. `build` receives the new alias and returns the ON
    /// condition, its bound values and any WHERE filters.
    fn allocate<F>(&mut self, signature: JoinSignature, source_table: String, build: F) -> usize
    where
        F: FnOnce(&str) -> (TokenStream, Vec<Literal>, Vec<Predicate>),
    {
        if let Some(&index) = self.signatures.get(&signature) {
            return index;
        }

        let index = self.joins.len();
        let prefix = source_table
            .strip_prefix("latest_")
            .unwrap_or(&source_table);
        let alias = format!("{}_{}", prefix.to_lowercase(), index);
        let (on, bound_values, filters) = build(&alias);

        trace!(kind = %signature.kind, alias = %alias, "allocated join");

        self.joins.push(JoinDescriptor {
            kind: signature.kind,
            source_table,
            alias,
            on,
            bound_values,
            filters,
            dialect: self.dialect,
        });
        self.signatures.insert(signature, index);
        index
    }

    pub fn into_joins(self) -> Vec<JoinDescriptor> {
        self.joins
    }
}

fn bare(table: &str, column: &str) -> Token {
    Token::BareQualified {
        table: table.to_string(),
        column: column.to_string(),
    }
}
