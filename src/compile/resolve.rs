//! Symbol resolution.
//!
//! Maps root identifiers (`run`, `metrics`, `experiment`, ...) to entities,
//! entities to physical tables, and attribute paths to columns.
//!
//! ```text
//! run.name              → "runs"."name"
//! run.archived          → "runs"."lifecycle_stage" = 'deleted'
//! metric.context.subset → JSON extract of "contexts"."json"
//! run.metrics["loss"]   → metric slice, joined from latest_metrics
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ConfigError;
use crate::error::{Span, SyntaxError, SyntaxErrorKind, SyntaxResult};
use crate::filter::{AttributePath, Literal, SubscriptAccess, SubscriptKey};

/// Physical table holding the newest value of every run metric.
pub const LATEST_METRICS: &str = "latest_metrics";
/// Physical table holding metric context documents.
pub const CONTEXTS: &str = "contexts";
/// Physical table holding run tags.
pub const TAGS: &str = "tags";

/// Lifecycle stage of an archived run.
pub const LIFECYCLE_STAGE_DELETED: &str = "deleted";
/// Status of a run that has not finished.
pub const STATUS_RUNNING: &str = "RUNNING";

/// An entity the filter language can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Runs,
    Metrics,
    Experiments,
}

impl Entity {
    /// Entity for a root identifier, accepting singular and plural forms.
    pub fn from_root(root: &str) -> Option<Self> {
        match root {
            "run" | "runs" => Some(Entity::Runs),
            "metric" | "metrics" => Some(Entity::Metrics),
            "experiment" | "experiments" => Some(Entity::Experiments),
            _ => None,
        }
    }

    /// Key of this entity in the table mapping.
    pub fn key(&self) -> &'static str {
        match self {
            Entity::Runs => "runs",
            Entity::Metrics => "metrics",
            Entity::Experiments => "experiments",
        }
    }
}

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Validated symbolic-name → table-name mapping.
///
/// Names end up unquoted in join conditions, so only plain identifiers are
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    tables: BTreeMap<String, String>,
}

impl TableMapping {
    pub fn new(tables: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        for (entity, table) in tables {
            if !TABLE_NAME.is_match(table) {
                return Err(ConfigError::InvalidTableName {
                    entity: entity.clone(),
                    table: table.clone(),
                });
            }
        }
        Ok(Self {
            tables: tables.clone(),
        })
    }

    /// Table for an entity; missing entries are unresolved symbols.
    pub fn table(&self, entity: Entity, root: &str) -> SyntaxResult<&str> {
        self.tables
            .get(entity.key())
            .map(String::as_str)
            .ok_or_else(|| SyntaxError::unresolved(root))
    }

    /// Auxiliary table (`latest_metrics`, `contexts`, `tags`), overridable
    /// through the mapping.
    pub fn auxiliary<'a>(&'a self, name: &'a str) -> &'a str {
        self.tables.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// What an attribute path refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A plain column.
    Column { table: String, column: &'static str },
    /// A boolean attribute stored as `column = value`.
    Flag {
        table: String,
        column: &'static str,
        value: &'static str,
    },
    /// One key of the metric context document.
    ContextKey { table: String, key: String },
    /// A column of the run's experiment, read through an experiments join.
    ExperimentColumn { column: &'static str },
}

/// What a subscript refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Slice {
    /// `run.metrics["name", {ctx}].<field>`
    Metric {
        name: String,
        context: Vec<(String, Literal)>,
        column: &'static str,
    },
    /// `run.tags["key"]`
    Tag { name: String },
}

pub struct Resolver<'a> {
    tables: &'a TableMapping,
}

impl<'a> Resolver<'a> {
    pub fn new(tables: &'a TableMapping) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &'a TableMapping {
        self.tables
    }

    fn entity(&self, path: &AttributePath) -> SyntaxResult<(Entity, &'a str)> {
        let root = path.root();
        let entity = Entity::from_root(root)
            .ok_or_else(|| SyntaxError::unresolved(root).with_span(path.span.clone()))?;
        let table = self
            .tables
            .table(entity, root)
            .map_err(|e| e.with_span(path.span.clone()))?;
        Ok((entity, table))
    }

    /// Resolve a dotted attribute chain.
    pub fn resolve_attribute(&self, path: &AttributePath) -> SyntaxResult<Resolved> {
        let (entity, table) = self.entity(path)?;
        let attrs: Vec<&str> = path.attributes().iter().map(String::as_str).collect();
        let column = |column| Resolved::Column {
            table: table.to_string(),
            column,
        };

        let resolved = match (entity, attrs.as_slice()) {
            (Entity::Runs, ["name"]) => column("name"),
            (Entity::Runs, ["hash"]) => column("run_uuid"),
            (Entity::Runs, ["created_at"]) => column("start_time"),
            (Entity::Runs, ["finalized_at"]) => column("end_time"),
            (Entity::Runs, ["experiment"]) => {
                self.tables
                    .table(Entity::Experiments, "experiments")
                    .map_err(|e| e.with_span(path.span.clone()))?;
                Resolved::ExperimentColumn { column: "name" }
            }
            (Entity::Runs, ["archived"]) => Resolved::Flag {
                table: table.to_string(),
                column: "lifecycle_stage",
                value: LIFECYCLE_STAGE_DELETED,
            },
            (Entity::Runs, ["active"]) => Resolved::Flag {
                table: table.to_string(),
                column: "status",
                value: STATUS_RUNNING,
            },

            (Entity::Metrics, ["name"]) => column("key"),
            (Entity::Metrics, ["last"]) => column("value"),
            (Entity::Metrics, ["last_step"]) => column("last_iter"),
            (Entity::Metrics, ["context", key]) => Resolved::ContextKey {
                table: self.tables.auxiliary(CONTEXTS).to_string(),
                key: key.to_string(),
            },

            (Entity::Experiments, ["name"]) => column("name"),

            (_, []) => {
                return Err(SyntaxError::at(
                    SyntaxErrorKind::Unsupported,
                    format!("'{}' is an entity, not a value", path),
                    path.span.clone(),
                ))
            }
            (_, attrs) => {
                return Err(SyntaxError::unknown_attribute(entity.key(), &attrs.join("."))
                    .with_span(path.span.clone()))
            }
        };

        Ok(resolved)
    }

    /// Resolve `base[key].field`.
    pub fn resolve_subscript(&self, access: &SubscriptAccess) -> SyntaxResult<Slice> {
        let base = &access.base;
        let span = access.span.clone();
        let (entity, _) = self.entity(base)?;
        let attrs: Vec<&str> = base.attributes().iter().map(String::as_str).collect();

        match (entity, attrs.as_slice()) {
            (Entity::Runs, ["metrics"]) => {
                let column = match access.field.as_deref() {
                    Some("last") => "value",
                    Some("last_step") => "last_iter",
                    Some(other) => {
                        return Err(SyntaxError::unknown_attribute("metric slice", other)
                            .with_span(span))
                    }
                    None => {
                        return Err(SyntaxError::at(
                            SyntaxErrorKind::Unsupported,
                            "metric slice needs a field such as '.last'",
                            span,
                        ))
                    }
                };
                let context = access
                    .key
                    .context()
                    .map(|context| normalize_context(context, &span))
                    .transpose()?
                    .unwrap_or_default();
                Ok(Slice::Metric {
                    name: access.key.name().to_string(),
                    context,
                    column,
                })
            }
            (Entity::Runs, ["tags"]) => {
                if let SubscriptKey::NameWithContext(..) = access.key {
                    return Err(SyntaxError::invalid_subscript(
                        "tags take a single key",
                        span,
                    ));
                }
                if let Some(field) = &access.field {
                    return Err(SyntaxError::unknown_attribute("tag", field).with_span(span));
                }
                Ok(Slice::Tag {
                    name: access.key.name().to_string(),
                })
            }
            _ => Err(SyntaxError::at(
                SyntaxErrorKind::Unsupported,
                format!("'{}' cannot be subscripted", base),
                span,
            )),
        }
    }
}

/// Context keys may be written as JSON paths (`$.subset`); strip the prefix.
/// Keys address one level of the context document, so dotted keys are
/// rejected.
fn normalize_context(
    context: &[(String, Literal)],
    span: &Span,
) -> SyntaxResult<Vec<(String, Literal)>> {
    context
        .iter()
        .map(|(key, value)| {
            let key = key.strip_prefix("$.").unwrap_or(key);
            if key.is_empty() || key.contains('.') {
                return Err(SyntaxError::invalid_subscript(
                    format!("context key '{}' must name a single top-level key", key),
                    span.clone(),
                ));
            }
            Ok((key.to_string(), value.clone()))
        })
        .collect()
}
