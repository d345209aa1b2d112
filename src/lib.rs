//! # runfilter
//!
//! Compiles the run/metric search language of an experiment-tracking service
//! into parameterized SQL predicates for Postgres and SQLite.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Filter text                          │
//! │   run.metrics["loss"].last < 0.5 and not run.archived   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [filter: lexer + parser]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Expression AST                        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compile: resolve + joins]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Predicate IR + ordered LEFT JOINs              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql: dialect rendering]
//! ┌─────────────────────────────────────────────────────────┐
//! │         JOIN / WHERE text + bound parameters            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The entry point is [`QueryParser`].

pub mod compile;
pub mod config;
pub mod error;
pub mod filter;
pub mod query;
pub mod sql;

pub use config::{ConfigError, DefaultExpression, QueryParserConfig};
pub use error::{SyntaxError, SyntaxErrorKind, SyntaxResult};
pub use filter::{Expression, Literal};
pub use query::{CompiledPredicate, QueryParser};
pub use sql::{Dialect, SqlDialect};
