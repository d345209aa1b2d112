//! Compilation from filter expressions to SQL predicates.
//!
//! ```text
//! Expression → [resolve] columns/slices → [joins] aliases → [predicate] IR → tokens
//! ```
//!
//! - [`resolve`] - root identifiers, table mapping, attribute catalogue
//! - [`joins`] - join signatures, aliases and descriptors
//! - [`predicate`] - predicate IR, lowering and rendering

pub mod joins;
pub mod predicate;
pub mod resolve;

pub use joins::{JoinDescriptor, JoinKind, JoinPlanner, JoinSignature};
pub use predicate::{Operand, Predicate, PredicateCompiler, Rendered};
pub use resolve::{Entity, Resolved, Resolver, Slice, TableMapping};
