//! SQL rendering.
//!
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod token;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, LikeMode, SqlDialect};
pub use token::{Token, TokenStream};
