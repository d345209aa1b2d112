//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use super::LikeMode;
use crate::error::{SyntaxError, SyntaxResult};
use crate::filter::Literal;

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
/// Used by: All dialects
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// LIKE Templates
// =============================================================================

/// Wrap `needle` in `%` wildcards for the given mode.
/// Used by: All dialects
pub fn like_template(mode: LikeMode, needle: &str) -> String {
    match mode {
        LikeMode::Contains => format!("%{}%", needle),
        LikeMode::Prefix => format!("{}%", needle),
        LikeMode::Suffix => format!("%{}", needle),
    }
}

// =============================================================================
// JSON Literal Encoding
// =============================================================================

/// JSON with `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn encode_error(literal: &Literal, err: impl std::fmt::Display) -> SyntaxError {
    SyntaxError::unsupported(format!("cannot encode {} literal: {}", literal.kind_name(), err))
}

/// `[1, 2, 3]`, `{"k": "v"}`.
/// Used by: Postgres
pub fn encode_json_spaced(literal: &Literal) -> SyntaxResult<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    literal
        .serialize(&mut ser)
        .map_err(|e| encode_error(literal, e))?;
    String::from_utf8(buf).map_err(|e| encode_error(literal, e))
}

/// `[1,2,3]`, `{"k":"v"}`.
/// Used by: SQLite
pub fn encode_json_compact(literal: &Literal) -> SyntaxResult<String> {
    serde_json::to_string(literal).map_err(|e| encode_error(literal, e))
}
