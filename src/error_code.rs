//! Stable diagnostic codes.
//!
//! Codes are grouped by numeric range and never reused once published:
//! - E0001–E0099: syntax
//! - E0100–E0199: import / module
//! - E0200–E0299: type
//! - E0300–E0399: runtime
//! - E0400–E0499: name / scope
//! - E0500–E0599: value
//! - E0600–E0699: I/O
//! - W0001–W0099: warnings

use std::fmt;

use serde::Serialize;

use crate::diagnostics::Severity;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    // Syntax
    /// Unexpected token
    E0001,
    /// Unterminated string literal
    E0002,
    /// Invalid number literal
    E0003,
    /// Unexpected end of input
    E0004,
    /// Invalid assignment target
    E0005,
    /// Unexpected character
    E0006,

    // Import / module
    /// Module not found
    E0101,
    /// Module has no such member
    E0102,

    // Type
    /// Type mismatch
    E0201,
    /// Value is not callable
    E0202,
    /// Unsupported operand types
    E0203,

    // Runtime
    /// Division or modulo by zero
    E0301,
    /// Index out of range
    E0302,
    /// Key not found
    E0303,
    /// Integer overflow
    E0304,
    /// `break` / `continue` outside a loop
    E0305,
    /// Maximum call depth exceeded
    E0306,
    /// Step limit exceeded
    E0307,

    // Name / scope
    /// Undefined variable
    E0401,
    /// Undefined function
    E0402,
    /// Attribute not found
    E0403,
    /// Undefined class or invalid `super()`
    E0404,

    // Value
    /// Wrong number of arguments
    E0501,
    /// Invalid value
    E0502,
    /// Invalid range step
    E0503,

    // I/O
    /// File not found
    E0601,
    /// I/O failure
    E0602,

    // Warnings
    /// Loop variable shadows an existing binding
    W0001,
    /// Class redefined
    W0002,
}

/// Coarse grouping derived from the numeric range of a code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Syntax,
    Import,
    Type,
    Runtime,
    Name,
    Value,
    Io,
    Warning,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E0001 => "E0001",
            ErrorCode::E0002 => "E0002",
            ErrorCode::E0003 => "E0003",
            ErrorCode::E0004 => "E0004",
            ErrorCode::E0005 => "E0005",
            ErrorCode::E0006 => "E0006",
            ErrorCode::E0101 => "E0101",
            ErrorCode::E0102 => "E0102",
            ErrorCode::E0201 => "E0201",
            ErrorCode::E0202 => "E0202",
            ErrorCode::E0203 => "E0203",
            ErrorCode::E0301 => "E0301",
            ErrorCode::E0302 => "E0302",
            ErrorCode::E0303 => "E0303",
            ErrorCode::E0304 => "E0304",
            ErrorCode::E0305 => "E0305",
            ErrorCode::E0306 => "E0306",
            ErrorCode::E0307 => "E0307",
            ErrorCode::E0401 => "E0401",
            ErrorCode::E0402 => "E0402",
            ErrorCode::E0403 => "E0403",
            ErrorCode::E0404 => "E0404",
            ErrorCode::E0501 => "E0501",
            ErrorCode::E0502 => "E0502",
            ErrorCode::E0503 => "E0503",
            ErrorCode::E0601 => "E0601",
            ErrorCode::E0602 => "E0602",
            ErrorCode::W0001 => "W0001",
            ErrorCode::W0002 => "W0002",
        }
    }

    /// Parse a code from its textual form, e.g. `"E0401"`.
    pub fn from_str_code(code: &str) -> Option<ErrorCode> {
        ALL.iter().copied().find(|candidate| candidate.as_str() == code)
    }

    pub fn category(self) -> Category {
        let text = self.as_str();
        if text.starts_with('W') {
            return Category::Warning;
        }
        let number: u16 = text[1..].parse().unwrap_or(0);
        match number {
            0..=99 => Category::Syntax,
            100..=199 => Category::Import,
            200..=299 => Category::Type,
            300..=399 => Category::Runtime,
            400..=499 => Category::Name,
            500..=599 => Category::Value,
            _ => Category::Io,
        }
    }

    pub fn default_severity(self) -> Severity {
        match self.category() {
            Category::Warning => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// One-line description used by `--explain`-style tooling.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::E0001 => "unexpected token",
            ErrorCode::E0002 => "unterminated string literal",
            ErrorCode::E0003 => "invalid number literal",
            ErrorCode::E0004 => "unexpected end of input",
            ErrorCode::E0005 => "invalid assignment target",
            ErrorCode::E0006 => "unexpected character",
            ErrorCode::E0101 => "module not found",
            ErrorCode::E0102 => "module has no such member",
            ErrorCode::E0201 => "type mismatch",
            ErrorCode::E0202 => "value is not callable",
            ErrorCode::E0203 => "unsupported operand types",
            ErrorCode::E0301 => "division by zero",
            ErrorCode::E0302 => "index out of range",
            ErrorCode::E0303 => "key not found",
            ErrorCode::E0304 => "integer overflow",
            ErrorCode::E0305 => "loop control outside of a loop",
            ErrorCode::E0306 => "maximum call depth exceeded",
            ErrorCode::E0307 => "step limit exceeded",
            ErrorCode::E0401 => "undefined variable",
            ErrorCode::E0402 => "undefined function",
            ErrorCode::E0403 => "attribute not found",
            ErrorCode::E0404 => "undefined class or invalid super()",
            ErrorCode::E0501 => "wrong number of arguments",
            ErrorCode::E0502 => "invalid value",
            ErrorCode::E0503 => "invalid range step",
            ErrorCode::E0601 => "file not found",
            ErrorCode::E0602 => "I/O failure",
            ErrorCode::W0001 => "loop variable shadows an existing binding",
            ErrorCode::W0002 => "class redefined",
        }
    }
}

const ALL: &[ErrorCode] = &[
    ErrorCode::E0001,
    ErrorCode::E0002,
    ErrorCode::E0003,
    ErrorCode::E0004,
    ErrorCode::E0005,
    ErrorCode::E0006,
    ErrorCode::E0101,
    ErrorCode::E0102,
    ErrorCode::E0201,
    ErrorCode::E0202,
    ErrorCode::E0203,
    ErrorCode::E0301,
    ErrorCode::E0302,
    ErrorCode::E0303,
    ErrorCode::E0304,
    ErrorCode::E0305,
    ErrorCode::E0306,
    ErrorCode::E0307,
    ErrorCode::E0401,
    ErrorCode::E0402,
    ErrorCode::E0403,
    ErrorCode::E0404,
    ErrorCode::E0501,
    ErrorCode::E0502,
    ErrorCode::E0503,
    ErrorCode::E0601,
    ErrorCode::E0602,
    ErrorCode::W0001,
    ErrorCode::W0002,
];

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
