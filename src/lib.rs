//! Execution core of the Lumen scripting language: a recursive-descent
//! parser producing span-annotated syntax trees and a tree-walking
//! evaluator with a scope stack, a global function table and a class
//! system with method resolution order.

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod error_code;
pub mod lexer;
pub mod logging;
pub mod object;
pub mod outcome;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod stack;
pub mod stdlib;
pub mod suggest;
pub mod value;

pub use config::InterpreterConfig;
pub use diagnostics::{Diagnostic, LumenError, Severity, SourceLocation, SourceSpan, SourceText};
pub use error_code::ErrorCode;
pub use outcome::{LastError, Outcome, OutcomeError};
pub use parser::parse_program;
pub use repl::Repl;
pub use runtime::{ExecutionContext, Interpreter};
pub use value::{Value, ValueKind};
