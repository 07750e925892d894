//! The scenario script engine.
//!
//! Scripts are a fixed declarative surface, executed exactly once per
//! call with no host-eval involved:
//!
//! ```text
//! let bag = list()
//! bag.define([{red: 70, blue: 30}, {red: 30, blue: 70}])
//! bag.permute()
//! export left = bag.select(0) for betting
//! export right = bag.select(1)
//! schedule([(left, 1.0), ("right", 2.5)])
//! buckets(4)
//! ```
//!
//! The pipeline is `tokenize` → `parse` → evaluate. Script faults never
//! cross the engine boundary as panics: they are collected as
//! [`ScriptError`] entries and the partial [`ScriptOutput`] is returned
//! for diagnostics.

mod eval;
mod lexer;
mod parser;

pub use eval::{ScriptEngine, ScriptOutput};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{SackRef, ScheduledSample, Stmt, parse};

use core::fmt;
use serde::{Deserialize, Serialize};

/// Bucket count bounds accepted by `buckets(n)`.
pub const MIN_BUCKETS: i64 = 2;
pub const MAX_BUCKETS: i64 = 10;

/// A structured script fault. `line` is 1-based; 0 marks whole-script
/// validation failures that have no single source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptError {
    pub message: String,
    pub line: u32,
}

impl ScriptError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "script error: {}", self.message)
        } else {
            write!(f, "script error on line {}: {}", self.line, self.message)
        }
    }
}

impl std::error::Error for ScriptError {}
