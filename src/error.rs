// ABOUTME: Error types for lexing, parsing, and evaluation failures

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SstError>;

/// All fatal failures that can terminate an SST program, grouped by the
/// taxonomy the interpreter distinguishes internally. Every variant reduces
/// to a single human-readable line at the program boundary.
#[derive(Error, Debug, Clone)]
pub enum SstError {
    #[error("lex error: {0}")]
    Lex(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("undefined name: {0}")]
    UndefinedName(String),

    #[error("{receiver}: no such field or method '{member}'")]
    NoSuchMember { receiver: String, member: String },

    #[error("{op}: expected {expected}, got {actual}")]
    TypeError {
        op: String,
        expected: String,
        actual: String,
    },

    #[error("{function}: expected {expected} argument{}, got {actual}", if *expected == 1 { "" } else { "s" })]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("cannot read '{token}' as {target_type}")]
    Coercion { token: String, target_type: String },

    #[error("i/o error: {0}")]
    Io(String),

    #[error("{0}")]
    User(String),

    #[error("{0} escaped its enclosing loop or function call")]
    StrayControlFlow(&'static str),
}

impl SstError {
    pub fn lex(message: impl Into<String>) -> Self {
        SstError::Lex(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        SstError::Parse(message.into())
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        SstError::UndefinedName(name.into())
    }

    pub fn no_such_member(receiver: impl Into<String>, member: impl Into<String>) -> Self {
        SstError::NoSuchMember {
            receiver: receiver.into(),
            member: member.into(),
        }
    }

    pub fn type_error(
        op: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        SstError::TypeError {
            op: op.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn arity(function: impl Into<String>, expected: usize, actual: usize) -> Self {
        SstError::Arity {
            function: function.into(),
            expected,
            actual,
        }
    }

    pub fn coercion(token: impl Into<String>, target_type: impl Into<String>) -> Self {
        SstError::Coercion {
            token: token.into(),
            target_type: target_type.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        SstError::Io(message.into())
    }

    pub fn user(message: impl Into<String>) -> Self {
        SstError::User(message.into())
    }
}

/// Non-error unwinding: `return`/`break`/`continue`. Carried alongside
/// `Result` rather than folded into `SstError`, so control flow is never
/// mistaken for a fatal condition. A `Flow` value that reaches the top level
/// (escapes every enclosing loop and function call) is itself turned into a
/// `SstError::StrayControlFlow`.
#[derive(Debug, Clone)]
pub enum Flow {
    Return(crate::value::Value),
    Break,
    Continue,
}
