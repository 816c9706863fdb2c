// ABOUTME: Runtime value types produced and consumed by the evaluator

use crate::ast::FuncDecl;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A user-defined function or inline method, closed over the environment
/// snapshot that existed at its declaration.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub decl: Arc<FuncDecl>,
    pub captured_env: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<Value>),
    /// Insertion-ordered, uniquely-keyed field map. Method entries hold
    /// `Function` values; data entries hold everything else.
    Record(IndexMap<String, Value>),
    Function(Arc<FunctionValue>),
    /// The environment snapshot resulting from interpreting a `use`-loaded
    /// file, keyed by the top-level names it bound.
    Module(Arc<IndexMap<String, Value>>),
    /// The descriptor bound under a `newtype`'s own name; carries no state
    /// beyond identifying the type, since the shape itself lives in the
    /// type registry.
    Type(String),
    Nil,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "num",
            Value::Float(_) => "fl",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::List(_) => "li",
            Value::Record(_) => "record",
            Value::Function(_) => "function",
            Value::Module(_) => "module",
            Value::Type(_) => "type",
            Value::Nil => "nil",
        }
    }

    /// Truthiness used by `if`/`while`/`and`/`or`/`not` and by `bool`
    /// coercion: zero, empty, and `Nil` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Record(_) | Value::Function(_) | Value::Module(_) | Value::Type(_) => true,
            Value::Nil => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "<function {}>", func.decl.name),
            Value::Module(_) => write!(f, "<module>"),
            Value::Type(name) => write!(f, "<type {}>", name),
            Value::Nil => write!(f, "nil"),
        }
    }
}
