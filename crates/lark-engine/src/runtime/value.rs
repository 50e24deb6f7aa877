//! Runtime value representation.

use std::fmt;
use std::sync::Arc;

use super::function::{Builtin, FunctionRef};
use crate::gc::{GcRef, Heap};

/// A Lark value.
///
/// Arrays and maps are reference types: the value holds a heap handle and
/// copies of it share the underlying object.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// null
    #[default]
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Array reference
    Array(GcRef),
    /// Map reference
    Map(GcRef),
    /// Compiled function reference
    Function(Arc<FunctionRef>),
    /// Builtin function reference
    Builtin(Builtin),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true only for the boolean `true`. No other value is truthy.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    /// Returns true only for the boolean `false`.
    pub fn is_false(&self) -> bool {
        matches!(self, Value::Boolean(false))
    }

    /// Returns the number, if this is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the heap handle for arrays and maps.
    pub fn heap_ref(&self) -> Option<GcRef> {
        match self {
            Value::Array(handle) | Value::Map(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    /// Pairs the value with a heap so composites can be printed.
    pub fn display<'a>(&'a self, heap: &'a Heap) -> Printable<'a> {
        Printable { value: self, heap }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// A value ready for printing.
///
/// Formats exactly what the `print` statement writes:
///
/// | Value | Output |
/// |-------|--------|
/// | null | `null` |
/// | boolean | `true` / `false` |
/// | number | `5`, `0.5`, `-2.25` |
/// | string | raw contents |
/// | array | `[ 1 2 3 ]` |
/// | map | `{ a:1 b:2 }` in key order |
/// | function | `<function name>` |
///
/// A container reached again while it is being printed is shown as `...`.
pub struct Printable<'a> {
    value: &'a Value,
    heap: &'a Heap,
}

impl Printable<'_> {
    fn write(&self, f: &mut fmt::Formatter<'_>, value: &Value, open: &mut Vec<GcRef>) -> fmt::Result {
        match value {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
            Value::Array(handle) => {
                if open.contains(handle) {
                    return f.write_str("...");
                }
                let Some(elements) = self.heap.array(*handle) else {
                    return f.write_str("null");
                };
                open.push(*handle);
                f.write_str("[ ")?;
                for element in elements {
                    self.write(f, element, open)?;
                    f.write_str(" ")?;
                }
                open.pop();
                f.write_str("]")
            }
            Value::Map(handle) => {
                if open.contains(handle) {
                    return f.write_str("...");
                }
                let Some(entries) = self.heap.map(*handle) else {
                    return f.write_str("null");
                };
                open.push(*handle);
                f.write_str("{ ")?;
                for (key, entry) in entries {
                    write!(f, "{}:", key)?;
                    self.write(f, entry, open)?;
                    f.write_str(" ")?;
                }
                open.pop();
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for Printable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.value, &mut Vec::new())
    }
}
