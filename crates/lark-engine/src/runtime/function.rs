//! Callable values and activation records.

use std::fmt;

use super::value::Value;
use crate::gc::Heap;

/// A compiled function: where its code starts and what it expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    /// The function name
    pub name: String,
    /// Entry address in the instruction stream
    pub address: usize,
    /// The parameter names
    pub params: Vec<String>,
}

impl FunctionRef {
    /// Creates a new function reference.
    pub fn new(name: impl Into<String>, address: usize, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            address,
            params,
        }
    }

    /// Returns the arity (number of parameters).
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A native (Rust) function.
///
/// Arguments arrive in source order. Natives never fail: a wrong argument
/// count or type yields a neutral value.
pub type NativeFunction = fn(&mut Heap, &[Value]) -> Value;

/// A builtin function table entry.
#[derive(Clone, Copy)]
pub struct Builtin {
    /// The function name
    pub name: &'static str,
    /// The native function pointer
    pub func: NativeFunction,
}

impl Builtin {
    /// Invokes the builtin.
    #[inline]
    pub fn call(&self, heap: &mut Heap, args: &[Value]) -> Value {
        (self.func)(heap, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// An activation record on the VM call stack.
#[derive(Debug, Clone, Default)]
pub struct StackFrame {
    /// Local variable slots, parameters first
    pub locals: Vec<Value>,
    /// Operand stack
    pub stack: Vec<Value>,
    /// Instruction pointer
    pub ip: usize,
}

impl StackFrame {
    /// Creates a frame that starts executing at `ip`.
    pub fn new(ip: usize, locals: Vec<Value>) -> Self {
        Self {
            locals,
            stack: Vec::new(),
            ip,
        }
    }

    /// Iterates every value this frame keeps alive.
    pub fn roots(&self) -> impl Iterator<Item = &Value> {
        self.locals.iter().chain(self.stack.iter())
    }
}
