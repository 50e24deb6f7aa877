//! Runtime data model: values, callables and call frames.

pub mod function;
pub mod value;

pub use function::{Builtin, FunctionRef, NativeFunction, StackFrame};
pub use value::{Printable, Value};
