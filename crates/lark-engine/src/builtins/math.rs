//! Math builtins.

use crate::gc::Heap;
use crate::runtime::value::Value;

/// `sqrt(x)` - Returns the square root of x.
pub fn sqrt(_heap: &mut Heap, args: &[Value]) -> Value {
    match args {
        [Value::Number(x)] => Value::Number(x.sqrt()),
        _ => Value::Null,
    }
}
