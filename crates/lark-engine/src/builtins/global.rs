//! Global builtins.

use std::sync::OnceLock;
use std::time::Instant;

use crate::gc::Heap;
use crate::runtime::value::Value;

static CLOCK_START: OnceLock<Instant> = OnceLock::new();

/// `length(x)` - Element count of an array or entry count of a map, else 0.
pub fn length(heap: &mut Heap, args: &[Value]) -> Value {
    let count = match args {
        [Value::Array(handle) | Value::Map(handle)] => {
            heap.get(*handle).map_or(0, |object| object.len())
        }
        _ => 0,
    };
    Value::Number(count as f64)
}

/// `clock()` - Milliseconds since the first call in this process.
pub fn clock(_heap: &mut Heap, args: &[Value]) -> Value {
    if !args.is_empty() {
        return Value::Null;
    }
    let start = CLOCK_START.get_or_init(Instant::now);
    Value::Number(start.elapsed().as_secs_f64() * 1000.0)
}
