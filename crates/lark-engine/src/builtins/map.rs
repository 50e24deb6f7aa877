//! Map builtins.

use crate::gc::Heap;
use crate::runtime::value::Value;

/// `erase(map, key)` removes the entry and returns its value.
pub fn erase(heap: &mut Heap, args: &[Value]) -> Value {
    let [Value::Map(handle), Value::String(key)] = args else {
        return Value::Null;
    };
    heap.map_mut(*handle)
        .and_then(|entries| entries.remove(key))
        .unwrap_or_default()
}
