//! Array builtins.

use crate::gc::Heap;
use crate::runtime::value::Value;

/// `push(array, value)` appends and returns the same array.
pub fn push(heap: &mut Heap, args: &[Value]) -> Value {
    let [array @ Value::Array(handle), value] = args else {
        return Value::Null;
    };
    match heap.array_mut(*handle) {
        Some(elements) => {
            elements.push(value.clone());
            array.clone()
        }
        None => Value::Null,
    }
}

/// `pop(array)` removes and returns the last element.
pub fn pop(heap: &mut Heap, args: &[Value]) -> Value {
    let [Value::Array(handle)] = args else {
        return Value::Null;
    };
    heap.array_mut(*handle)
        .and_then(Vec::pop)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_returns_same_array() {
        let mut heap = Heap::new();
        let array = heap.alloc_array(vec![Value::Number(1.0)]);

        let result = push(&mut heap, &[array.clone(), Value::Number(2.0)]);
        assert_eq!(result, array);

        let handle = array.heap_ref().unwrap();
        assert_eq!(heap.array(handle).unwrap().len(), 2);
        assert_eq!(heap.stats().total_allocations, 1);
    }

    #[test]
    fn test_push_wrong_arguments() {
        let mut heap = Heap::new();
        let array = heap.alloc_array(Vec::new());

        assert_eq!(push(&mut heap, &[array.clone()]), Value::Null);
        assert_eq!(push(&mut heap, &[Value::Number(1.0), Value::Number(2.0)]), Value::Null);
        assert_eq!(push(&mut heap, &[array, Value::Null, Value::Null]), Value::Null);
    }

    #[test]
    fn test_pop() {
        let mut heap = Heap::new();
        let array = heap.alloc_array(vec![Value::Number(1.0), Value::from("last")]);

        assert_eq!(pop(&mut heap, &[array.clone()]), Value::from("last"));
        assert_eq!(pop(&mut heap, &[array.clone()]), Value::Number(1.0));
        assert_eq!(pop(&mut heap, &[array]), Value::Null);
        assert_eq!(pop(&mut heap, &[Value::Null]), Value::Null);
        assert_eq!(pop(&mut heap, &[]), Value::Null);
    }
}
