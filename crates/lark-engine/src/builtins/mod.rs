//! Native functions available to every Lark program.
//!
//! Builtins receive their arguments in source order and never fail: a wrong
//! argument count or type yields `null` (`0` for `length`).
//!
//! | Name | Module |
//! |------|--------|
//! | `length`, `clock` | [`global`] |
//! | `push`, `pop` | [`array`] |
//! | `erase` | [`map`] |
//! | `sqrt` | [`math`] |

pub mod array;
pub mod global;
pub mod map;
pub mod math;

use rustc_hash::FxHashMap;

use crate::runtime::function::{Builtin, NativeFunction};
use crate::runtime::value::Value;

/// Builds the builtin table, keyed by the name programs call.
pub fn register_builtins() -> FxHashMap<String, Value> {
    let mut builtins = FxHashMap::default();

    register(&mut builtins, "length", global::length);
    register(&mut builtins, "clock", global::clock);
    register(&mut builtins, "push", array::push);
    register(&mut builtins, "pop", array::pop);
    register(&mut builtins, "erase", map::erase);
    register(&mut builtins, "sqrt", math::sqrt);

    builtins
}

fn register(builtins: &mut FxHashMap<String, Value>, name: &'static str, func: NativeFunction) {
    builtins.insert(name.to_string(), make_native(name, func));
}

/// Create a native function value.
pub fn make_native(name: &'static str, func: NativeFunction) -> Value {
    Value::Builtin(Builtin { name, func })
}
