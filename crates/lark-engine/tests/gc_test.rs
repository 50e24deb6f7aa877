//! Integration tests for garbage collection.
//!
//! The collector runs on every function return, with all frames and all
//! globals as roots.

mod common;

use common::{Value, new_engine};

#[test]
fn test_local_array_reclaimed_after_return() {
    let (mut engine, _) = new_engine();
    engine
        .run("function scratch() { var a = [1, 2, 3]; } function main() { scratch(); }")
        .unwrap();

    let stats = engine.heap_stats();
    assert_eq!(stats.total_allocations, 1);
    assert_eq!(stats.live_objects, 0);
    assert_eq!(stats.reclaimed, 1);
}

#[test]
fn test_returned_array_stored_in_global_survives() {
    let (mut engine, buffer) = new_engine();
    engine
        .run(
            "function make() { return [1, 2, 3]; } \
             function churn() { var junk = [0]; var more = {'k': [1]}; } \
             function main() { kept = make(); \
               for i = 0, i < 50, i = i + 1 churn(); \
               print kept; }",
        )
        .unwrap();

    assert_eq!(buffer.contents(), "[ 1 2 3 ]");
    let stats = engine.heap_stats();
    assert_eq!(stats.live_objects, 1);
    assert_eq!(stats.reclaimed, 150);
}

#[test]
fn test_global_survives_later_runs() {
    let (mut engine, buffer) = new_engine();
    engine
        .run("function main() { kept = {'list': [1, 2]}; }")
        .unwrap();
    for _ in 0..5 {
        engine
            .run("function waste() { return [9]; } function main() { waste(); }")
            .unwrap();
    }
    engine.run("function main() { print kept; }").unwrap();

    assert_eq!(buffer.contents(), "{ list:[ 1 2 ] }");
    assert_eq!(engine.heap_stats().live_objects, 2);
}

#[test]
fn test_objects_held_by_callers_survive() {
    let (mut engine, buffer) = new_engine();
    engine
        .run(
            "function inner() { var t = [0]; } \
             function main() { var mine = [1, 2]; inner(); inner(); print mine; }",
        )
        .unwrap();

    assert_eq!(buffer.contents(), "[ 1 2 ]");
}

#[test]
fn test_pending_operands_survive_collection() {
    // Print arguments are evaluated last first, so `[1]` sits on main's
    // operand stack while `make` runs and collects.
    let (mut engine, buffer) = new_engine();
    engine
        .run(
            "function make() { var junk = [0]; return [2]; } \
             function main() { print make(), [1]; }",
        )
        .unwrap();

    assert_eq!(buffer.contents(), "[ 2 ][ 1 ]");
}

#[test]
fn test_unreachable_cycle_is_reclaimed() {
    let (mut engine, _) = new_engine();
    engine
        .run(
            "function cycle() { var a = []; var b = [a]; push(a, b); } \
             function main() { cycle(); }",
        )
        .unwrap();

    let stats = engine.heap_stats();
    assert_eq!(stats.total_allocations, 2);
    assert_eq!(stats.live_objects, 0);
}

#[test]
fn test_reachable_cycle_is_kept() {
    let (mut engine, _) = new_engine();
    engine
        .run(
            "function cycle() { var a = []; var b = [a]; push(a, b); loop = a; } \
             function main() { cycle(); }",
        )
        .unwrap();

    assert_eq!(engine.heap_stats().live_objects, 2);
    assert!(matches!(engine.vm().global("loop"), Some(Value::Array(_))));
}

#[test]
fn test_map_values_are_traced() {
    let (mut engine, buffer) = new_engine();
    engine
        .run(
            "function build() { return {'inner': [1, {'deep': [2]}]}; } \
             function main() { root = build(); build(); print root; }",
        )
        .unwrap();

    assert_eq!(buffer.contents(), "{ inner:[ 1 { deep:[ 2 ] } ] }");
    assert_eq!(engine.heap_stats().live_objects, 4);
}

#[test]
fn test_collection_runs_once_per_return() {
    let (mut engine, _) = new_engine();
    engine
        .run("function f() { } function main() { f(); f(); f(); }")
        .unwrap();

    // three calls to f plus main itself
    assert_eq!(engine.heap_stats().collections, 4);
}
