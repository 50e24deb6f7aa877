//! Benchmarks for compiling and running Lark programs.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lark_engine::{Engine, compile};

const FIB: &str = "
function fib(n) {
    if n < 2 return n;
    return fib(n - 1) + fib(n - 2);
}
function main() { fib(20); }
";

const ALLOCATE: &str = "
function fill(n) {
    var items = [];
    for i = 0, i < n, i = i + 1 {
        push(items, {'index': i, 'square': i * i});
    }
    return length(items);
}
function main() {
    for round = 0, round < 20, round = round + 1 fill(100);
}
";

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_fib", |b| b.iter(|| compile(black_box(FIB))));
}

fn bench_execute(c: &mut Criterion) {
    let fib = compile(FIB).expect("benchmark program should compile");
    let allocate = compile(ALLOCATE).expect("benchmark program should compile");
    let mut engine = Engine::with_output(Box::new(std::io::sink()));

    c.bench_function("execute_fib_20", |b| {
        b.iter(|| engine.execute(black_box(&fib)))
    });
    c.bench_function("execute_allocate_and_collect", |b| {
        b.iter(|| engine.execute(black_box(&allocate)))
    });
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);
