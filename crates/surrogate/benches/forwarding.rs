use criterion::{Bencher, Criterion, black_box, criterion_group, criterion_main};
use surrogate::{ArgValues, Specialization, Value, masking_proxy, ops, proxy};

/// Benchmarks `target + 1` after checking it produces `expected`.
fn run_add(bench: &mut Bencher, target: &Value, expected: i64) {
    let one = Value::int(1);
    let r = ops::add(target, &one).unwrap();
    assert_eq!(r.as_int(), Some(expected));

    bench.iter(|| {
        let r = ops::add(black_box(target), &one).unwrap();
        black_box(r);
    });
}

fn run_getattr(bench: &mut Bencher, target: &Value) {
    assert!(ops::hasattr(target, "upper").unwrap());
    bench.iter(|| black_box(ops::getattr(black_box(target), "upper").unwrap()));
}

/// Forwarding overhead against the plain object, the base proxy and a specialization.
fn criterion_benchmark(c: &mut Criterion) {
    let plain = Value::int(41);
    let proxied = proxy(plain.clone());
    let noop = Specialization::builder("noop")
        .method("__add__", |receiver, args| receiver.super_call("__add__", args))
        .build();
    let specialized = noop.bind(plain.clone(), ArgValues::Empty).unwrap();

    c.bench_function("add__plain", |b| run_add(b, &plain, 42));
    c.bench_function("add__proxy", |b| run_add(b, &proxied, 42));
    c.bench_function("add__specialized", |b| run_add(b, &specialized, 42));

    let text = Value::str("abc");
    let masked = masking_proxy(text.clone(), ["password"]).unwrap();
    c.bench_function("getattr__plain", |b| run_getattr(b, &text));
    c.bench_function("getattr__proxy", |b| run_getattr(b, &proxy(text.clone())));
    c.bench_function("getattr__masking", |b| run_getattr(b, &masked));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
