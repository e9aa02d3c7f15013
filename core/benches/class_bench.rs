use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use vsim_core::{
    class::{ClassBuilder, ClassDefinition},
    logic::LogicVector,
};

fn build_shape() -> Arc<ClassDefinition> {
    let decls = [
        ("id", "b64"),
        ("kind", "b8"),
        ("flags", "b16"),
        ("count", "b32"),
        ("scale", "r"),
        ("label", "S"),
        ("link", "o"),
    ];
    let mut builder = ClassBuilder::begin("bench_node", decls.len());
    for (idx, (name, tag)) in decls.iter().enumerate() {
        builder.declare(idx, *name, tag).unwrap();
    }
    Arc::new(builder.freeze().unwrap())
}

fn bench_instantiate(c: &mut Criterion) {
    let def = build_shape();
    c.bench_function("instantiate_and_drop", |b| {
        b.iter(|| {
            let inst = black_box(&def).instantiate();
            black_box(&inst);
        })
    });
}

fn bench_vec4_access(c: &mut Criterion) {
    let def = build_shape();
    let mut inst = def.instantiate();
    let value = LogicVector::from_words(&[0xdead_beef], 32);
    c.bench_function("vec4_set_get", |b| {
        b.iter(|| {
            inst.set_vec4(3, black_box(&value));
            black_box(inst.get_vec4(3));
        })
    });
}

fn bench_real_access(c: &mut Criterion) {
    let def = build_shape();
    let mut inst = def.instantiate();
    c.bench_function("real_set_get", |b| {
        b.iter(|| {
            inst.set_real(4, black_box(2.5));
            black_box(inst.get_real(4));
        })
    });
}

fn bench_str_access(c: &mut Criterion) {
    let def = build_shape();
    let mut inst = def.instantiate();
    c.bench_function("str_set_get", |b| {
        b.iter(|| {
            inst.set_str(5, black_box("net_42"));
            black_box(inst.get_str(5));
        })
    });
}

criterion_group!(
    benches,
    bench_instantiate,
    bench_vec4_access,
    bench_real_access,
    bench_str_access
);
criterion_main!(benches);
