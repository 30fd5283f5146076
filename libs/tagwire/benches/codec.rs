#![allow(unused_crate_dependencies)]
use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use tagwire::{Codec, SchemaTree, Value};

fn bench_codec(c: &mut Criterion) {
    let codec = create_codec();
    let value = create_value(64);
    let buf = codec.encode("room.sync", &value).expect("value is valid");

    c.bench_function("encode_room", |b| {
        b.iter(|| codec.encode(black_box("room.sync"), black_box(&value)))
    });

    c.bench_function("decode_room", |b| {
        b.iter(|| codec.decode(black_box("room.sync"), black_box(&buf)))
    });

    c.bench_function("encode_str_room", |b| {
        b.iter(|| codec.encode_str(black_box("room.sync"), black_box(&value)))
    });
}

fn bench_compile(c: &mut Criterion) {
    let schema = create_schema();
    c.bench_function("compile_schema", |b| {
        b.iter(|| SchemaTree::compile(black_box(&schema)))
    });
}

fn create_schema() -> Value {
    json!({
        "message Vec2": {
            "required float x": 1,
            "required float y": 2,
        },
        "room.sync": {
            "message Member": {
                "required uInt64 uid": 1,
                "required string name": 2,
                "required Vec2 pos": 3,
                "repeated sInt32 stats": 4,
            },
            "required uInt32 roomId": 1,
            "repeated Member members": 2,
            "optional double time": 3,
        },
    })
}

fn create_value(members: u64) -> Value {
    let members: Vec<_> = (0..members)
        .map(|i| {
            json!({
                "uid": 1_000_000 + i,
                "name": format!("member #{i}"),
                "pos": { "x": 1.5, "y": -20.25 },
                "stats": [10, -3, 400, 0, 7],
            })
        })
        .collect();

    json!({
        "roomId": 42,
        "members": members,
        "time": 1234.5,
    })
}

fn create_codec() -> Codec {
    let tree = Arc::new(SchemaTree::compile(&create_schema()));
    Codec::new(Arc::clone(&tree), tree)
}

criterion_group!(benches, bench_codec, bench_compile);
criterion_main!(benches);
