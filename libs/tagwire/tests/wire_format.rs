#![allow(unused_crate_dependencies)]
use std::sync::Arc;
use std::thread;

use serde_json::json;
use tagwire::schema::DropReason;
use tagwire::{Codec, Decoder, Encoder, SchemaTree, Value, de, varint};

fn foo_schema() -> Value {
    json!({
        "Foo": {
            "required uInt32 id": 1,
            "optional string name": 2,
        }
    })
}

fn foo_codec() -> Codec {
    let tree = Arc::new(SchemaTree::compile(&foo_schema()));
    Codec::new(Arc::clone(&tree), tree)
}

#[test]
fn scenario_foo() {
    let codec = foo_codec();
    let value = json!({ "id": 5, "name": "ok" });

    let buf = codec.encode("Foo", &value).expect("value is valid");
    assert_eq!(buf.as_ref(), [0x08, 0x05, 0x12, 0x02, 0x6F, 0x6B]);

    let rev = codec.decode("Foo", &buf).expect("valid message");
    assert_eq!(rev, Some(value));
}

#[test]
fn scenario_zig_zag() {
    assert_eq!(varint::encode_signed(-5), [0x09]);
    assert_eq!(varint::decode_signed(&[0x09]).expect("valid varint"), -5);
}

#[test]
fn scenario_packed() {
    let tree = Arc::new(SchemaTree::compile(&json!({
        "List": { "repeated uInt32 ids": 1 }
    })));
    let codec = Codec::new(Arc::clone(&tree), tree);
    let value = json!({ "ids": [1, 2, 3] });

    let buf = codec.encode("List", &value).expect("value is valid");
    assert_eq!(buf.as_ref(), [0x08, 0x03, 0x01, 0x02, 0x03]);
    assert_eq!(codec.decode("List", &buf).expect("valid message"), Some(value));
}

#[test]
fn varint_idempotence() {
    let values = [
        0,
        1,
        127,
        128,
        300,
        16_383,
        16_384,
        u64::from(u32::MAX),
        1 << 53,
        u64::MAX - 1,
        u64::MAX,
    ];

    for n in values {
        let buf = varint::encode_unsigned(n);
        assert_eq!(varint::decode_unsigned(&buf).expect("valid varint"), n);
    }
}

#[test]
fn zig_zag_correctness() {
    let values = [0, 1, -1, 2, -2, 63, -64, 64, -65, i64::from(i32::MIN), i64::MAX, i64::MIN];

    for n in values {
        let buf = varint::encode_signed(n);
        assert_eq!(varint::decode_signed(&buf).expect("valid varint"), n);

        let unsigned = varint::decode_unsigned(&buf).expect("valid varint");
        assert_eq!(unsigned & 1 == 1, n < 0, "low bit must carry the sign of {n}");
    }
}

#[test]
fn required_field_enforced() {
    let codec = foo_codec();
    assert_eq!(codec.encode("Foo", &json!({ "name": "ok" })), None);
    assert_eq!(codec.encode("Foo", &json!({ "id": null })), None);
}

#[test]
fn null_is_never_absent() {
    let encoder = Encoder::new(Arc::new(SchemaTree::compile(&json!({
        "Outer": {
            "message Inner": { "optional uInt32 v": 1 },
            "required uInt32 id": 1,
            "repeated uInt32 ids": 2,
            "optional Inner inner": 3,
        }
    }))));

    for value in [
        json!({ "id": 1 }),
        json!({ "id": 1, "ids": null }),
        json!({ "id": 1, "ids": [], "inner": null }),
    ] {
        assert_eq!(encoder.encode("Outer", &value), None, "{value}");
    }

    let buf = encoder
        .encode("Outer", &json!({ "id": 1, "ids": [] }))
        .expect("value is valid");
    assert_eq!(buf.as_ref(), [0x08, 0x01]);
}

#[test]
fn repeated_array_enforced() {
    let encoder = Encoder::new(Arc::new(SchemaTree::compile(&json!({
        "List": { "repeated string tags": 1 }
    }))));

    assert_eq!(encoder.encode("List", &json!({ "tags": "a" })), None);
    assert_eq!(encoder.encode("List", &json!({})), None);
    assert!(encoder.encode("List", &json!({ "tags": ["a"] })).is_some());
}

#[test]
fn tag_uniqueness() {
    let (tree, report) = SchemaTree::compile_with_report(&json!({
        "Foo": {
            "required uInt32 first": 1,
            "optional string second": 1,
        }
    }));

    let foo = tree.get("Foo").expect("route exists");
    assert!(foo.field("first").is_some());
    assert!(foo.field("second").is_none());

    let dropped: Vec<_> = report.iter().collect();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].key, "optional string second");
    assert_eq!(
        dropped[0].reason,
        DropReason::DuplicateTag {
            existing: "first".to_owned()
        }
    );
}

#[test]
fn unknown_fields_are_skipped() {
    // a newer schema that added fields in between
    let newer = json!({
        "Foo": {
            "required uInt32 id": 1,
            "optional double ratio": 3,
            "optional string note": 4,
            "repeated uInt32 extra": 5,
            "optional string name": 2,
        }
    });

    let codec = Codec::from_schemas(&newer, &foo_schema());
    let value = json!({ "id": 5, "ratio": 0.5, "note": "skip me", "extra": [], "name": "ok" });

    let buf = codec.encode("Foo", &value).expect("value is valid");
    let rev = codec.decode("Foo", &buf).expect("valid message");
    assert_eq!(rev, Some(json!({ "id": 5, "name": "ok" })));
}

#[test]
fn unknown_packed_field_is_not_misread() {
    let newer = json!({
        "Foo": {
            "required uInt32 id": 1,
            "repeated uInt32 extra": 5,
        }
    });

    let codec = Codec::from_schemas(&newer, &foo_schema());
    let buf = codec
        .encode("Foo", &json!({ "id": 7, "extra": [8, 99] }))
        .expect("value is valid");
    assert_eq!(buf.as_ref(), [0x08, 0x07, 0x28, 0x02, 0x08, 0x63]);

    // skipping only the count would read the elements as `id: 99`
    let res = codec.decode("Foo", &buf);
    assert!(
        matches!(res, Err(de::Error::UnknownVarintField { field_number: 5 })),
        "{res:?}"
    );
}

#[test]
fn truncated_payloads_fail() {
    let codec = foo_codec();
    let buf = codec
        .encode("Foo", &json!({ "id": 300, "name": "truncated" }))
        .expect("value is valid");

    for len in 1..buf.len() {
        if len == 3 {
            // ends right after the id field, which is a valid message
            continue;
        }

        let res = codec.decode("Foo", &buf[..len]);
        assert!(
            matches!(res, Err(de::Error::UnexpectedEof)),
            "prefix of {len} bytes: {res:?}"
        );
    }
}

#[test]
fn shared_between_threads() {
    let tree = Arc::new(SchemaTree::compile(&foo_schema()));
    let encoder = Arc::new(Encoder::new(Arc::clone(&tree)));
    let decoder = Arc::new(Decoder::new(tree));

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let encoder = Arc::clone(&encoder);
            let decoder = Arc::clone(&decoder);
            thread::spawn(move || {
                for i in 0..100u32 {
                    let value = json!({ "id": t * 1000 + i, "name": format!("t{t}") });
                    let buf = encoder.encode("Foo", &value).expect("value is valid");
                    let rev = decoder.decode("Foo", &buf).expect("valid message");
                    assert_eq!(rev, Some(value));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread must not panic");
    }
}
