//! Decode-time coercion, plus round-trip properties of primitive-only types.

use carnaval_codec::{normalize, Codec, Schema};
use carnaval_model::{Catalog, Kind};
use carnaval_types::{Record, Value};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

const JAN_9_2017: i64 = 1_483_916_400_000;

// ── Boolean ──────────────────────────────────────────────────────

#[test]
fn boolean_uses_truthiness() {
    for (input, expected) in [
        (json!(true), true),
        (json!(1), true),
        (json!("no"), true),
        (json!({}), true),
        (json!(false), false),
        (json!(0), false),
        (json!(""), false),
    ] {
        assert_eq!(
            normalize(Kind::Boolean, &Value::from(input.clone())),
            Value::Bool(expected),
            "{input}"
        );
    }
}

// ── String ───────────────────────────────────────────────────────

#[test]
fn string_renders_scalars() {
    assert_eq!(normalize(Kind::String, &Value::from(40)), Value::from("40"));
    assert_eq!(normalize(Kind::String, &Value::from(1.5)), Value::from("1.5"));
    assert_eq!(normalize(Kind::String, &Value::from(true)), Value::from("true"));
    assert_eq!(
        normalize(Kind::String, &Value::from_millis(JAN_9_2017)),
        Value::from("2017-01-08T23:00:00.000Z")
    );
}

#[test]
fn string_leaves_composites_alone() {
    let list = Value::from(json!([1, 2]));
    assert_eq!(normalize(Kind::String, &list), list);
}

// ── Number ───────────────────────────────────────────────────────

#[test]
fn number_parses_strings() {
    assert_eq!(normalize(Kind::Number, &Value::from(" 40 ")), Value::from(40));
    assert_eq!(normalize(Kind::Number, &Value::from("2.5")), Value::from(2.5));
    assert_eq!(normalize(Kind::Number, &Value::from("")), Value::from(0));
    assert_eq!(normalize(Kind::Number, &Value::from("  ")), Value::from(0));
}

#[test]
fn number_keeps_unparseable_strings() {
    assert_eq!(normalize(Kind::Number, &Value::from("forty")), Value::from("forty"));
    assert_eq!(normalize(Kind::Number, &Value::from("inf")), Value::from("inf"));
}

#[test]
fn number_converts_booleans_and_dates() {
    assert_eq!(normalize(Kind::Number, &Value::from(true)), Value::from(1));
    assert_eq!(normalize(Kind::Number, &Value::from(false)), Value::from(0));
    assert_eq!(
        normalize(Kind::Number, &Value::from_millis(JAN_9_2017)),
        Value::from(JAN_9_2017)
    );
}

// ── Date ─────────────────────────────────────────────────────────

#[test]
fn date_parses_rfc3339() {
    let expected = Value::Date(Utc.timestamp_millis_opt(JAN_9_2017).unwrap());
    assert_eq!(
        normalize(Kind::Date, &Value::from("2017-01-09T00:00:00+01:00")),
        expected
    );
    assert_eq!(normalize(Kind::Date, &Value::from(JAN_9_2017)), expected);
}

#[test]
fn date_keeps_unparseable_input() {
    assert_eq!(normalize(Kind::Date, &Value::from("soon")), Value::from("soon"));
    assert_eq!(normalize(Kind::Date, &Value::from(1.5)), Value::from(1.5));
    assert_eq!(normalize(Kind::Date, &Value::from(true)), Value::from(true));
}

// ── Null and object ──────────────────────────────────────────────

#[test]
fn null_stays_null_for_every_kind() {
    for kind in [Kind::Boolean, Kind::String, Kind::Number, Kind::Date, Kind::Object] {
        assert_eq!(normalize(kind, &Value::Null), Value::Null);
    }
}

#[test]
fn object_is_untouched() {
    let value = Value::from(json!({ "a": [1, "2"] }));
    assert_eq!(normalize(Kind::Object, &value), value);
}

// ── Properties ───────────────────────────────────────────────────

fn catalog() -> Catalog {
    Catalog::builder()
        .from_json(&json!({
            "Item": { "label": "string", "count": "number", "active": "boolean", "tags": ["string"] }
        }))
        .unwrap()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn primitive_records_survive_a_round_trip(
        label in "[a-zA-Z0-9 ]{0,24}",
        count in any::<i64>(),
        active in any::<bool>(),
        tags in prop::collection::vec("[a-z]{1,8}", 0..5),
    ) {
        let codec = Codec::new(Schema::for_type(&catalog(), "Item").unwrap());
        let item = Record::new("Item")
            .with("label", label)
            .with("count", count)
            .with("active", active)
            .with("tags", tags.into_iter().map(Value::from).collect::<Vec<_>>());

        let decoded = futures::executor::block_on(async {
            let json = codec.encode(item.clone()).await?;
            codec.decode(json).await
        })
        .unwrap();

        prop_assert_eq!(decoded, Value::from(item));
    }

    #[test]
    fn integer_strings_normalize_to_numbers(n in any::<i64>(), pad in 0usize..3) {
        let text = format!("{}{n}{}", " ".repeat(pad), " ".repeat(pad));
        prop_assert_eq!(normalize(Kind::Number, &Value::from(text)), Value::from(n));
    }
}
