use carnaval_codec::{Codec, CodecError, Middleware, Providers, Schema};
use carnaval_model::Catalog;
use carnaval_types::{Record, Value};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn catalog() -> Catalog {
    Catalog::builder()
        .from_json(&json!({
            "Thing": { "name": "string" },
            "Box": { "size": "number", "thing": "Thing" }
        }))
        .unwrap()
        .build()
        .unwrap()
}

fn with_field(value: &Value, key: &str, field: impl Into<Value>) -> Value {
    let mut value = value.clone();
    if let Some(map) = value.as_map_mut() {
        map.insert(key.to_string(), field.into());
    }
    value
}

fn name_of(value: &Value) -> String {
    value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ── Before / after ───────────────────────────────────────────────

#[tokio::test]
async fn decode_hooks_wrap_traversal() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .before_decode(Middleware::new(|json, _, _| {
            Ok(Some(with_field(json, "name", format!("2x {}", name_of(json)))))
        }))
        .after_decode(Middleware::new(|thing, _, _| {
            Ok(Some(with_field(thing, "formattedName", name_of(thing).to_lowercase())))
        }))
        .build()
        .unwrap();

    let thing = Codec::new(schema)
        .decode_json(json!({ "name": "Shoes" }))
        .await
        .unwrap();
    let thing = thing.as_record().unwrap();
    assert!(thing.is_a("Thing"));
    assert_eq!(thing.get("name").and_then(Value::as_str), Some("2x Shoes"));
    assert_eq!(
        thing.get("formattedName").and_then(Value::as_str),
        Some("2x shoes")
    );
}

#[tokio::test]
async fn encode_hooks_wrap_traversal() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .before_encode(Middleware::new(|thing, _, _| {
            Ok(Some(with_field(thing, "name", format!("2x {}", name_of(thing)))))
        }))
        .after_encode(Middleware::new(|json, _, _| {
            Ok(Some(with_field(json, "formattedName", name_of(json).to_lowercase())))
        }))
        .build()
        .unwrap();

    let json = Codec::new(schema)
        .encode_json(Record::new("Thing").with("name", "Shoes"))
        .await
        .unwrap();
    assert_eq!(json, json!({ "name": "2x Shoes", "formattedName": "2x shoes" }));
}

#[tokio::test]
async fn returning_none_keeps_the_value() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .after_decode(Middleware::new(|_, _, _| Ok(None)))
        .build()
        .unwrap();
    let thing = Codec::new(schema)
        .decode_json(json!({ "name": "Shoes" }))
        .await
        .unwrap();
    assert_eq!(thing, Value::from(Record::new("Thing").with("name", "Shoes")));
}

// ── Chains ───────────────────────────────────────────────────────

#[tokio::test]
async fn chain_runs_in_order_with_the_same_original() {
    let catalog = catalog();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&seen);
    let second = Arc::clone(&seen);

    let schema = Schema::builder(&catalog, "Thing")
        .before_decode(Middleware::new(move |current, original, _| {
            first.lock().unwrap().push((name_of(current), name_of(original)));
            Ok(Some(with_field(current, "name", "h1")))
        }))
        .before_decode(Middleware::new(move |current, original, _| {
            second.lock().unwrap().push((name_of(current), name_of(original)));
            Ok(Some(with_field(current, "name", "h2")))
        }))
        .build()
        .unwrap();

    let thing = Codec::new(schema)
        .decode_json(json!({ "name": "raw" }))
        .await
        .unwrap();

    assert_eq!(thing.get("name").and_then(Value::as_str), Some("h2"));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("raw".to_string(), "raw".to_string()),
            ("h1".to_string(), "raw".to_string()),
        ]
    );
}

#[tokio::test]
async fn after_hooks_see_the_pre_hook_input_as_original() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .before_decode(Middleware::new(|current, _, _| {
            Ok(Some(with_field(current, "name", "changed")))
        }))
        .after_decode(Middleware::new(|current, original, _| {
            Ok(Some(with_field(current, "name", name_of(original))))
        }))
        .build()
        .unwrap();
    let thing = Codec::new(schema)
        .decode_json(json!({ "name": "input" }))
        .await
        .unwrap();
    assert_eq!(thing.get("name").and_then(Value::as_str), Some("input"));
}

#[tokio::test]
async fn hooks_run_per_array_element() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .after_decode(Middleware::new(|current, original, _| {
            assert!(original.as_array().is_none());
            Ok(Some(with_field(current, "name", name_of(original).to_uppercase())))
        }))
        .build()
        .unwrap();
    let things = Codec::new(schema)
        .decode_json(json!([{ "name": "a" }, { "name": "b" }]))
        .await
        .unwrap();
    assert_eq!(things.to_json(), json!([{ "name": "A" }, { "name": "B" }]));
}

#[tokio::test]
async fn nested_schema_runs_its_own_hooks() {
    let catalog = catalog();
    let thing = Schema::builder(&catalog, "Thing")
        .after_encode(Middleware::new(|json, _, _| {
            Ok(Some(with_field(json, "nested", true)))
        }))
        .build()
        .unwrap();
    let schema = Schema::builder(&catalog, "Box")
        .map_property("thing", thing)
        .build()
        .unwrap();
    let boxed = Record::new("Box")
        .with("size", 1)
        .with("thing", Record::new("Thing").with("name", "Shoes"));
    let json = Codec::new(schema).encode_json(boxed).await.unwrap();
    assert_eq!(
        json,
        json!({ "size": 1, "thing": { "name": "Shoes", "nested": true } })
    );
}

#[tokio::test]
async fn async_hooks_are_awaited() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .after_decode(Middleware::from_async(|current, _, _| async move {
            tokio::task::yield_now().await;
            Ok(Some(with_field(&current, "checked", true)))
        }))
        .build()
        .unwrap();
    let thing = Codec::new(schema)
        .decode_json(json!({ "name": "Shoes" }))
        .await
        .unwrap();
    assert_eq!(thing.get("checked"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn failing_hook_rejects_the_call() {
    let catalog = catalog();
    let reached = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&reached);
    let schema = Schema::builder(&catalog, "Thing")
        .before_decode(Middleware::new(|_, _, _| {
            Err(CodecError::Validation("name is required".into()))
        }))
        .after_decode(Middleware::new(move |_, _, _| {
            *flag.lock().unwrap() = true;
            Ok(None)
        }))
        .build()
        .unwrap();
    let err = Codec::new(schema).decode_json(json!({})).await.unwrap_err();
    assert_eq!(err, CodecError::Validation("name is required".into()));
    assert!(!*reached.lock().unwrap());
}

// ── Providers ────────────────────────────────────────────────────

fn upper() -> Providers {
    Providers::new().with("toUpperCase", |value| {
        Ok(Value::from(value.as_str().unwrap_or_default().to_uppercase()))
    })
}

#[tokio::test]
async fn hooks_receive_providers() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .after_encode(Middleware::new(|json, _, providers| {
            let formatted = providers.call("toUpperCase", Value::from(name_of(json)))?;
            Ok(Some(with_field(json, "formattedName", formatted)))
        }))
        .build()
        .unwrap();
    let json = Codec::new(schema)
        .with_providers(upper())
        .encode_json(Record::new("Thing").with("name", "Shoes"))
        .await
        .unwrap();
    assert_eq!(json, json!({ "name": "Shoes", "formattedName": "SHOES" }));
}

#[tokio::test]
async fn per_call_providers_override_the_codec_providers() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .after_decode(Middleware::new(|current, _, providers| {
            let name = providers.call("toUpperCase", Value::from(name_of(current)))?;
            Ok(Some(with_field(current, "name", name)))
        }))
        .build()
        .unwrap();
    let codec = Codec::new(schema);

    let err = codec.decode_json(json!({ "name": "a" })).await.unwrap_err();
    assert_eq!(err, CodecError::UnknownProvider("toUpperCase".into()));

    let thing = codec
        .decode_with(Value::from(json!({ "name": "a" })), &upper())
        .await
        .unwrap();
    assert_eq!(thing.get("name").and_then(Value::as_str), Some("A"));
}

#[test]
fn providers_list_their_names() {
    let providers = upper().with("id", |value| Ok(value));
    assert!(providers.contains("id"));
    assert_eq!(providers.names().collect::<Vec<_>>(), vec!["id", "toUpperCase"]);
    assert!(Providers::new().is_empty());
}

// ── Tracing ──────────────────────────────────────────────────────

#[tokio::test]
async fn hooks_run_under_a_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("carnaval_codec=debug"))
        .with_test_writer()
        .try_init();

    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .after_decode(Middleware::new(|current, _, _| {
            tracing::info!(name = %name_of(current), "decoded");
            Ok(None)
        }))
        .build()
        .unwrap();
    let thing = Codec::new(schema)
        .decode_json(json!({ "name": "Shoes", "color": "red" }))
        .await
        .unwrap();
    assert_eq!(thing, Value::from(Record::new("Thing").with("name", "Shoes")));
}
