use carnaval_codec::{Codec, CodecError, Providers, Schema};
use carnaval_model::Catalog;
use carnaval_types::{Record, Value};
use carnaval_validator::{
    JsonSchemaValidator, RuleSet, RuleValidator, Rules, ValidationError, middleware,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn catalog() -> Catalog {
    Catalog::builder()
        .from_json(&json!({
            "Thing": { "name": "string" },
            "Gift": { "size": "string", "names": ["string"] }
        }))
        .unwrap()
        .build()
        .unwrap()
}

fn thing_codec(catalog: &Catalog) -> Codec {
    let validator = RuleValidator::new(catalog, "Thing", RuleSet::new().require("name")).unwrap();
    let schema = Schema::builder(catalog, "Thing")
        .after_decode(middleware(validator))
        .build()
        .unwrap();
    Codec::new(schema)
}

// ── Decode ───────────────────────────────────────────────────────

#[tokio::test]
async fn valid_input_decodes() {
    let catalog = catalog();
    let thing = thing_codec(&catalog)
        .decode_json(json!({ "name": "Shoes" }))
        .await
        .unwrap();
    let thing = thing.as_record().unwrap();
    assert!(thing.is_a("Thing"));
    assert_eq!(thing.get("name").and_then(Value::as_str), Some("Shoes"));
}

#[tokio::test]
async fn invalid_input_rejects_the_decode() {
    let catalog = catalog();
    let err = thing_codec(&catalog).decode_json(json!({})).await.unwrap_err();
    assert!(matches!(&err, CodecError::Validation(message) if message == "name is required"));
}

#[tokio::test]
async fn arrays_are_validated_per_element() {
    let catalog = catalog();
    let err = thing_codec(&catalog)
        .decode_json(json!([{ "name": "Shoes" }, { "name": "" }]))
        .await
        .unwrap_err();
    assert!(matches!(&err, CodecError::Validation(message) if message == "name is required"));
}

#[tokio::test]
async fn json_schema_validator_rejects_wrong_types() {
    let catalog = catalog();
    let rules = RuleSet::new().rule("names", Rules::new().max_items(2));
    let validator = JsonSchemaValidator::new(&catalog, "Gift", &rules).unwrap();
    let schema = Schema::builder(&catalog, "Gift")
        .normalize(false)
        .after_decode(middleware(validator))
        .build()
        .unwrap();
    let codec = Codec::new(schema);

    let err = codec
        .decode_json(json!({ "size": "Medium", "names": ["Shoes", 12] }))
        .await
        .unwrap_err();
    assert!(matches!(&err, CodecError::Validation(message) if message == "names[1] should be string"));

    let err = codec
        .decode_json(json!({ "names": ["Shoes", "Shirt", "Pants"] }))
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        CodecError::Validation(message) if message == "names should not have more than 2 items"
    ));

    assert!(codec.decode_json(json!({ "names": ["Shoes"] })).await.is_ok());
}

#[tokio::test]
async fn closures_validate_decoded_records() {
    let catalog = catalog();
    let schema = Schema::builder(&catalog, "Thing")
        .after_decode(middleware(|thing: &Record| {
            match thing.get("name").and_then(Value::as_str) {
                Some(name) if name.len() > 3 => Ok(()),
                _ => Err(ValidationError::Schema {
                    message: "name: too short".into(),
                }),
            }
        }))
        .build()
        .unwrap();
    let codec = Codec::new(schema);

    assert!(codec.decode_json(json!({ "name": "Shoes" })).await.is_ok());
    let err = codec.decode_json(json!({ "name": "Hat" })).await.unwrap_err();
    assert!(matches!(&err, CodecError::Validation(message) if message == "name: too short"));
}

// ── Hook contract ────────────────────────────────────────────────

#[tokio::test]
async fn valid_records_are_left_in_place() {
    let catalog = catalog();
    let validator = RuleValidator::new(&catalog, "Thing", RuleSet::new()).unwrap();
    let hook = middleware(validator);
    let thing = Value::Record(Record::new("Thing").with("name", "Shoes"));
    let result = hook.call(thing.clone(), &thing, &Providers::new()).await.unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn non_records_are_rejected() {
    let catalog = catalog();
    let validator = RuleValidator::new(&catalog, "Thing", RuleSet::new()).unwrap();
    let hook = middleware(validator);
    let err = hook
        .call(Value::from("Shoes"), &Value::Null, &Providers::new())
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        CodecError::Validation(message) if message == "expected a record, found string"
    ));
}
