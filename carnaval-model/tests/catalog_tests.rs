use carnaval_model::{Catalog, Descriptor, Domain, DomainType, ModelError, Props};
use carnaval_types::{Map, Record, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

struct Thing;

impl Domain for Thing {
    const NAME: &'static str = "Thing";

    fn props() -> Props {
        Props::new()
            .field("name", Descriptor::string())
            .field("size", Descriptor::number())
            .field("physical", Descriptor::boolean())
    }
}

struct Crate;

impl Domain for Crate {
    const NAME: &'static str = "Box";

    fn props() -> Props {
        Props::new()
            .field("name", Descriptor::string())
            .field("thing", Descriptor::reference("Thing"))
            .field("things", Descriptor::array_of(Descriptor::reference("Thing")))
            .field(
                "meta",
                Descriptor::literal(Props::new().field("label", Descriptor::string())),
            )
            .field("inner", Descriptor::reference("Box"))
    }
}

fn catalog() -> Catalog {
    Catalog::builder()
        .register_domain::<Thing>()
        .register_domain::<Crate>()
        .build()
        .unwrap()
}

fn map(json: serde_json::Value) -> Map {
    match Value::from(json) {
        Value::Object(map) => map,
        other => panic!("expected object, got {other:?}"),
    }
}

// ── Building ─────────────────────────────────────────────────────

#[test]
fn build_registers_types() {
    let catalog = catalog();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.contains("Thing"));
    assert!(catalog.contains("Box"));
    assert_eq!(catalog.props_of("Thing").unwrap().len(), 3);
    let names: Vec<_> = catalog.type_names().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["Box", "Thing"]);
}

#[test]
fn duplicate_type_is_rejected() {
    let err = Catalog::builder()
        .register_domain::<Thing>()
        .register_domain::<Thing>()
        .build()
        .unwrap_err();
    assert_eq!(err, ModelError::DuplicateType("Thing".into()));
}

#[test]
fn dangling_reference_is_rejected() {
    let err = Catalog::builder()
        .declare(
            "Cart",
            Props::new().field(
                "gifts",
                Descriptor::array_of(Descriptor::literal(
                    Props::new().field("item", Descriptor::reference("Gift")),
                )),
            ),
        )
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::DanglingReference {
            owner: "Cart".into(),
            property: "gifts[0].item".into(),
            target: "Gift".into(),
        }
    );
}

#[test]
fn self_reference_is_allowed() {
    let catalog = Catalog::builder()
        .declare("Node", Props::new().field("next", Descriptor::reference("Node")))
        .build()
        .unwrap();
    assert!(catalog.contains("Node"));
}

#[test]
fn unknown_type_lookup_fails() {
    let err = catalog().props_of("Nope").unwrap_err();
    assert_eq!(err, ModelError::UnknownType("Nope".into()));
}

#[test]
fn catalog_from_json_document() {
    let catalog = Catalog::builder()
        .from_json(&json!({
            "Thing": { "name": "string" },
            "Box": { "thing": "Thing", "things": ["Thing"] }
        }))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        catalog.props_of("Box").unwrap().get("things"),
        Some(&Descriptor::array_of(Descriptor::reference("Thing")))
    );
}

#[test]
fn json_declaration_errors_are_prefixed_with_type() {
    let err = Catalog::builder()
        .from_json(&json!({ "Thing": { "name": 1 } }))
        .unwrap_err();
    assert!(matches!(
        err,
        ModelError::InvalidDeclaration { ref path, .. } if path == "Thing.name"
    ));
}

#[test]
fn clones_share_declarations() {
    let catalog = catalog();
    let clone = catalog.clone();
    assert_eq!(
        clone.get("Box").unwrap(),
        &DomainType::new("Box", Crate::props())
    );
}

// ── Instantiation ────────────────────────────────────────────────

#[test]
fn instantiate_keeps_declared_fields_only() {
    let record = catalog()
        .instantiate("Thing", map(json!({ "name": "Shoes", "size": 40, "color": "red" })))
        .unwrap();
    assert_eq!(
        record,
        Record::new("Thing").with("name", "Shoes").with("size", 40)
    );
}

#[test]
fn instantiate_builds_nested_records() {
    let record = catalog()
        .instantiate(
            "Box",
            map(json!({
                "thing": { "name": "Shoes" },
                "things": [{ "name": "Shirt" }, null],
                "inner": { "name": "small", "thing": { "size": 3 } }
            })),
        )
        .unwrap();

    assert_eq!(
        record.get("thing"),
        Some(&Value::from(Record::new("Thing").with("name", "Shoes")))
    );
    assert_eq!(
        record.get("things"),
        Some(&Value::Array(vec![
            Value::from(Record::new("Thing").with("name", "Shirt")),
            Value::Null,
        ]))
    );
    let inner = record.get("inner").and_then(Value::as_record).unwrap();
    assert!(inner.is_a("Box"));
    assert!(inner.get("thing").and_then(Value::as_record).unwrap().is_a("Thing"));
}

#[test]
fn instantiate_shapes_literals() {
    let record = catalog()
        .instantiate("Box", map(json!({ "meta": { "label": "fragile", "extra": 1 } })))
        .unwrap();
    assert_eq!(record.get("meta").unwrap().to_json(), json!({ "label": "fragile" }));
    assert!(matches!(record.get("meta"), Some(Value::Object(_))));
}

#[test]
fn non_array_under_array_property_is_dropped() {
    let record = catalog()
        .instantiate("Box", map(json!({ "things": { "name": "Shoes" } })))
        .unwrap();
    assert!(!record.contains_key("things"));
}

#[test]
fn null_stays_null() {
    let record = catalog()
        .instantiate("Box", map(json!({ "thing": null, "things": null })))
        .unwrap();
    assert_eq!(record.get("thing"), Some(&Value::Null));
    assert_eq!(record.get("things"), Some(&Value::Null));
}

#[test]
fn typed_record_of_same_type_is_kept() {
    let thing = Record::new("Thing").with("name", "Shoes").with("derived", true);
    let mut fields = Map::new();
    fields.insert("thing".into(), Value::from(thing.clone()));
    let record = catalog().instantiate("Box", fields).unwrap();
    assert_eq!(record.get("thing"), Some(&Value::from(thing)));
}

#[test]
fn instantiate_value_requires_object() {
    let err = catalog()
        .instantiate_value("Thing", Value::from("Shoes"))
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::NotAnObject {
            type_name: "Thing".into(),
            found: "string",
        }
    );
}

#[test]
fn assign_merges_into_existing_record() {
    let catalog = catalog();
    let mut record = Record::new("Thing").with("name", "Shoes").with("size", 40);
    catalog
        .assign(&mut record, map(json!({ "size": 42, "physical": true, "color": "red" })))
        .unwrap();
    assert_eq!(
        record,
        Record::new("Thing")
            .with("name", "Shoes")
            .with("size", 42)
            .with("physical", true)
    );
}
