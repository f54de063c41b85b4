//! Property-based tests for settle: the visible part always lands, the
//! protected part never does.

use carnaval_mask::{Cover, Mask};
use carnaval_model::Catalog;
use carnaval_types::{Record, Value};
use proptest::prelude::*;
use serde_json::json;

fn catalog() -> Catalog {
    Catalog::builder()
        .from_json(&json!({
            "Thing": { "name": "string", "size": "number", "physical": "boolean", "tags": ["string"] }
        }))
        .unwrap()
        .build()
        .unwrap()
}

fn thing_strategy() -> impl Strategy<Value = Record> {
    (
        prop::option::of("[a-z]{0,8}"),
        prop::option::of(-1000i64..1000),
        prop::option::of(any::<bool>()),
        prop::option::of(prop::collection::vec("[a-z]{1,4}", 0..4)),
    )
        .prop_map(|(name, size, physical, tags)| {
            let mut thing = Record::new("Thing");
            if let Some(name) = name {
                thing.insert("name", name);
            }
            if let Some(size) = size {
                thing.insert("size", size);
            }
            if let Some(physical) = physical {
                thing.insert("physical", physical);
            }
            if let Some(tags) = tags {
                thing.insert("tags", tags.into_iter().map(Value::from).collect::<Vec<_>>());
            }
            thing
        })
}

proptest! {
    #[test]
    fn open_mask_copies_the_source(
        destination in thing_strategy(),
        source in thing_strategy(),
    ) {
        let mask = Mask::cover(&catalog(), "Thing").unwrap().except(Cover::default()).unwrap();
        let mut settled = destination.clone();
        let touched = mask.settle(&mut settled, &source);

        prop_assert!(touched.is_empty());
        for key in ["name", "size", "physical"] {
            prop_assert_eq!(settled.get(key), source.get(key));
        }
    }

    #[test]
    fn closed_mask_never_writes(
        destination in thing_strategy(),
        source in thing_strategy(),
    ) {
        let mask = Mask::cover(&catalog(), "Thing").unwrap();
        let mut settled = destination.clone();
        let touched = mask.settle(&mut settled, &source);

        for key in ["name", "size", "physical"] {
            prop_assert_eq!(settled.get(key), destination.get(key));
            let differs = destination.get(key) != source.get(key);
            prop_assert_eq!(touched.get(key).is_some(), differs);
        }
    }

    #[test]
    fn settling_twice_reports_nothing_new(
        destination in thing_strategy(),
        source in thing_strategy(),
    ) {
        let mask = Mask::cover(&catalog(), "Thing")
            .unwrap()
            .with(Cover::fields([("name", true), ("tags", true)]))
            .unwrap();
        let mut settled = destination.clone();
        let first = mask.settle(&mut settled, &source);
        let snapshot = settled.clone();
        let second = mask.settle(&mut settled, &source);

        prop_assert_eq!(first, second);
        prop_assert_eq!(settled, snapshot);
    }
}
