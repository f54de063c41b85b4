use carnaval_codec::{Codec, Schema, Transform};
use carnaval_model::{Catalog, Kind};
use carnaval_types::Value;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn catalog() -> Catalog {
    Catalog::builder()
        .from_json(&json!({
            "Thing": { "name": "string", "size": "number" },
            "Box": { "label": "string", "opened": "date", "things": ["Thing"], "meta": { "weight": "number" } }
        }))
        .expect("catalog declaration")
        .build()
        .expect("catalog")
}

fn boxes(count: usize) -> serde_json::Value {
    (0..count)
        .map(|i| {
            json!({
                "label": format!("box {i}"),
                "opened": "2017-01-09T00:00:00+01:00",
                "things": [{ "name": "a", "size": "1" }, { "name": "b", "size": 2 }],
                "meta": { "weight": i }
            })
        })
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let catalog = catalog();
    let plain = Codec::new(Schema::for_type(&catalog, "Box").expect("schema"));
    let mapped = Codec::new(
        Schema::builder(&catalog, "Box")
            .map_kind(
                Kind::Date,
                Transform::new().set(|value, _, _| Ok(value)),
            )
            .map_property("label", Transform::new().alias("name"))
            .build()
            .expect("schema"),
    );

    let mut group = c.benchmark_group("decode");
    for count in [1usize, 100, 1000] {
        let input = Value::from(boxes(count));
        group.bench_with_input(BenchmarkId::new("plain", count), &input, |b, input| {
            b.to_async(&runtime)
                .iter(|| async { black_box(plain.decode(input.clone()).await) });
        });
        group.bench_with_input(BenchmarkId::new("mapped", count), &input, |b, input| {
            b.to_async(&runtime)
                .iter(|| async { black_box(mapped.decode(input.clone()).await) });
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let codec = Codec::new(Schema::for_type(&catalog(), "Box").expect("schema"));
    let records = runtime
        .block_on(codec.decode(Value::from(boxes(100))))
        .expect("decode");

    c.bench_function("encode_100", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(codec.encode(records.clone()).await) });
    });
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
