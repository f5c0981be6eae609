use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use redigraph::query::{GraphMetadata, QueryParam, QueryParams, RawReply};
use redigraph::RespValue;

fn bulk(s: &str) -> RespValue {
    RespValue::bulk(s)
}

fn int(i: i64) -> RespValue {
    RespValue::Integer(i)
}

/// `rows` rows of `(n:Person {name, age})-[:KNOWS]->(m)` in compact form
fn compact_reply(rows: i64) -> RespValue {
    let node = |id: i64| {
        RespValue::Array(vec![
            int(8),
            RespValue::Array(vec![
                int(id),
                RespValue::Array(vec![int(1)]),
                RespValue::Array(vec![
                    RespValue::Array(vec![int(0), int(2), bulk(&format!("Person{}", id))]),
                    RespValue::Array(vec![int(1), int(3), int(id % 100)]),
                ]),
            ]),
        ])
    };
    let edge = |id: i64| {
        RespValue::Array(vec![
            int(7),
            RespValue::Array(vec![int(id), int(0), int(id), int(id + 1), RespValue::Array(vec![])]),
        ])
    };
    let header = |name: &str| RespValue::Array(vec![int(1), bulk(name)]);

    RespValue::Array(vec![
        RespValue::Array(vec![header("n"), header("r"), header("m")]),
        RespValue::Array(
            (0..rows)
                .map(|i| RespValue::Array(vec![node(i), edge(i), node(i + 1)]))
                .collect(),
        ),
        RespValue::Array(vec![bulk("Query internal execution time: 1.2 milliseconds")]),
    ])
}

fn metadata() -> GraphMetadata {
    GraphMetadata {
        labels: vec!["Company".into(), "Person".into()],
        relationship_types: vec!["KNOWS".into()],
        property_keys: vec!["name".into(), "age".into()],
    }
}

/// Benchmark parsing and decoding a whole reply against a warm cache
fn bench_reply_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("reply_decode");
    let metadata = metadata();

    for rows in [10, 100, 1000].iter() {
        let reply = compact_reply(*rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &reply, |b, reply| {
            b.iter(|| {
                let raw = RawReply::parse(reply).unwrap();
                let (decoded, pending) = raw.decode(&metadata).unwrap();
                assert!(pending.is_empty());
                decoded
            });
        });
    }
    group.finish();
}

/// Benchmark parameter serialization
fn bench_params(c: &mut Criterion) {
    let mut params = QueryParams::new();
    params.insert("name".to_string(), QueryParam::from("He said \"hi\""));
    params.insert("ids".to_string(), QueryParam::from((0..64).collect::<Vec<i64>>()));
    params.insert("limit".to_string(), QueryParam::from(25i64));

    c.bench_function("params_to_string", |b| {
        b.iter(|| redigraph::query::params::params_to_string(&params));
    });
}

criterion_group!(benches, bench_reply_decode, bench_params);
criterion_main!(benches);
