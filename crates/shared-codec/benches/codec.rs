//! Token codec benchmarks: serialization, sealing, and opening.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde::{Deserialize, Serialize};
use shared_codec::{
    BinarySerializer, BinaryUnserializer, BufferPool, Decryptor, Encryptor, JsonSerializer,
    JsonUnserializer, SecretKey, Serializer,
};
use std::collections::BTreeMap;
use shared_types::Value;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct BenchState {
    id: Uuid,
    owner: Uuid,
    created: i64,
    updated: i64,
    public: BTreeMap<String, Value>,
    private: BTreeMap<String, Value>,
}

fn sample_state(entries: usize) -> BenchState {
    let mut public = BTreeMap::new();
    for i in 0..entries {
        public.insert(format!("field_{i}"), Value::Num(i as f64));
    }
    BenchState {
        id: Uuid::new_v4(),
        owner: Uuid::new_v4(),
        created: 1_700_000_000_000,
        updated: 1_700_000_000_500,
        public,
        private: BTreeMap::from([("seed".to_string(), Value::Str("bench".to_string()))]),
    }
}

fn bench_serializers(c: &mut Criterion) {
    let state = sample_state(16);
    let json = JsonSerializer::<BenchState>::new(BufferPool::new());
    let binary =
        BinarySerializer::<BenchState>::new("BenchState", BufferPool::new()).expect("register");

    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Elements(1));
    group.bench_function("json", |b| {
        b.iter(|| json.serialize(black_box(&state)).expect("serialize"));
    });
    group.bench_function("binary", |b| {
        b.iter(|| binary.serialize(black_box(&state)).expect("serialize"));
    });
    group.finish();
}

fn bench_encrypt_decrypt(c: &mut Criterion) {
    let key = SecretKey::from_bytes(&[11u8; 32]).expect("key");
    let encryptor = Encryptor::new(
        Box::new(JsonSerializer::<BenchState>::new(BufferPool::new())),
        &key,
    );
    let decryptor: Decryptor<BenchState> = Decryptor::new(Box::new(JsonUnserializer::new()), &key);
    let state = sample_state(16);
    let token = encryptor.encrypt(&state).expect("encrypt");

    let mut group = c.benchmark_group("token");
    group.throughput(Throughput::Elements(1));
    group.bench_function("encrypt", |b| {
        b.iter(|| encryptor.encrypt(black_box(&state)).expect("encrypt"));
    });
    group.bench_function("decrypt", |b| {
        b.iter(|| {
            let mut out = BenchState::default();
            decryptor.decrypt(black_box(&token), &mut out).expect("decrypt");
            out
        });
    });
    group.finish();
}

fn bench_binary_token(c: &mut Criterion) {
    let key = SecretKey::from_bytes(&[12u8; 32]).expect("key");
    let encryptor = Encryptor::new(
        Box::new(
            BinarySerializer::<BenchState>::new("BenchStateToken", BufferPool::new())
                .expect("register"),
        ),
        &key,
    );
    let decryptor: Decryptor<BenchState> = Decryptor::new(
        Box::new(BinaryUnserializer::<BenchState>::new("BenchStateToken").expect("register")),
        &key,
    );
    let state = sample_state(16);
    let token = encryptor.encrypt(&state).expect("encrypt");

    let mut group = c.benchmark_group("token_binary");
    group.throughput(Throughput::Elements(1));
    group.bench_function("encrypt", |b| {
        b.iter(|| encryptor.encrypt(black_box(&state)).expect("encrypt"));
    });
    group.bench_function("decrypt", |b| {
        b.iter(|| {
            let mut out = BenchState::default();
            decryptor.decrypt(black_box(&token), &mut out).expect("decrypt");
            out
        });
    });
    group.finish();
}

fn bench_buffer_pool(c: &mut Criterion) {
    let pool = BufferPool::new();
    // Warm one buffer so the steady state is reuse, not allocation.
    drop(pool.acquire());

    c.bench_function("pool_acquire_release", |b| {
        b.iter(|| {
            let mut buf = pool.acquire();
            buf.extend_from_slice(black_box(b"0123456789abcdef"));
        });
    });
}

criterion_group!(
    benches,
    bench_serializers,
    bench_encrypt_decrypt,
    bench_binary_token,
    bench_buffer_pool
);
criterion_main!(benches);
