//! Benchmarks for the registry ABI codec
//!
//! Run with: cargo bench

use agora::chain::{abi, Address, Proposal};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn create_test_proposals(count: usize) -> Vec<Proposal> {
    (0..count)
        .map(|i| Proposal {
            id: i as u64 + 1,
            author: Address::new([(i % 256) as u8; 20]),
            title: format!("Proposal {}", i),
            description: "Allocate funds for the next community workshop. ".repeat(4),
            created_at: 1_700_000_000 + i as u64 * 12,
        })
        .collect()
}

fn bench_proposal_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_proposals");

    for size in [10, 100, 1000] {
        let proposals = create_test_proposals(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("encode_{}", size), |b| {
            b.iter(|| abi::encode_proposals(black_box(&proposals)))
        });

        let encoded = abi::encode_proposals(&proposals);

        group.bench_function(format!("decode_{}", size), |b| {
            b.iter(|| abi::decode_proposals(black_box(&encoded)).unwrap())
        });
    }

    group.finish();
}

fn bench_create_calldata(c: &mut Criterion) {
    let description = "Fund a technical writer for six months. ".repeat(20);

    c.bench_function("encode_create_proposal", |b| {
        b.iter(|| abi::encode_create_proposal(black_box("Fund the docs"), black_box(&description)))
    });

    let calldata = abi::encode_create_proposal("Fund the docs", &description);
    c.bench_function("decode_create_proposal", |b| {
        b.iter(|| abi::decode_create_proposal(black_box(&calldata)).unwrap())
    });
}

fn bench_address(c: &mut Criterion) {
    let address = Address::new([0x5a; 20]);
    let checksum = address.to_checksum();

    c.bench_function("address_checksum", |b| b.iter(|| black_box(&address).to_checksum()));

    c.bench_function("address_parse_checksum", |b| {
        b.iter(|| black_box(checksum.as_str()).parse::<Address>().unwrap())
    });
}

criterion_group!(benches, bench_proposal_list, bench_create_calldata, bench_address);
criterion_main!(benches);
