//! Transaction Benchmarks
//!
//! Measures the copy-on-write hot paths:
//!
//! - `modify_page`: clone-and-insert cost per page, including the metadata
//!   lookup and the page table insert
//! - `commit`: positional write-back of a dirty working set
//! - `get_page_hit`: table lookup for an already-modified page
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench --bench transaction
//! cargo bench --bench transaction -- "commit"
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pagedb::{Database, PAGE_SIZE, TXN_NONE};
use tempfile::tempdir;

fn bench_modify_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("modify_page");

    for page_count in [64u64, 512] {
        let dir = tempdir().unwrap();
        let db = Database::create(dir.path().join("bench.db"), page_count).unwrap();

        group.throughput(Throughput::Bytes(page_count * PAGE_SIZE as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(page_count),
            &page_count,
            |b, &page_count| {
                b.iter(|| {
                    let mut tx = db.begin(TXN_NONE).unwrap();
                    for page_num in 0..page_count {
                        let mut page = tx.modify_page(page_num).unwrap();
                        page[0] = page_num as u8;
                    }
                    black_box(tx.modified_pages());
                });
            },
        );
    }

    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = Database::create(dir.path().join("bench.db"), 256).unwrap();

    c.bench_function("commit_256_pages", |b| {
        b.iter(|| {
            let mut tx = db.begin(TXN_NONE).unwrap();
            for page_num in 0..256u64 {
                tx.modify_page(page_num).unwrap()[8] = 0xFF;
            }
            tx.commit().unwrap();
        });
    });
}

fn bench_get_page_hit(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = Database::create(dir.path().join("bench.db"), 64).unwrap();

    let mut tx = db.begin(TXN_NONE).unwrap();
    for page_num in 0..64u64 {
        tx.modify_page(page_num).unwrap();
    }

    c.bench_function("get_page_hit", |b| {
        b.iter(|| {
            for page_num in 0..64u64 {
                black_box(tx.get_page(page_num).unwrap().data().len());
            }
        });
    });
}

criterion_group!(benches, bench_modify_page, bench_commit, bench_get_page_hit);
criterion_main!(benches);
