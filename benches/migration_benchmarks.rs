use bibliograph::ingest::{ingest_archive, ingest_openlibrary, ArchiveDoc, OneOrMany, OpenLibraryDoc};
use bibliograph::linker::{link_catalog, LinkStrategy};
use bibliograph::migration::{migrate_into, MigrationConfig};
use bibliograph::{CatalogStore, GraphStore};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const SUBJECTS: [&str; 5] = ["Physics", "Chemistry", "Biology", "Astronomy", "Geology"];

/// Catalog with `size` books, `size` archive documents and a few authors per book
fn seeded_catalog(size: usize) -> CatalogStore {
    let catalog = CatalogStore::open_in_memory().unwrap();

    let books: Vec<OpenLibraryDoc> = (0..size)
        .map(|i| OpenLibraryDoc {
            title: Some(format!("{} Volume {}", SUBJECTS[i % SUBJECTS.len()], i)),
            first_publish_year: Some(1900 + (i % 120) as i64),
            cover_edition_key: Some(format!("OL{}M", i)),
            has_fulltext: i % 2 == 0,
            author_name: vec![format!("Author {}", i % 50), format!("Author {}", (i + 7) % 50)],
            edition_count: Some((i % 4) as i64),
            language: Some(OneOrMany::One("eng".to_string())),
        })
        .collect();
    ingest_openlibrary(&catalog, &books).unwrap();

    let docs: Vec<ArchiveDoc> = (0..size)
        .map(|i| ArchiveDoc {
            identifier: Some(format!("doc{}", i)),
            title: Some(OneOrMany::One(format!(
                "{} Volume {} (scanned)",
                SUBJECTS[(i + 1) % SUBJECTS.len()],
                i
            ))),
            downloads: Some(i as i64),
            ..Default::default()
        })
        .collect();
    ingest_archive(&catalog, &docs).unwrap();

    catalog
}

/// Benchmark the linker strategies against each other
fn bench_linking(c: &mut Criterion) {
    let mut group = c.benchmark_group("linking");
    group.sample_size(10);

    for size in [100, 500].iter() {
        for strategy in [LinkStrategy::Indexed, LinkStrategy::Naive] {
            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), size),
                size,
                |b, &size| {
                    b.iter_batched(
                        || seeded_catalog(size),
                        |catalog| link_catalog(&catalog, strategy).unwrap(),
                        criterion::BatchSize::LargeInput,
                    );
                },
            );
        }
    }
    group.finish();
}

/// Benchmark a full migration into an empty graph at several batch sizes
fn bench_migration(c: &mut Criterion) {
    let mut group = c.benchmark_group("migration");
    group.sample_size(10);

    let catalog = seeded_catalog(2_000);
    link_catalog(&catalog, LinkStrategy::Indexed).unwrap();

    for batch_size in [10, 100, 1000].iter() {
        let config = MigrationConfig::default().with_batch_size(*batch_size);
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &config, |b, config| {
            b.iter(|| {
                let mut graph = GraphStore::new();
                let report = migrate_into(&catalog, &mut graph, config);
                criterion::black_box(report.totals().succeeded);
            });
        });
    }
    group.finish();
}

/// Benchmark re-running a migration over an already-populated graph
fn bench_remigration(c: &mut Criterion) {
    let catalog = seeded_catalog(2_000);
    let config = MigrationConfig::default();
    let mut graph = GraphStore::new();
    migrate_into(&catalog, &mut graph, &config);

    c.bench_function("remigration_noop", |b| {
        b.iter(|| {
            let report = migrate_into(&catalog, &mut graph, &config);
            criterion::black_box(report.totals().unchanged);
        });
    });
}

criterion_group!(benches, bench_linking, bench_migration, bench_remigration);
criterion_main!(benches);
