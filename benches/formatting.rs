use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dcfboard::formatting::{derive_margin_series, format_currency, format_multiple};
use dcfboard::{Dataset, assemble};

fn bench_formatters(c: &mut Criterion) {
    c.bench_function("format_currency", |b| {
        b.iter(|| format_currency(black_box(12_345_678.91)))
    });
    c.bench_function("format_multiple", |b| {
        b.iter(|| format_multiple(black_box(14.8)))
    });

    let dataset = Dataset::titan();
    c.bench_function("derive_margin_series", |b| {
        b.iter(|| {
            derive_margin_series(
                black_box(&dataset.financials.revenue),
                black_box(&dataset.financials.ebit),
            )
        })
    });
}

fn bench_assemble(c: &mut Criterion) {
    let dataset = Dataset::titan();
    c.bench_function("assemble", |b| b.iter(|| assemble(black_box(&dataset))));
}

criterion_group!(benches, bench_formatters, bench_assemble);
criterion_main!(benches);
