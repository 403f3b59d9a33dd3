use criterion::{criterion_group, criterion_main, Criterion};
use fundex_core::classifier::{classify, tokenize};
use fundex_core::RawFundRecord;

fn bench_classify(c: &mut Criterion) {
    let records: Vec<RawFundRecord> = [
        "HDFC Large & Mid Cap Fund Direct Growth",
        "ICICI Prudential Ultra Short Term Fund Regular IDCW Reinvestment",
        "Some Unclassifiable Scheme Series XVII",
        "Aditya Birla Sun Life Banking and PSU Debt Fund Direct Growth",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| RawFundRecord {
        scheme_code: i as u32 + 1,
        scheme_name: name.to_string(),
        isin_growth: None,
        isin_div_reinvestment: None,
    })
    .collect();

    c.bench_function("classify_four_names", |b| {
        b.iter(|| {
            for r in &records {
                std::hint::black_box(classify(r));
            }
        })
    });

    c.bench_function("tokenize_name", |b| {
        b.iter(|| std::hint::black_box(tokenize("HDFC Large & Mid Cap Fund Direct Growth")))
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
