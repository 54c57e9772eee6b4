use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use html::{Dom, apply_patch, diff_dom, tokenize};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 5_000;

fn make_page(blocks: usize, label: &str) -> String {
    let mut out = String::with_capacity(blocks * 64 + 256);
    out.push_str("<!DOCTYPE html><html><head><title>");
    out.push_str(label);
    out.push_str("</title><link rel=stylesheet href=/site.css><meta name=description content=");
    out.push_str(label);
    out.push_str("></head><body>");
    for i in 0..blocks {
        out.push_str("<div class=box><span>");
        out.push_str(label);
        out.push_str(&i.to_string());
        out.push_str("</span><img src=x></div>");
    }
    out.push_str("</body></html>");
    out
}

fn bench_tokenize_large(c: &mut Criterion) {
    let input = make_page(LARGE_BLOCKS, "a");
    c.bench_function("bench_tokenize_large", |b| {
        b.iter(|| black_box(tokenize(black_box(&input)).len()));
    });
}

fn bench_diff_identical(c: &mut Criterion) {
    let current = Dom::parse(&make_page(LARGE_BLOCKS, "a"));
    let target = Dom::parse(&make_page(LARGE_BLOCKS, "a"));
    c.bench_function("bench_diff_identical", |b| {
        b.iter(|| black_box(diff_dom(black_box(&current), black_box(&target))));
    });
}

fn bench_diff_all_text_changed(c: &mut Criterion) {
    let current = Dom::parse(&make_page(LARGE_BLOCKS, "a"));
    let target = Dom::parse(&make_page(LARGE_BLOCKS, "b"));
    c.bench_function("bench_diff_all_text_changed", |b| {
        b.iter(|| black_box(diff_dom(black_box(&current), black_box(&target))));
    });
}

fn bench_diff_and_apply_small(c: &mut Criterion) {
    let current = Dom::parse(&make_page(SMALL_BLOCKS, "a"));
    let target = Dom::parse(&make_page(SMALL_BLOCKS * 2, "b"));
    c.bench_function("bench_diff_and_apply_small", |b| {
        b.iter_batched(
            || current.clone(),
            |mut live| {
                let patch = diff_dom(&live, &target);
                black_box(apply_patch(&mut live, &patch).map(|stats| stats.total()))
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_tokenize_large,
    bench_diff_identical,
    bench_diff_all_text_changed,
    bench_diff_and_apply_small
);
criterion_main!(benches);
