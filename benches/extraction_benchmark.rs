//! Extraction throughput on a representative product page

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tyre_crawler_lib::domain::{discounted_price, parse_size};
use tyre_crawler_lib::infrastructure::parsing::TyreDetailParser;

const PAGE: &str = r#"
<html><head>
    <meta property="og:title" content="Michelin Pilot Sport 5 245/40ZR18 97Y">
    <meta property="og:image" content="https://cdn.shop.test/ps5.jpg">
</head><body>
    <nav><ul><li>Home</li><li>Tyres</li><li>Michelin</li></ul></nav>
    <h1 class="product_title">Michelin Pilot Sport 5 245/40ZR18 97Y</h1>
    <div class="summary">
        <p class="price"><del><span class="amount">AED 1,020.00</span></del>
        <ins><span class="amount">AED 955.00</span></ins></p>
    </div>
    <table class="woocommerce-product-attributes">
        <tr><th>Size</th><td>245/40ZR18</td></tr>
        <tr><th>Load/Speed Index</th><td>97Y</td></tr>
        <tr><th>Pattern</th><td>Pilot Sport 5</td></tr>
        <tr><th>Country of Origin</th><td>France</td></tr>
        <tr><th>Year</th><td>2024</td></tr>
        <tr><th>Warranty</th><td>5 years</td></tr>
    </table>
</body></html>
"#;

fn bench_extraction(c: &mut Criterion) {
    let parser = TyreDetailParser::new().expect("default selectors compile");

    c.bench_function("extract_product_page", |b| {
        b.iter(|| parser.extract(black_box(PAGE), "https://shop.test/tyre/ps5"));
    });
}

fn bench_derived_fields(c: &mut Criterion) {
    c.bench_function("parse_size", |b| b.iter(|| parse_size(black_box("245/40ZR18"))));
    c.bench_function("discounted_price", |b| {
        b.iter(|| discounted_price(black_box("AED 1,020.00"), 5.0));
    });
}

criterion_group!(benches, bench_extraction, bench_derived_fields);
criterion_main!(benches);
