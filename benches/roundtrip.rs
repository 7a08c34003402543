use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use tripod::identifier::{Language, QName};
use tripod::literal::Literal;
use tripod::numeric::Decimal;
use tripod::temporal::DateTime;

fn sample_values() -> Vec<Literal> {
    vec![
        Literal::string("a plain string with \"quotes\" and a\nline break"),
        Literal::lang_string("Grüezi mitenand", Language::new("de-CH").unwrap()),
        Literal::Boolean(true),
        Literal::from(922337203685477580i64),
        Literal::Decimal(Decimal::parse("3.14159265358979").unwrap()),
        Literal::DateTime(DateTime::parse("2024-06-01T08:30:00.250Z").unwrap()),
        Literal::QName(QName::parse("dcterms:modified").unwrap()),
    ]
}

fn wire_codec(c: &mut Criterion) {
    let values = sample_values();
    let wires: Vec<String> = values.iter().map(Literal::to_wire).collect();

    c.bench_function("to_wire", |b| {
        b.iter(|| {
            for value in &values {
                black_box(value.to_wire());
            }
        })
    });

    c.bench_function("from_wire", |b| {
        b.iter(|| {
            for wire in &wires {
                black_box(Literal::from_wire(wire).unwrap());
            }
        })
    });
}

criterion_group!(benches, wire_codec);
criterion_main!(benches);
