//! Performance benchmarks for the prompt compiler
//!
//! Measures parsing and validation across prompt shapes: short single
//! phrases, multi-clause prompts, and long prompts padded with unknown words
//! that exercise the suggestion path.

use augmentflow::parser::parse;
use augmentflow::validation::TransformValidator;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let prompts = [
        ("single", "motion blur"),
        ("two_clauses", "add blur and rotate 15 degrees"),
        (
            "many_clauses",
            "flip horizontally, slight noise, increase brightness by 20%, then rotate 30 degrees counterclockwise with probability 0.5, grayscale seed 42",
        ),
        (
            "with_unknown_terms",
            "add a sepia vignette and blurr the photo then rotatte it and sharpen edges",
        ),
    ];

    for (name, prompt) in prompts {
        group.bench_with_input(BenchmarkId::new("prompt", name), prompt, |b, prompt| {
            b.iter(|| black_box(parse(black_box(prompt), None)));
        });
    }

    group.finish();
}

fn bench_prompt_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("prompt_length");

    for repeats in &[1, 10, 50] {
        let prompt = vec!["blur then rotate 10 degrees and unknownword"; *repeats].join(", ");
        group.bench_with_input(BenchmarkId::from_parameter(repeats), &prompt, |b, prompt| {
            b.iter(|| black_box(parse(black_box(prompt), None)));
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let validator = TransformValidator::default();
    let spec = parse(
        "strong blur, rotate 400 degrees, brightness 150%, heavy noise, crop 224x224",
        None,
    )
    .unwrap();

    c.bench_function("validate_with_clamps", |b| {
        b.iter(|| black_box(validator.validate(black_box(&spec))));
    });
}

criterion_group!(benches, bench_parse, bench_prompt_length, bench_validate);
criterion_main!(benches);
