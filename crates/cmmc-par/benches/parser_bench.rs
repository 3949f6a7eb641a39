//! Parser throughput benchmark.

use cmmc_lex::{strip_comments, tokenize};
use cmmc_par::parse;
use cmmc_util::Handler;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sample_source(extra_functions: usize) -> String {
    let mut src = String::from(
        "const int MAX = 100;\n\
         int work(int x);\n\
         main() {\n\
             var int i, s = 0;\n\
             for (i = 0; i < MAX; i = i + 1) {\n\
                 if (i % 2 == 0 && s < 1000) { s = s + work(i); }\n\
             }\n\
             return;\n\
         }\n\
         int work(int x) { return x * 2; }\n",
    );
    for n in 0..extra_functions {
        src.push_str(&format!("int f{n}(int a) {{ return a + {n}; }}\n", n = n));
    }
    src
}

fn bench_parser(c: &mut Criterion) {
    let small = sample_source(0);
    let large = sample_source(50);

    c.bench_function("parse_small", |b| {
        b.iter(|| {
            let handler = Handler::new();
            let tokens = strip_comments(tokenize(black_box(&small), &handler));
            black_box(parse(tokens, &handler))
        })
    });

    c.bench_function("parse_large", |b| {
        b.iter(|| {
            let handler = Handler::new();
            let tokens = strip_comments(tokenize(black_box(&large), &handler));
            black_box(parse(tokens, &handler))
        })
    });
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
