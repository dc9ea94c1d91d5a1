//! Benchmarks for trace evaluation and grammar enumeration.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use pred_search::{
    compute::{GrammarTree, ProgressionCompiler, TraceEvaluator},
    schema::{AtomTable, CompilerConfig, Formula, Grammar, LiteralMode, Valuation},
};

/// Three atoms oscillating out of phase.
fn trace(length: usize) -> Vec<Valuation> {
    (0..length)
        .map(|t| {
            let phase = t as f32 * 0.1;
            Valuation::new()
                .with(0, phase.sin())
                .with(1, (phase + 2.0).sin())
                .with(2, (phase + 4.0).sin())
        })
        .collect()
}

fn atoms() -> AtomTable {
    let mut atoms = AtomTable::new();
    for name in ["a", "b", "c"] {
        atoms.intern(name);
    }
    atoms
}

fn bench_evaluate_trace(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_trace");
    let atoms = atoms();
    let compiler = ProgressionCompiler::new(&CompilerConfig::default());

    for predicate in ["F(a & X(F b))", "G(a -> F c)", "SSEQ[a,b,c]"] {
        let Ok(formula) = Formula::parse(predicate, &atoms) else {
            continue;
        };
        let Ok(automaton) = compiler.compile_formula(&formula, &atoms) else {
            continue;
        };
        let evaluator = TraceEvaluator::new(&automaton);

        for length in [100, 1000] {
            let trace = trace(length);
            group.bench_with_input(
                BenchmarkId::new(predicate, length),
                &length,
                |b, _| {
                    b.iter(|| evaluator.evaluate(black_box(&trace)));
                },
            );
        }
    }

    group.finish();
}

fn bench_enumeration(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerate");
    let mut grammar = Grammar::parse(
        "<predicate> ::= <literal> | \"F\" <predicate> | \"G\" <predicate> | \"(\" <predicate> \"&\" <predicate> \")\"",
    )
    .unwrap_or_default();
    grammar.inject_literals(&["a", "b", "c"], LiteralMode::Plain);

    for depth in [2, 3] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| GrammarTree::build(black_box(&grammar), depth).enumerate());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate_trace, bench_enumeration);
criterion_main!(benches);
