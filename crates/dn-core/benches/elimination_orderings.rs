//! Criterion benchmarks comparing elimination orderings.
//!
//! Networks are synthetic and deterministic: a star (one hub, many leaves)
//! where a bad order is exponential, and a grid where min-fill and min-size
//! diverge.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dn_core::config::EngineConfig;
use dn_core::decision::DecisionEvaluator;
use dn_core::inference::{EliminationOrdering, Evidence, VariableElimination};
use dn_core::model::{Network, NetworkBuilder};

const TF: &[&str] = &["False", "True"];
const NONE: &[&str] = &[];

fn star(leaves: usize) -> Network {
    let mut b = NetworkBuilder::new().with_name("star");
    b.add_variable("H", TF, NONE).expect("hub");
    b.set_cpt("H", &[0.5, 0.5]).expect("hub cpt");
    for i in 0..leaves {
        let name = format!("L{i}");
        b.add_variable(&name, TF, &["H"]).expect("leaf");
        b.set_cpt(&name, &[0.9, 0.1, 0.2, 0.8]).expect("leaf cpt");
    }
    b.build().expect("star builds")
}

/// `n × n` grid, each cell depending on its upper and left neighbours.
fn grid(n: usize) -> Network {
    let mut b = NetworkBuilder::new().with_name("grid");
    for r in 0..n {
        for c in 0..n {
            let mut parents = Vec::new();
            if r > 0 {
                parents.push(format!("G{}_{}", r - 1, c));
            }
            if c > 0 {
                parents.push(format!("G{}_{}", r, c - 1));
            }
            let name = format!("G{r}_{c}");
            b.add_variable(&name, TF, &parents).expect("cell");
            let rows = 1usize << parents.len();
            let table: Vec<f64> = (0..rows)
                .flat_map(|i| {
                    let p = 0.2 + 0.6 * (i as f64) / (rows as f64);
                    [1.0 - p, p]
                })
                .collect();
            b.set_cpt(&name, &table).expect("cell cpt");
        }
    }
    b.build().expect("grid builds")
}

fn orderings() -> [EliminationOrdering; 3] {
    [
        EliminationOrdering::MinSize,
        EliminationOrdering::MinFill,
        EliminationOrdering::ReverseTopological,
    ]
}

fn bench_star(c: &mut Criterion) {
    let net = star(16);
    let evidence = Evidence::new().with("L3", "True").with("L7", "False");
    let mut group = c.benchmark_group("star16");
    for ordering in orderings() {
        let config = EngineConfig::default()
            .with_ordering(ordering.clone())
            .with_prune_barren(false)
            .with_cache_orders(false);
        let engine = VariableElimination::with_config(&net, config);
        group.bench_with_input(
            BenchmarkId::new("infer", ordering.name()),
            &evidence,
            |b, ev| {
                b.iter(|| {
                    let post = engine.infer(black_box("L0"), ev).expect("posterior");
                    black_box(post.probabilities[1]);
                })
            },
        );
    }
    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    let net = grid(5);
    let evidence = Evidence::new().with("G4_4", "True");
    let mut group = c.benchmark_group("grid5x5");
    for ordering in orderings() {
        for cached in [false, true] {
            let config = EngineConfig::default()
                .with_ordering(ordering.clone())
                .with_cache_orders(cached);
            let engine = VariableElimination::with_config(&net, config);
            let id = format!("{}{}", ordering.name(), if cached { "+cache" } else { "" });
            group.bench_with_input(BenchmarkId::new("infer", id), &evidence, |b, ev| {
                b.iter(|| {
                    let post = engine.infer(black_box("G0_0"), ev).expect("posterior");
                    black_box(post.probabilities[1]);
                })
            });
        }
    }
    group.finish();
}

fn bench_decision(c: &mut Criterion) {
    let net = Network::from_spec(&dn_config::get_preset(dn_config::PresetName::Fraud))
        .expect("fraud preset builds");
    let engine = VariableElimination::new(&net);
    let evaluator = DecisionEvaluator::new(&engine);
    let evidence = Evidence::new().with("FP", "True").with("IP", "True");
    c.bench_function("choose_action_fraud", |b| {
        b.iter(|| {
            let result = evaluator
                .choose_action("Action", "Cost", black_box(&evidence))
                .expect("decision");
            black_box(result.expected_utility);
        })
    });
}

criterion_group!(benches, bench_star, bench_grid, bench_decision);
criterion_main!(benches);
