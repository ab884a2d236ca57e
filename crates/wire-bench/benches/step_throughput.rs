//! `step()` throughput across the three evaluator strategies, on a
//! combinational fixture (the 16-bit adder) and a sequential one (the tiny
//! CPU). This is a non-regression diagnostic, not a correctness gate — see
//! the top-level test suite for correctness.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use wire_demos::{lda_sta_hlt_program, ripple_adder, tiny_cpu};
use wire_sim::{Simulator, Strategy};

const STRATEGIES: [(&str, Strategy); 3] = [
    ("interpreter", Strategy::Interpreter),
    ("levelized", Strategy::Levelized),
    ("compiled", Strategy::Compiled),
];

fn bench_adder16(c: &mut Criterion) {
    let modules = ripple_adder(16);
    let mut group = c.benchmark_group("adder16_step");
    for (label, strategy) in STRATEGIES {
        group.bench_with_input(BenchmarkId::from_parameter(label), &strategy, |b, &strategy| {
            let mut sim = Simulator::build_with_strategy(&modules, Some("adder16"), strategy).unwrap();
            sim.set_input("a", 0xBEEF);
            sim.set_input("b", 0x1234);
            b.iter(|| sim.step());
        });
    }
    group.finish();
}

fn bench_tiny_cpu(c: &mut Criterion) {
    let modules = tiny_cpu();
    let mut group = c.benchmark_group("tiny_cpu_step");
    for (label, strategy) in STRATEGIES {
        group.bench_with_input(BenchmarkId::from_parameter(label), &strategy, |b, &strategy| {
            let mut sim = Simulator::build_with_strategy(&modules, Some("tiny_cpu"), strategy).unwrap();
            sim.load_rom(&lda_sta_hlt_program(), None);
            let mut clk = 0u32;
            b.iter(|| {
                clk ^= 1;
                sim.set_input("clk", clk);
                sim.step();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_adder16, bench_tiny_cpu);
criterion_main!(benches);
