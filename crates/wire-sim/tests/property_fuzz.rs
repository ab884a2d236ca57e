//! Seeded-randomized cross-strategy equivalence: instead of hand-picked
//! traces, drive every fixture with a fixed-seed stream of pseudo-random
//! inputs and check all three evaluator strategies land on the same output
//! every single cycle. A fixed seed keeps failures reproducible, matching
//! the teacher's own seeded-RNG test fixtures.

use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wire_demos::{lda_sta_hlt_program, ripple_adder, tiny_cpu};
use wire_sim::{Simulator, Strategy};

const ALL_STRATEGIES: [Strategy; 3] = [Strategy::Interpreter, Strategy::Levelized, Strategy::Compiled];

fn build_all_strategies(modules: &[wire_types::ParsedModule], top: &str) -> Vec<Simulator> {
    ALL_STRATEGIES
        .iter()
        .map(|&s| Simulator::build_with_strategy(modules, Some(top), s).unwrap())
        .collect()
}

#[test]
fn property_strategies_agree_on_random_adder_operands() {
    let modules = ripple_adder(16);
    let mut sims = build_all_strategies(&modules, "adder16");
    let mut rng = ChaCha8Rng::seed_from_u64(0xADDE_16_00);

    for round in 0..200 {
        let a = rng.next_u32() & 0xFFFF;
        let b = rng.next_u32() & 0xFFFF;
        let cin = rng.next_u32() & 1;

        let mut sums = Vec::with_capacity(sims.len());
        let mut couts = Vec::with_capacity(sims.len());
        for sim in sims.iter_mut() {
            sim.set_input("a", a);
            sim.set_input("b", b);
            sim.set_input("cin", cin);
            sim.step();
            sums.push(sim.get_output("sum"));
            couts.push(sim.get_output("cout"));
        }
        assert!(sums.windows(2).all(|w| w[0] == w[1]), "round {round}: sum diverged for a={a} b={b} cin={cin}: {sums:?}");
        assert!(couts.windows(2).all(|w| w[0] == w[1]), "round {round}: cout diverged for a={a} b={b} cin={cin}: {couts:?}");

        let expected_sum = (a as u64 + b as u64 + cin as u64) as u32 & 0xFFFF;
        assert_eq!(sums[0], expected_sum, "round {round}: sum wrong for a={a} b={b} cin={cin}");
    }
}

#[test]
fn property_strategies_agree_on_random_clock_traces_through_the_cpu() {
    let modules = tiny_cpu();
    let mut sims = build_all_strategies(&modules, "tiny_cpu");
    for sim in sims.iter_mut() {
        sim.load_rom(&lda_sta_hlt_program(), None);
    }
    let mut rng = ChaCha8Rng::seed_from_u64(0xC7C0_1234);

    // Randomize only `reset`, never `clk` — the CPU still needs an ordinary
    // rising edge each cycle to make forward progress, but whether `reset`
    // happens to be asserted on any given cycle is exactly the kind of
    // input-trace randomness a naive fixed-point and a compiled-closure
    // evaluator need to agree on.
    for cycle in 0..20 {
        let reset = if cycle < 2 { 1 } else { rng.next_u32() % 16 == 0 };
        for sim in sims.iter_mut() {
            sim.set_input("reset", reset as u32);
            sim.set_input("clk", 0);
            sim.step();
            sim.set_input("clk", 1);
            sim.step();
        }
        let halted: Vec<u32> = sims.iter().map(|s| s.get_output("halted")).collect();
        let pc: Vec<u32> = sims.iter().map(|s| s.get_output("pc")).collect();
        let acc: Vec<u32> = sims.iter().map(|s| s.get_output("acc")).collect();
        assert!(halted.windows(2).all(|w| w[0] == w[1]), "cycle {cycle}: halted diverged: {halted:?}");
        assert!(pc.windows(2).all(|w| w[0] == w[1]), "cycle {cycle}: pc diverged: {pc:?}");
        assert!(acc.windows(2).all(|w| w[0] == w[1]), "cycle {cycle}: acc diverged: {acc:?}");
    }
}
