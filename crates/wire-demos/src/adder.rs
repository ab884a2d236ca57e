//! Ripple-carry adder, built the way a hand-written HDL program would: a
//! one-bit `full_adder` module, instantiated `n` times by a generated
//! `adderN` top module that chains each stage's carry into the next.
//!
//! Grounded in the same spirit as a textbook ripple-carry generator: each
//! stage is a small, reusable sub-circuit, and the top-level module is just
//! the wiring that replicates and chains it.

use wire_types::{Expr, ParsedModule};

use crate::gates::{and_e, or_e, xor_e};

/// The one-bit full adder every `adderN` fixture instantiates: `sum = a ^ b
/// ^ cin`, `cout = (a & b) | ((a ^ b) & cin)`.
pub fn full_adder_module() -> ParsedModule {
    ParsedModule::new("full_adder")
        .input("a", 1)
        .input("b", 1)
        .input("cin", 1)
        .output("sum", 1)
        .output("cout", 1)
        .stmt("a_xor_b", xor_e(Expr::ident("a"), Expr::ident("b")))
        .stmt("sum", xor_e(Expr::ident("a_xor_b"), Expr::ident("cin")))
        .stmt("a_and_b", and_e(Expr::ident("a"), Expr::ident("b")))
        .stmt("carry_path", and_e(Expr::ident("a_xor_b"), Expr::ident("cin")))
        .stmt("cout", or_e(Expr::ident("a_and_b"), Expr::ident("carry_path")))
}

/// An `n`-bit ripple-carry adder: `adderN(a: n, b: n, cin: 1) -> (sum: n,
/// cout: 1)`, built from `n` chained [`full_adder_module`] instances.
///
/// Returns both modules — `full_adder` and the generated top module — in
/// build order. `n` must be at least 1.
pub fn ripple_adder(n: u32) -> Vec<ParsedModule> {
    assert!(n >= 1, "ripple_adder: n must be at least 1");

    let name = format!("adder{n}");
    let mut top = ParsedModule::new(name.as_str())
        .input("a", n)
        .input("b", n)
        .input("cin", 1)
        .output("sum", n)
        .output("cout", 1);

    let mut carry = Expr::ident("cin");
    let mut sum_bits = Vec::with_capacity(n as usize);
    for i in 0..n {
        let inst = format!("fa{i}");
        top = top.stmt(
            inst.as_str(),
            Expr::call(
                "full_adder",
                vec![Expr::ident("a").index(i), Expr::ident("b").index(i), carry],
            ),
        );
        let sum_bit = format!("s{i}");
        top = top.stmt(sum_bit.as_str(), Expr::ident(inst.as_str()));
        let carry_bit = format!("c{i}");
        top = top.stmt(carry_bit.as_str(), Expr::ident(inst.as_str()).member("cout"));
        sum_bits.push(sum_bit);
        carry = Expr::ident(carry_bit);
    }

    // `concat` takes its arguments high-bit-first; sum_bits is built
    // low-to-high, so it's fed in reverse.
    let sum_expr = Expr::call(
        "concat",
        sum_bits.iter().rev().map(|s| Expr::ident(s.clone())).collect(),
    );
    top = top.stmt("sum", sum_expr);
    top = top.stmt("cout", carry);

    vec![full_adder_module(), top]
}
