//! The two smallest fixtures: a bare `nand` gate and a bare `dff` latch.
//! Every other fixture in this crate is built out of these two primitives.

use wire_types::{Expr, ParsedModule};

/// A single `nand` gate: `out = nand(a, b)`.
pub fn nand_gate() -> Vec<ParsedModule> {
    vec![ParsedModule::new("nand_gate")
        .input("a", 1)
        .input("b", 1)
        .output("out", 1)
        .stmt("out", Expr::call("nand", vec![Expr::ident("a"), Expr::ident("b")]))]
}

/// A single `dff`: `q = dff(d, clk)`.
pub fn dff_latch() -> Vec<ParsedModule> {
    vec![ParsedModule::new("dff_latch")
        .input("d", 1)
        .input("clk", 1)
        .output("q", 1)
        .stmt("q", Expr::call("dff", vec![Expr::ident("d"), Expr::ident("clk")]))]
}
