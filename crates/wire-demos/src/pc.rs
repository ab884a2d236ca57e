//! A 16-bit program counter with the textbook priority: `reset` beats
//! `load` beats `inc`, and holding is the default when none fire.

use wire_types::{Expr, ParsedModule};

use crate::adder::ripple_adder;
use crate::gates::mux_w;

/// `pc(clk: 1, reset: 1, load: 1, inc: 1, din: 16) -> pc: 16`.
///
/// On every rising `clk` edge: `reset` forces `pc` to 0; else `load` loads
/// `din`; else `inc` advances `pc` by 1; else `pc` holds.
pub fn program_counter() -> Vec<ParsedModule> {
    let mut modules = ripple_adder(16);

    let mut top = ParsedModule::new("pc")
        .input("clk", 1)
        .input("reset", 1)
        .input("load", 1)
        .input("inc", 1)
        .input("din", 16)
        .output("pc", 16);

    for i in 0..16 {
        let bit = format!("pc_bit_{i}");
        top = top.stmt(
            bit.as_str(),
            Expr::call("dff", vec![Expr::ident("pc_next").index(i), Expr::ident("clk")]),
        );
    }

    // High-bit-first, matching `concat`'s argument order.
    let bits: Vec<Expr> = (0..16).rev().map(|i| Expr::ident(format!("pc_bit_{i}"))).collect();
    top = top.stmt("pc", Expr::call("concat", bits));

    top = top.stmt(
        "inc_call",
        Expr::call("adder16", vec![Expr::ident("pc"), Expr::konst_w(1, 16), Expr::konst_w(0, 1)]),
    );
    top = top.stmt(
        "mux_inc",
        mux_w(Expr::ident("inc"), Expr::ident("pc"), Expr::ident("inc_call"), 16),
    );
    top = top.stmt(
        "mux_load",
        mux_w(Expr::ident("load"), Expr::ident("mux_inc"), Expr::ident("din"), 16),
    );
    top = top.stmt(
        "pc_next",
        mux_w(Expr::ident("reset"), Expr::ident("mux_load"), Expr::konst_w(0, 16), 16),
    );

    modules.push(top);
    modules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_counter_has_expected_ports() {
        let modules = program_counter();
        let top = modules.last().unwrap();
        assert_eq!(top.name, "pc");
        assert_eq!(top.outputs, vec![("pc".to_string(), 16)]);
    }
}
