//! An 8-bit ALU fixture. Only addition is wired up — enough to exercise
//! flag computation (zero, negative, carry, signed overflow) end to end —
//! since that's the only operation any seeded scenario or property exercises.
//! A real ALU's other opcodes are out of scope for a test fixture.

use wire_types::{Expr, ParsedModule};

use crate::adder::ripple_adder;
use crate::gates::{and_e, and_reduce_e, not_e, xor_e};

/// `alu8(a: 8, b: 8, cin: 1) -> (result: 8, z: 1, n: 1, c: 1, v: 1)`.
///
/// `result = a + b + cin`; `z` is set iff `result == 0`; `n` mirrors
/// `result`'s sign bit; `c` is the adder's carry-out; `v` is the signed
/// two's-complement overflow flag.
pub fn alu8() -> Vec<ParsedModule> {
    let mut modules = ripple_adder(8);

    let top = ParsedModule::new("alu8")
        .input("a", 8)
        .input("b", 8)
        .input("cin", 1)
        .output("result", 8)
        .output("z", 1)
        .output("n", 1)
        .output("c", 1)
        .output("v", 1)
        .stmt(
            "add_call",
            Expr::call("adder8", vec![Expr::ident("a"), Expr::ident("b"), Expr::ident("cin")]),
        )
        .stmt("result", Expr::ident("add_call"))
        .stmt("c", Expr::ident("add_call").member("cout"))
        .stmt("n", Expr::ident("result").index(7))
        .stmt("not_result", not_e(Expr::ident("result")))
        .stmt("z", and_reduce_e(Expr::ident("not_result"), 8))
        .stmt(
            "same_sign",
            not_e(xor_e(Expr::ident("a").index(7), Expr::ident("b").index(7))),
        )
        .stmt(
            "diff_result",
            xor_e(Expr::ident("a").index(7), Expr::ident("result").index(7)),
        )
        .stmt("v", and_e(Expr::ident("same_sign"), Expr::ident("diff_result")));

    modules.push(top);
    modules
}
