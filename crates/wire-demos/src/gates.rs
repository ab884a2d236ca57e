//! NAND-only combinational building blocks.
//!
//! Wire has exactly one combinational primitive with any logical content,
//! `nand`. Everything else in these fixtures — `not`, `and`, `or`, `xor`,
//! equality, reduction, and multiplexing — is an `Expr` tree built out of
//! it, the same way a hand-drafted netlist would be. These helpers build
//! nested [`Expr`] trees directly rather than declaring a named statement
//! per gate; the builder mints a fresh synthetic wire for every sub-tree, so
//! the result is identical to writing out each gate by hand.

use wire_types::Expr;

/// `!x`, bitwise, at whatever width `x` carries.
pub fn not_e(x: Expr) -> Expr {
    Expr::call("nand", vec![x.clone(), x])
}

/// `a & b`, bitwise.
pub fn and_e(a: Expr, b: Expr) -> Expr {
    not_e(Expr::call("nand", vec![a, b]))
}

/// `a | b`, bitwise, via De Morgan.
pub fn or_e(a: Expr, b: Expr) -> Expr {
    Expr::call("nand", vec![not_e(a), not_e(b)])
}

/// `a ^ b`, bitwise, the textbook four-NAND construction.
pub fn xor_e(a: Expr, b: Expr) -> Expr {
    let n1 = Expr::call("nand", vec![a.clone(), b.clone()]);
    let n2 = Expr::call("nand", vec![a, n1.clone()]);
    let n3 = Expr::call("nand", vec![b, n1]);
    Expr::call("nand", vec![n2, n3])
}

/// Replicates a 1-bit signal into a `width`-bit all-ones or all-zeros mask,
/// so a single select bit can gate a multi-bit bus with an ordinary bitwise
/// `and_e`.
pub fn broadcast(bit: Expr, width: u32) -> Expr {
    Expr::call("concat", vec![bit; width as usize])
}

/// 2:1 multiplexer at `width` bits: `sel` picks `b` when 1, `a` when 0.
pub fn mux_w(sel: Expr, a: Expr, b: Expr, width: u32) -> Expr {
    let mask = broadcast(sel, width);
    let not_mask = not_e(mask.clone());
    or_e(and_e(not_mask, a), and_e(mask, b))
}

/// ANDs every bit of a `width`-bit value down to one: 1 iff all bits are 1.
pub fn and_reduce_e(bits: Expr, width: u32) -> Expr {
    let mut acc = bits.clone().index(0);
    for i in 1..width {
        acc = and_e(acc, bits.clone().index(i));
    }
    acc
}

/// 1 iff `a == b`, bitwise-compared over `width` bits.
pub fn eq_e(a: Expr, b: Expr, width: u32) -> Expr {
    and_reduce_e(not_e(xor_e(a, b)), width)
}

/// 1 iff any bit of a `width`-bit value is set (NOR-reduce's complement).
pub fn or_reduce_e(bits: Expr, width: u32) -> Expr {
    not_e(and_reduce_e(not_e(bits), width))
}
