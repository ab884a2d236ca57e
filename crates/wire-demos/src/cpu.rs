//! A minimal instruction-decoding CPU: a 16-bit program counter, an 8-bit
//! accumulator, a one-instruction-per-cycle fetch (ROM reads are
//! combinational, so all three bytes of an instruction are visible in the
//! same cycle they're fetched in), and three opcodes.
//!
//! | mnemonic   | opcode | operand bytes   | effect                |
//! |------------|--------|-----------------|-----------------------|
//! | `LDA #imm` | `0x01` | 1 (immediate)   | `acc <- imm`          |
//! | `STA addr` | `0x02` | 2 (lo, hi)      | `mem[addr] <- acc`    |
//! | `HLT`      | `0xFF` | 0               | halts permanently     |
//!
//! An unrecognized opcode is treated as a one-byte no-op, so a program never
//! gets stuck decoding garbage; it just drifts forward a byte at a time.

use wire_types::{Expr, ParsedModule};

use crate::adder::ripple_adder;
use crate::gates::{and_e, eq_e, mux_w, not_e, or_e};

/// `LDA #imm` opcode.
pub const OPCODE_LDA: u8 = 0x01;
/// `STA addr` opcode.
pub const OPCODE_STA: u8 = 0x02;
/// `HLT` opcode.
pub const OPCODE_HLT: u8 = 0xFF;

/// Assembles `LDA #0x42; STA $0100; HLT` as raw program bytes, ready for
/// an evaluator's or `Simulator`'s `load_rom`.
pub fn lda_sta_hlt_program() -> Vec<u8> {
    vec![OPCODE_LDA, 0x42, OPCODE_STA, 0x00, 0x01, OPCODE_HLT]
}

/// `tiny_cpu(clk: 1, reset: 1) -> (halted: 1, pc: 16, acc: 8, write_enable:
/// 1, write_addr: 16, write_data: 8)`.
///
/// `write_enable`/`write_addr`/`write_data` mirror the RAM write port so a
/// test can observe exactly when and what the CPU writes, in addition to
/// reading the RAM contents back afterwards.
pub fn tiny_cpu() -> Vec<ParsedModule> {
    let mut modules = ripple_adder(16);

    let mut top = ParsedModule::new("tiny_cpu")
        .input("clk", 1)
        .input("reset", 1)
        .output("halted", 1)
        .output("pc", 16)
        .output("acc", 8)
        .output("write_enable", 1)
        .output("write_addr", 16)
        .output("write_data", 8);

    // --- registers (forward-reference their `_next` companion; dff ignores
    // the declared width of `d`, so the order here is safe) ---
    for i in 0..16 {
        let bit = format!("pc_bit_{i}");
        top = top.stmt(
            bit.as_str(),
            Expr::call("dff", vec![Expr::ident("pc_next").index(i), Expr::ident("clk")]),
        );
    }
    for i in 0..8 {
        let bit = format!("acc_bit_{i}");
        top = top.stmt(
            bit.as_str(),
            Expr::call("dff", vec![Expr::ident("acc_next").index(i), Expr::ident("clk")]),
        );
    }
    top = top.stmt(
        "halt_bit",
        Expr::call("dff", vec![Expr::ident("halt_next"), Expr::ident("clk")]),
    );

    let pc_bits: Vec<Expr> = (0..16).rev().map(|i| Expr::ident(format!("pc_bit_{i}"))).collect();
    top = top.stmt("pc", Expr::call("concat", pc_bits));
    let acc_bits: Vec<Expr> = (0..8).rev().map(|i| Expr::ident(format!("acc_bit_{i}"))).collect();
    top = top.stmt("acc", Expr::call("concat", acc_bits));
    top = top.stmt("halted", Expr::ident("halt_bit"));

    // --- instruction fetch: three ROM reads at pc, pc+1, pc+2. Every bank
    // gets loaded with the same program by `load_rom(data, None)`, so these
    // behave as one shared program memory read from three offsets. ---
    top = top.stmt(
        "pc_plus1",
        Expr::call("adder16", vec![Expr::ident("pc"), Expr::konst_w(1, 16), Expr::konst_w(0, 1)]),
    );
    top = top.stmt(
        "pc_plus2",
        Expr::call("adder16", vec![Expr::ident("pc"), Expr::konst_w(2, 16), Expr::konst_w(0, 1)]),
    );
    top = top.stmt("opcode", Expr::call("rom", vec![Expr::ident("pc")]));
    top = top.stmt("byte1", Expr::call("rom", vec![Expr::ident("pc_plus1")]));
    top = top.stmt("byte2", Expr::call("rom", vec![Expr::ident("pc_plus2")]));

    // --- decode ---
    top = top.stmt("is_lda", eq_e(Expr::ident("opcode"), Expr::konst_w(OPCODE_LDA as u64, 8), 8));
    top = top.stmt("is_sta", eq_e(Expr::ident("opcode"), Expr::konst_w(OPCODE_STA as u64, 8), 8));
    top = top.stmt("is_hlt", eq_e(Expr::ident("opcode"), Expr::konst_w(OPCODE_HLT as u64, 8), 8));

    top = top.stmt("not_halted", not_e(Expr::ident("halt_bit")));
    top = top.stmt("halt_next", or_e(Expr::ident("halt_bit"), Expr::ident("is_hlt")));

    // --- accumulator: LDA loads byte1, otherwise holds ---
    top = top.stmt(
        "acc_load_en",
        and_e(Expr::ident("not_halted"), Expr::ident("is_lda")),
    );
    top = top.stmt(
        "acc_next",
        mux_w(Expr::ident("acc_load_en"), Expr::ident("acc"), Expr::ident("byte1"), 8),
    );

    // --- RAM write port: STA writes the current accumulator to {byte2,
    // byte1} (high byte first), otherwise the write strobe stays low ---
    top = top.stmt(
        "write_enable",
        and_e(Expr::ident("not_halted"), Expr::ident("is_sta")),
    );
    top = top.stmt("write_addr", Expr::call("concat", vec![Expr::ident("byte2"), Expr::ident("byte1")]));
    top = top.stmt("write_data", Expr::ident("acc"));
    top = top.stmt(
        "ram_call",
        Expr::call(
            "ram",
            vec![
                Expr::ident("write_addr"),
                Expr::ident("write_data"),
                Expr::ident("write_enable"),
                Expr::ident("clk"),
            ],
        ),
    );

    // --- program counter: advance by the current instruction's length,
    // unless halted (frozen) or reset (forced to 0) ---
    top = top.stmt(
        "pc_delta",
        mux_w(
            Expr::ident("is_sta"),
            mux_w(Expr::ident("is_lda"), Expr::konst_w(1, 16), Expr::konst_w(2, 16), 16),
            Expr::konst_w(3, 16),
            16,
        ),
    );
    top = top.stmt(
        "pc_advanced",
        Expr::call("adder16", vec![Expr::ident("pc"), Expr::ident("pc_delta"), Expr::konst_w(0, 1)]),
    );
    top = top.stmt(
        "pc_after_halt",
        mux_w(Expr::ident("halt_next"), Expr::ident("pc_advanced"), Expr::ident("pc"), 16),
    );
    top = top.stmt(
        "pc_next",
        mux_w(Expr::ident("reset"), Expr::ident("pc_after_halt"), Expr::konst_w(0, 16), 16),
    );

    modules.push(top);
    modules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_bytes_match_the_documented_table() {
        let program = lda_sta_hlt_program();
        assert_eq!(program, vec![0x01, 0x42, 0x02, 0x00, 0x01, 0xFF]);
    }

    #[test]
    fn tiny_cpu_declares_the_documented_outputs() {
        let modules = tiny_cpu();
        let top = modules.last().unwrap();
        assert_eq!(top.name, "tiny_cpu");
        let names: Vec<&str> = top.outputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["halted", "pc", "acc", "write_enable", "write_addr", "write_data"]);
    }
}
