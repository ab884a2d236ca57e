//! Hand-built circuit fixtures, shared by the core crates' tests, the
//! top-level integration suite, and `wire-bench`.
//!
//! This is a fixture generator, not a parser: every fixture here builds its
//! [`wire_types::ParsedModule`] values directly with the AST's builder
//! methods, the same way the (excluded) text-format parser would after
//! reading a `.wire` file. Nothing here is a stand-in for that parser.

mod adder;
mod alu;
mod basics;
mod cpu;
mod gates;
mod pc;

pub use adder::{full_adder_module, ripple_adder};
pub use alu::alu8;
pub use basics::{dff_latch, nand_gate};
pub use cpu::{lda_sta_hlt_program, tiny_cpu, OPCODE_HLT, OPCODE_LDA, OPCODE_STA};
pub use gates::{and_e, and_reduce_e, broadcast, eq_e, mux_w, not_e, or_e, or_reduce_e, xor_e};
pub use pc::program_counter;
