//! The flattened, primitive-only netlist produced by the flattener: every
//! wire is a dense `usize` index, every `Module` node has been inlined away.

use ahash::AHashMap;
use indexmap::IndexMap;

/// A node in the flat netlist. Wire references are dense indices into the
/// simulator's value array, not names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatNode {
    /// An external driver.
    Input {
        /// Output wire index.
        out: usize,
    },
    /// A literal value.
    Const {
        /// Output wire index.
        out: usize,
        /// The literal, already masked to `width` bits.
        value: u32,
        /// Declared width.
        width: u32,
    },
    /// `(~(a & b)) & mask`.
    Nand {
        /// First operand.
        a: usize,
        /// Second operand.
        b: usize,
        /// Output.
        out: usize,
        /// Precomputed `(1 << width) - 1`.
        mask: u32,
    },
    /// `(v >> bit) & 1`.
    Index {
        /// Source wire.
        v: usize,
        /// Output (always width 1).
        out: usize,
        /// Bit position.
        bit: u32,
    },
    /// `(v >> lo) & mask`.
    Slice {
        /// Source wire.
        v: usize,
        /// Output.
        out: usize,
        /// Low bit, inclusive.
        lo: u32,
        /// Precomputed `(1 << (hi - lo + 1)) - 1`.
        mask: u32,
    },
    /// Concatenation; `ins[0]` occupies the highest bits of `out`.
    Concat {
        /// Operand wires, most-significant first.
        ins: Vec<usize>,
        /// Per-operand widths, same order as `ins`.
        widths: Vec<u32>,
        /// Output wire.
        out: usize,
    },
    /// Width-1 rising-edge D latch.
    Dff {
        /// Data input.
        d: usize,
        /// Clock input.
        clk: usize,
        /// Output (the latched value).
        out: usize,
    },
    /// Synchronous-write, asynchronous-read byte memory.
    Ram {
        /// Address input.
        addr: usize,
        /// Write-data input.
        data: usize,
        /// Write-enable input.
        write: usize,
        /// Clock input.
        clk: usize,
        /// Output (the asynchronous read value).
        out: usize,
        /// Address width; storage size is `1 << addr_w` bytes.
        addr_w: u32,
        /// Index into the evaluator's RAM bank storage.
        bank: usize,
    },
    /// Asynchronous-read byte memory.
    Rom {
        /// Address input.
        addr: usize,
        /// Output (the read value).
        out: usize,
        /// Address width; storage size is `1 << addr_w` bytes.
        addr_w: u32,
        /// Index into the evaluator's ROM bank storage.
        bank: usize,
    },
    /// A memoized pure combinational sub-circuit.
    Lut {
        /// Input wires, in declared order (first input occupies the low bits
        /// of the packed lookup key).
        ins: Vec<usize>,
        /// Per-input widths, same order as `ins`.
        in_widths: Vec<u32>,
        /// Output wires, in declared order.
        outs: Vec<usize>,
        /// Per-output widths, same order as `outs`.
        out_widths: Vec<u32>,
        /// One packed 32-bit entry per input combination.
        table: Vec<u32>,
    },
}

/// The flattened netlist: a dense wire-width array and the primitive nodes
/// that produce each non-input wire, plus the name maps a façade needs to
/// serve `set_input`/`get_output`/`get_wire`/`load_rom`/`read_ram`/`write_ram`.
#[derive(Debug, Clone, Default)]
pub struct FlatNetlist {
    /// Width of every wire, indexed by wire index.
    pub widths: Vec<u32>,
    /// Every node that is not a bare `Input` marker, plus the `Input`
    /// markers themselves — every wire with index `i` either has exactly one
    /// entry here producing it, or is never produced (dangling, width still
    /// recorded, reads as 0).
    pub nodes: Vec<FlatNode>,
    /// Top-module input port name -> wire index.
    pub input_names: AHashMap<String, usize>,
    /// Top-module output port name -> wire index.
    pub output_names: AHashMap<String, usize>,
    /// Every named wire reachable from the top module -> wire index, used to
    /// serve `get_wire` probes (including nested/aliased names). Kept in
    /// insertion order so `get_all_wires` iterates deterministically.
    pub wire_names: IndexMap<String, usize>,
    /// Target-wire name of each `rom(...)` call -> bank index.
    pub rom_banks: AHashMap<String, usize>,
    /// Target-wire name of each `ram(...)` call -> bank index.
    pub ram_banks: AHashMap<String, usize>,
    /// Total number of distinct ROM banks.
    pub num_roms: usize,
    /// Total number of distinct RAM banks.
    pub num_rams: usize,
}

impl FlatNetlist {
    /// Total number of dense wire slots.
    pub fn num_wires(&self) -> usize {
        self.widths.len()
    }

    /// `(1 << width) - 1`, saturating at `u32::MAX` for `width >= 32`.
    pub fn mask_for(width: u32) -> u32 {
        if width >= 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_for_handles_full_width() {
        assert_eq!(FlatNetlist::mask_for(1), 0b1);
        assert_eq!(FlatNetlist::mask_for(8), 0xFF);
        assert_eq!(FlatNetlist::mask_for(32), u32::MAX);
    }
}
