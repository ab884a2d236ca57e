//! Baseline strategy: a naive fixed-point sweep over every combinational node
//! on each step, with no precomputed dependency order. Exists to cross-check
//! [`crate::LevelizedEvaluator`] and [`crate::CompiledEvaluator`] against a
//! dumber, more obviously-correct implementation.

use ahash::AHashMap;
use wire_lvl::Levelized;
use wire_types::flat::{FlatNetlist, FlatNode};

use crate::{apply_probe, parse_probe, Evaluator, Probe};

/// Repeated combinational sweeps per step, bounded so a malformed
/// (combinationally cyclic) netlist can't hang the evaluator.
const MAX_SWEEPS: usize = 100;

/// A fixed-point graph interpreter. Shares [`crate::LevelizedEvaluator`]'s
/// dense storage layout but ignores the precomputed `comb_order`, instead
/// re-sweeping every combinational node in its original declaration order
/// until two consecutive sweeps agree (or the sweep budget runs out).
#[derive(Debug, Clone)]
pub struct GraphInterpreter {
    netlist: FlatNetlist,
    comb_nodes: Vec<usize>,
    sequential: Vec<usize>,
    memory: Vec<usize>,
    values: Vec<u32>,
    dff_state: Vec<u32>,
    dff_prev_clk: Vec<u8>,
    ram_prev_clk: Vec<u8>,
    ram_banks: Vec<Vec<u8>>,
    rom_banks: Vec<Vec<u8>>,
}

impl GraphInterpreter {
    /// Builds an interpreter from an already-partitioned netlist, discarding
    /// the level order (`comb_order`'s ordering is not used; only its set
    /// membership, recovered as "everything not sequential or memory", is).
    pub fn new(levelized: Levelized) -> Self {
        let Levelized { netlist, sequential, memory, .. } = levelized;
        let mut in_seq_or_mem = vec![false; netlist.nodes.len()];
        for &i in sequential.iter().chain(memory.iter()) {
            in_seq_or_mem[i] = true;
        }
        let comb_nodes: Vec<usize> = (0..netlist.nodes.len()).filter(|&i| !in_seq_or_mem[i]).collect();

        let num_wires = netlist.num_wires();
        let num_nodes = netlist.nodes.len();
        let ram_banks = (0..netlist.num_rams)
            .map(|bank| vec![0u8; bank_size(&netlist, bank, true)])
            .collect();
        let rom_banks = (0..netlist.num_roms)
            .map(|bank| vec![0u8; bank_size(&netlist, bank, false)])
            .collect();

        Self {
            netlist,
            comb_nodes,
            sequential,
            memory,
            values: vec![0; num_wires],
            dff_state: vec![0; num_nodes],
            dff_prev_clk: vec![0; num_nodes],
            ram_prev_clk: vec![0; num_nodes],
            ram_banks,
            rom_banks,
        }
    }

    fn publish_roots(&mut self) {
        for &idx in &self.sequential {
            if let FlatNode::Dff { out, .. } = &self.netlist.nodes[idx] {
                self.values[*out] = self.dff_state[idx];
            }
        }
        for &idx in &self.memory.clone() {
            match &self.netlist.nodes[idx] {
                FlatNode::Ram { addr, out, addr_w, bank, .. } => {
                    let size = 1usize << addr_w;
                    let a = self.values[*addr] as usize;
                    self.values[*out] = if a < size { self.ram_banks[*bank][a] as u32 } else { 0 };
                }
                FlatNode::Rom { addr, out, addr_w, bank } => {
                    let size = 1usize << addr_w;
                    let a = self.values[*addr] as usize;
                    self.values[*out] = if a < size { self.rom_banks[*bank][a] as u32 } else { 0 };
                }
                _ => unreachable!("interpreter: memory bucket contains a non-memory node"),
            }
        }
    }

    /// One full sweep of every combinational node. Returns whether any
    /// output value changed.
    fn sweep(&mut self) -> bool {
        let mut changed = false;
        for idx in 0..self.comb_nodes.len() {
            let node_idx = self.comb_nodes[idx];
            changed |= self.eval_one(node_idx);
        }
        changed
    }

    fn eval_one(&mut self, idx: usize) -> bool {
        let new_val = match &self.netlist.nodes[idx] {
            FlatNode::Input { out } => self.values[*out],
            FlatNode::Const { value, .. } => *value,
            FlatNode::Nand { a, b, mask, .. } => !(self.values[*a] & self.values[*b]) & mask,
            FlatNode::Index { v, bit, .. } => (self.values[*v] >> bit) & 1,
            FlatNode::Slice { v, lo, mask, .. } => (self.values[*v] >> lo) & mask,
            FlatNode::Concat { ins, widths, .. } => {
                let mut result = 0u32;
                let mut shift = 0u32;
                for (v, w) in ins.iter().zip(widths.iter()).rev() {
                    let mask = FlatNetlist::mask_for(*w);
                    result |= (self.values[*v] & mask) << shift;
                    shift += w;
                }
                result
            }
            FlatNode::Lut { .. } => return self.eval_lut(idx),
            FlatNode::Dff { .. } | FlatNode::Ram { .. } | FlatNode::Rom { .. } => {
                unreachable!("interpreter: comb_nodes contains a sequential/memory node")
            }
        };
        let out = out_of(&self.netlist.nodes[idx]);
        if self.values[out] != new_val {
            self.values[out] = new_val;
            true
        } else {
            false
        }
    }

    fn eval_lut(&mut self, idx: usize) -> bool {
        let FlatNode::Lut { ins, in_widths, outs, out_widths, table } = &self.netlist.nodes[idx] else {
            unreachable!()
        };
        let mut key = 0u32;
        let mut shift = 0u32;
        for (v, w) in ins.iter().zip(in_widths.iter()) {
            key |= (self.values[*v] & FlatNetlist::mask_for(*w)) << shift;
            shift += w;
        }
        let packed = table[key as usize];
        let mut shift = 0u32;
        let mut changed = false;
        for (o, w) in outs.iter().zip(out_widths.iter()) {
            let new_val = (packed >> shift) & FlatNetlist::mask_for(*w);
            if self.values[*o] != new_val {
                self.values[*o] = new_val;
                changed = true;
            }
            shift += w;
        }
        changed
    }

    fn settle(&mut self) {
        self.publish_roots();
        for _ in 0..MAX_SWEEPS {
            if !self.sweep() {
                break;
            }
        }
    }

    fn bank_for(&self, node_id: Option<&str>, is_ram: bool) -> Option<usize> {
        match node_id {
            Some(name) => {
                let map = if is_ram { &self.netlist.ram_banks } else { &self.netlist.rom_banks };
                map.get(name).copied()
            }
            None => Some(0).filter(|_| {
                if is_ram { self.netlist.num_rams > 0 } else { self.netlist.num_roms > 0 }
            }),
        }
    }
}

fn out_of(node: &FlatNode) -> usize {
    match node {
        FlatNode::Input { out }
        | FlatNode::Const { out, .. }
        | FlatNode::Nand { out, .. }
        | FlatNode::Index { out, .. }
        | FlatNode::Slice { out, .. }
        | FlatNode::Concat { out, .. } => *out,
        _ => unreachable!("interpreter: out_of called on a multi-output or root node"),
    }
}

fn bank_size(netlist: &FlatNetlist, bank: usize, is_ram: bool) -> usize {
    let addr_w = netlist
        .nodes
        .iter()
        .find_map(|n| match n {
            FlatNode::Ram { bank: nb, addr_w, .. } if is_ram && *nb == bank => Some(*addr_w),
            FlatNode::Rom { bank: nb, addr_w, .. } if !is_ram && *nb == bank => Some(*addr_w),
            _ => None,
        })
        .unwrap_or(0);
    1usize << addr_w
}

impl Evaluator for GraphInterpreter {
    fn set_input(&mut self, name: &str, value: u32) {
        if let Some(&idx) = self.netlist.input_names.get(name) {
            let width = self.netlist.widths[idx];
            self.values[idx] = value & FlatNetlist::mask_for(width);
        }
    }

    fn get_output(&self, name: &str) -> u32 {
        self.netlist.output_names.get(name).map(|&idx| self.values[idx]).unwrap_or(0)
    }

    fn get_wire(&self, probe: &str) -> u32 {
        let parsed = parse_probe(probe);
        let base = match parsed {
            Probe::Whole(b) | Probe::Bit(b, _) | Probe::Range(b, _, _) => b,
        };
        match self.netlist.wire_names.get(base) {
            Some(&idx) => apply_probe(self.values[idx], parsed),
            None => 0,
        }
    }

    fn step(&mut self) {
        self.settle();
        let mut changed = false;
        for &idx in &self.sequential.clone() {
            if let FlatNode::Dff { d, clk, .. } = &self.netlist.nodes[idx] {
                let clk_v = self.values[*clk] & 1;
                let rising = self.dff_prev_clk[idx] == 0 && clk_v == 1;
                if rising {
                    let dv = self.values[*d] & 1;
                    if dv != self.dff_state[idx] {
                        self.dff_state[idx] = dv;
                        changed = true;
                    }
                }
                self.dff_prev_clk[idx] = clk_v as u8;
            }
        }
        for &idx in &self.memory.clone() {
            if let FlatNode::Ram { addr, data, write, clk, addr_w, bank, .. } = &self.netlist.nodes[idx] {
                let clk_v = self.values[*clk] & 1;
                let rising = self.ram_prev_clk[idx] == 0 && clk_v == 1;
                if rising {
                    if self.values[*write] & 1 == 1 {
                        let a = self.values[*addr] as usize;
                        let size = 1usize << addr_w;
                        if a < size {
                            self.ram_banks[*bank][a] = (self.values[*data] & 0xFF) as u8;
                        }
                    }
                    changed = true;
                }
                self.ram_prev_clk[idx] = clk_v as u8;
            }
        }
        if changed {
            self.settle();
        }
    }

    fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
        self.dff_state.iter_mut().for_each(|v| *v = 0);
        self.dff_prev_clk.iter_mut().for_each(|v| *v = 0);
        self.ram_prev_clk.iter_mut().for_each(|v| *v = 0);
        for bank in &mut self.ram_banks {
            bank.iter_mut().for_each(|b| *b = 0);
        }
    }

    fn load_rom(&mut self, data: &[u8], node_id: Option<&str>) {
        match node_id {
            Some(_) => {
                if let Some(bank) = self.bank_for(node_id, false) {
                    let n = data.len().min(self.rom_banks[bank].len());
                    self.rom_banks[bank][..n].copy_from_slice(&data[..n]);
                }
            }
            None => {
                for bank in 0..self.rom_banks.len() {
                    let n = data.len().min(self.rom_banks[bank].len());
                    self.rom_banks[bank][..n].copy_from_slice(&data[..n]);
                }
            }
        }
    }

    fn read_ram(&self, addr: u32, node_id: Option<&str>) -> u8 {
        match self.bank_for(node_id, true) {
            Some(bank) => self.ram_banks[bank].get(addr as usize).copied().unwrap_or(0),
            None => 0,
        }
    }

    fn write_ram(&mut self, addr: u32, value: u8, node_id: Option<&str>) {
        if let Some(bank) = self.bank_for(node_id, true) {
            if let Some(slot) = self.ram_banks[bank].get_mut(addr as usize) {
                *slot = value;
            }
        }
    }

    fn get_all_wires(&self) -> AHashMap<String, u32> {
        self.netlist.wire_names.iter().map(|(name, &idx)| (name.clone(), self.values[idx])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use wire_lvl::levelize;

    fn netlist_of(nodes: Vec<FlatNode>, widths: Vec<u32>) -> FlatNetlist {
        FlatNetlist {
            widths,
            nodes,
            input_names: AHashMap::default(),
            output_names: AHashMap::default(),
            wire_names: IndexMap::default(),
            rom_banks: AHashMap::default(),
            ram_banks: AHashMap::default(),
            num_roms: 0,
            num_rams: 0,
        }
    }

    #[test]
    fn nand_chain_settles_without_a_precomputed_order() {
        // a=1 b=1 -> n1=nand(a,b)=0 -> n2=nand(n1,n1)=1
        let mut netlist = netlist_of(
            vec![
                FlatNode::Input { out: 0 },
                FlatNode::Input { out: 1 },
                FlatNode::Nand { a: 0, b: 1, out: 2, mask: 1 },
                FlatNode::Nand { a: 2, b: 2, out: 3, mask: 1 },
            ],
            vec![1, 1, 1, 1],
        );
        netlist.input_names.insert("a".into(), 0);
        netlist.input_names.insert("b".into(), 1);
        netlist.output_names.insert("out".into(), 3);
        let mut ev = GraphInterpreter::new(levelize(netlist));
        ev.set_input("a", 1);
        ev.set_input("b", 1);
        ev.step();
        assert_eq!(ev.get_output("out"), 1);
    }
}
