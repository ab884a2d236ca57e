//! Straight-line strategy: the combinational pass is precompiled once, at
//! construction time, into a flat `Vec` of closures operating directly on the
//! value array. This is the safe-Rust analogue of a JIT-compiled evaluator —
//! no unsafe codegen, just monomorphized closures instead of a per-node
//! `match` re-dispatched on every step.

use ahash::AHashMap;
use wire_lvl::Levelized;
use wire_types::flat::{FlatNetlist, FlatNode};

use crate::{apply_probe, parse_probe, Evaluator, Probe};

type CombFn = Box<dyn Fn(&mut [u32]) + Send + Sync>;

/// An evaluator whose combinational pass has been compiled into a sequence
/// of closures, one per node, captured over that node's wire indices and
/// masks instead of re-reading them from a `FlatNode` on every step.
pub struct CompiledEvaluator {
    netlist: FlatNetlist,
    sequential: Vec<usize>,
    memory: Vec<usize>,
    had_cycle: bool,
    comb_fns: Vec<CombFn>,
    values: Vec<u32>,
    dff_state: Vec<u32>,
    dff_prev_clk: Vec<u8>,
    ram_prev_clk: Vec<u8>,
    ram_banks: Vec<Vec<u8>>,
    rom_banks: Vec<Vec<u8>>,
}

impl std::fmt::Debug for CompiledEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledEvaluator")
            .field("num_wires", &self.values.len())
            .field("num_comb_fns", &self.comb_fns.len())
            .finish()
    }
}

impl CompiledEvaluator {
    /// Compiles `levelized` once. The `comb_order` is baked into the closure
    /// sequence directly, so no per-step dispatch on node kind remains.
    pub fn new(levelized: Levelized) -> Self {
        let Levelized { netlist, comb_order, sequential, memory, had_cycle } = levelized;
        let comb_fns = comb_order.iter().map(|&idx| compile_node(&netlist.nodes[idx])).collect();

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
            sequential,
            memory,
            had_cycle,
            comb_fns,
            values: vec![0; num_wires],
            dff_state: vec![0; num_nodes],
            dff_prev_clk: vec![0; num_nodes],
            ram_prev_clk: vec![0; num_nodes],
            ram_banks,
            rom_banks,
        }
    }

    fn publish_and_combine(&mut self) {
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
                _ => unreachable!("compiled: memory bucket contains a non-memory node"),
            }
        }
        for f in &self.comb_fns {
            f(&mut self.values);
        }
    }

    fn edge_phase(&mut self) -> bool {
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
        changed
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

/// Compiles one node into a closure operating directly on the value array.
/// `FlatNode::Dff`/`Ram`/`Rom` never reach here — they're roots, published
/// before the closure chain runs, not part of it.
fn compile_node(node: &FlatNode) -> CombFn {
    match node.clone() {
        FlatNode::Input { .. } => Box::new(|_| {}),
        FlatNode::Const { out, value, .. } => Box::new(move |v| v[out] = value),
        FlatNode::Nand { a, b, out, mask } => Box::new(move |v| v[out] = !(v[a] & v[b]) & mask),
        FlatNode::Index { v: src, out, bit } => Box::new(move |v| v[out] = (v[src] >> bit) & 1),
        FlatNode::Slice { v: src, out, lo, mask } => Box::new(move |v| v[out] = (v[src] >> lo) & mask),
        FlatNode::Concat { ins, widths, out } => Box::new(move |v| {
            let mut result = 0u32;
            let mut shift = 0u32;
            for (&src, &w) in ins.iter().zip(widths.iter()).rev() {
                result |= (v[src] & FlatNetlist::mask_for(w)) << shift;
                shift += w;
            }
            v[out] = result;
        }),
        FlatNode::Lut { ins, in_widths, outs, out_widths, table } => Box::new(move |v| {
            let mut key = 0u32;
            let mut shift = 0u32;
            for (&src, &w) in ins.iter().zip(in_widths.iter()) {
                key |= (v[src] & FlatNetlist::mask_for(w)) << shift;
                shift += w;
            }
            let packed = table[key as usize];
            let mut shift = 0u32;
            for (&o, &w) in outs.iter().zip(out_widths.iter()) {
                v[o] = (packed >> shift) & FlatNetlist::mask_for(w);
                shift += w;
            }
        }),
        FlatNode::Dff { .. } | FlatNode::Ram { .. } | FlatNode::Rom { .. } => {
            unreachable!("compiled: compile_node called on a sequential/memory node")
        }
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

impl Evaluator for CompiledEvaluator {
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
        self.publish_and_combine();
        let changed = self.edge_phase();
        if changed || self.had_cycle {
            self.publish_and_combine();
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
    fn compiled_nand_chain_matches_direct_evaluation() {
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
        let mut ev = CompiledEvaluator::new(levelize(netlist));
        ev.set_input("a", 0);
        ev.set_input("b", 1);
        ev.step();
        // nand(0,1)=1, nand(1,1)=0
        assert_eq!(ev.get_output("out"), 0);
    }
}
