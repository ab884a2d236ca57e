//! The default production strategy: typed dense storage for wire values and
//! DFF/RAM state, a precomputed combinational execution order, and per-node
//! masks already baked into the netlist by the flattener.

use ahash::AHashMap;
use wire_lvl::Levelized;
use wire_types::flat::{FlatNetlist, FlatNode};

use crate::{apply_probe, parse_probe, Evaluator, Probe};

/// The levelized evaluator: one array lookup per wire read, one pass over a
/// precomputed node order per combinational propagation.
#[derive(Debug, Clone)]
pub struct LevelizedEvaluator {
    levelized: Levelized,
    /// Dense wire values, one per wire index.
    values: Vec<u32>,
    /// Latched DFF value, indexed by node index (only `dff` entries meaningful).
    dff_state: Vec<u32>,
    /// Previous clock sample, indexed by node index (`dff` entries).
    dff_prev_clk: Vec<u8>,
    /// Previous clock sample, indexed by node index (`ram` entries).
    ram_prev_clk: Vec<u8>,
    /// RAM bank storage, indexed by `FlatNode::Ram::bank`.
    ram_banks: Vec<Vec<u8>>,
    /// ROM bank storage, indexed by `FlatNode::Rom::bank`.
    rom_banks: Vec<Vec<u8>>,
}

impl LevelizedEvaluator {
    /// Builds a fresh evaluator from a levelized netlist. All wires, DFF
    /// state, and RAM storage start zeroed; ROM storage also starts zeroed
    /// (use [`Evaluator::load_rom`] to populate it).
    pub fn new(levelized: Levelized) -> Self {
        let num_wires = levelized.netlist.num_wires();
        let num_nodes = levelized.netlist.nodes.len();
        let ram_banks = (0..levelized.netlist.num_rams)
            .map(|bank| vec![0u8; bank_size(&levelized.netlist, bank, true)])
            .collect();
        let rom_banks = (0..levelized.netlist.num_roms)
            .map(|bank| vec![0u8; bank_size(&levelized.netlist, bank, false)])
            .collect();
        Self {
            values: vec![0; num_wires],
            dff_state: vec![0; num_nodes],
            dff_prev_clk: vec![0; num_nodes],
            ram_prev_clk: vec![0; num_nodes],
            ram_banks,
            rom_banks,
            levelized,
        }
    }

    fn netlist(&self) -> &FlatNetlist {
        &self.levelized.netlist
    }

    fn publish_and_combine(&mut self) {
        for &idx in &self.levelized.sequential {
            if let FlatNode::Dff { out, .. } = &self.netlist().nodes[idx] {
                self.values[*out] = self.dff_state[idx];
            }
        }
        for &idx in &self.levelized.memory.clone() {
            match &self.netlist().nodes[idx] {
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
                _ => unreachable!("lvl: memory bucket contains a non-memory node"),
            }
        }
        for idx in 0..self.levelized.comb_order.len() {
            let node_idx = self.levelized.comb_order[idx];
            self.eval_comb(node_idx);
        }
    }

    fn eval_comb(&mut self, idx: usize) {
        match &self.netlist().nodes[idx] {
            FlatNode::Input { .. } => {}
            FlatNode::Const { out, value, .. } => self.values[*out] = *value,
            FlatNode::Nand { a, b, out, mask } => {
                self.values[*out] = !(self.values[*a] & self.values[*b]) & mask
            }
            FlatNode::Index { v, out, bit } => self.values[*out] = (self.values[*v] >> bit) & 1,
            FlatNode::Slice { v, out, lo, mask } => self.values[*out] = (self.values[*v] >> lo) & mask,
            FlatNode::Concat { ins, widths, out } => {
                let mut result = 0u32;
                let mut shift = 0u32;
                for (v, w) in ins.iter().zip(widths.iter()).rev() {
                    let mask = FlatNetlist::mask_for(*w);
                    result |= (self.values[*v] & mask) << shift;
                    shift += w;
                }
                self.values[*out] = result;
            }
            FlatNode::Lut { ins, in_widths, outs, out_widths, table } => {
                let mut key = 0u32;
                let mut shift = 0u32;
                for (v, w) in ins.iter().zip(in_widths.iter()) {
                    key |= (self.values[*v] & FlatNetlist::mask_for(*w)) << shift;
                    shift += w;
                }
                let packed = table[key as usize];
                let mut shift = 0u32;
                for (o, w) in outs.iter().zip(out_widths.iter()) {
                    self.values[*o] = (packed >> shift) & FlatNetlist::mask_for(*w);
                    shift += w;
                }
            }
            FlatNode::Dff { .. } | FlatNode::Ram { .. } | FlatNode::Rom { .. } => {
                unreachable!("lvl: comb_order contains a sequential/memory node")
            }
        }
    }

    /// Clock edge + DFF/RAM state update. Returns whether anything changed.
    fn edge_phase(&mut self) -> bool {
        let mut changed = false;
        for &idx in &self.levelized.sequential.clone() {
            if let FlatNode::Dff { d, clk, .. } = &self.netlist().nodes[idx] {
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
        for &idx in &self.levelized.memory.clone() {
            if let FlatNode::Ram { addr, data, write, clk, addr_w, bank, .. } = &self.netlist().nodes[idx] {
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
                let map = if is_ram { &self.netlist().ram_banks } else { &self.netlist().rom_banks };
                map.get(name).copied()
            }
            None => Some(0).filter(|_| {
                if is_ram { self.netlist().num_rams > 0 } else { self.netlist().num_roms > 0 }
            }),
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

impl Evaluator for LevelizedEvaluator {
    fn set_input(&mut self, name: &str, value: u32) {
        if let Some(&idx) = self.netlist().input_names.get(name) {
            let width = self.netlist().widths[idx];
            self.values[idx] = value & FlatNetlist::mask_for(width);
        }
    }

    fn get_output(&self, name: &str) -> u32 {
        self.netlist()
            .output_names
            .get(name)
            .map(|&idx| self.values[idx])
            .unwrap_or(0)
    }

    fn get_wire(&self, probe: &str) -> u32 {
        let parsed = parse_probe(probe);
        let base = match parsed {
            Probe::Whole(b) | Probe::Bit(b, _) | Probe::Range(b, _, _) => b,
        };
        match self.netlist().wire_names.get(base) {
            Some(&idx) => apply_probe(self.values[idx], parsed),
            None => 0,
        }
    }

    fn step(&mut self) {
        self.publish_and_combine();
        let changed = self.edge_phase();
        if changed || self.levelized.had_cycle {
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
        self.netlist()
            .wire_names
            .iter()
            .map(|(name, &idx)| (name.clone(), self.values[idx]))
            .collect()
    }
}
