//! Levelizer: partitions a [`FlatNetlist`] into sequential (`dff`), memory
//! (`ram`/`rom`), and combinational buckets, and orders the combinational
//! bucket so that every node appears after every node whose output it reads.
//!
//! `dff`/`ram`/`rom` outputs (and `input` markers) are treated as fixed
//! level-0 roots for this purpose: the evaluator always publishes their
//! current state to the wire array *before* the combinational pass runs, so
//! nothing downstream needs to wait on them.

use wire_types::flat::{FlatNetlist, FlatNode};

/// A flat netlist plus its execution order.
#[derive(Debug, Clone)]
pub struct Levelized {
    /// The netlist being executed.
    pub netlist: FlatNetlist,
    /// Indices into `netlist.nodes`, combinational nodes only, in a legal
    /// topological order (ascending level, ties broken by original index).
    pub comb_order: Vec<usize>,
    /// Indices into `netlist.nodes` of every `dff` node.
    pub sequential: Vec<usize>,
    /// Indices into `netlist.nodes` of every `ram`/`rom` node.
    pub memory: Vec<usize>,
    /// Whether a feedback cycle through combinational nodes only (no
    /// register in the loop) was detected while leveling. Not fatal: the
    /// evaluator's one-shot re-evaluation pass absorbs the residual
    /// inconsistency for a single step.
    pub had_cycle: bool,
}

/// Output wire indices a node produces. Most node kinds produce exactly one;
/// `lut` produces one per declared output.
fn outs_of(node: &FlatNode) -> Vec<usize> {
    match node {
        FlatNode::Input { out }
        | FlatNode::Const { out, .. }
        | FlatNode::Nand { out, .. }
        | FlatNode::Index { out, .. }
        | FlatNode::Slice { out, .. }
        | FlatNode::Concat { out, .. }
        | FlatNode::Dff { out, .. }
        | FlatNode::Ram { out, .. }
        | FlatNode::Rom { out, .. } => vec![*out],
        FlatNode::Lut { outs, .. } => outs.clone(),
    }
}

/// Input wire indices a *combinational* node reads. Never called on
/// `dff`/`ram`/`rom`/`input`, which are roots for leveling purposes.
fn comb_inputs(node: &FlatNode) -> Vec<usize> {
    match node {
        FlatNode::Input { .. } | FlatNode::Const { .. } => vec![],
        FlatNode::Nand { a, b, .. } => vec![*a, *b],
        FlatNode::Index { v, .. } => vec![*v],
        FlatNode::Slice { v, .. } => vec![*v],
        FlatNode::Concat { ins, .. } => ins.clone(),
        FlatNode::Lut { ins, .. } => ins.clone(),
        FlatNode::Dff { .. } | FlatNode::Ram { .. } | FlatNode::Rom { .. } => {
            unreachable!("lvl: comb_inputs called on a sequential/memory node")
        }
    }
}

/// Levelizes `netlist`, consuming it.
pub fn levelize(netlist: FlatNetlist) -> Levelized {
    let mut producer: Vec<Option<usize>> = vec![None; netlist.num_wires()];
    for (i, node) in netlist.nodes.iter().enumerate() {
        for out in outs_of(node) {
            producer[out] = Some(i);
        }
    }

    let mut sequential = Vec::new();
    let mut memory = Vec::new();
    let mut comb_nodes = Vec::new();
    for (i, node) in netlist.nodes.iter().enumerate() {
        match node {
            FlatNode::Dff { .. } => sequential.push(i),
            FlatNode::Ram { .. } | FlatNode::Rom { .. } => memory.push(i),
            _ => comb_nodes.push(i),
        }
    }

    let mut levels: Vec<Option<usize>> = vec![None; netlist.nodes.len()];
    let mut visiting: Vec<bool> = vec![false; netlist.nodes.len()];
    let mut had_cycle = false;

    for &i in &comb_nodes {
        node_level(i, &netlist, &producer, &mut levels, &mut visiting, &mut had_cycle);
    }

    let mut comb_order = comb_nodes;
    comb_order.sort_by_key(|&i| (levels[i].unwrap_or(0), i));

    Levelized {
        netlist,
        comb_order,
        sequential,
        memory,
        had_cycle,
    }
}

fn wire_level(
    wire: usize,
    netlist: &FlatNetlist,
    producer: &[Option<usize>],
    levels: &mut [Option<usize>],
    visiting: &mut [bool],
    had_cycle: &mut bool,
) -> usize {
    match producer[wire] {
        Some(node_idx) => node_level(node_idx, netlist, producer, levels, visiting, had_cycle),
        // Dangling wire (never produced) or a wire whose producer is a root:
        // both read as an always-available level-0 value.
        None => 0,
    }
}

fn node_level(
    node_idx: usize,
    netlist: &FlatNetlist,
    producer: &[Option<usize>],
    levels: &mut [Option<usize>],
    visiting: &mut [bool],
    had_cycle: &mut bool,
) -> usize {
    if let Some(l) = levels[node_idx] {
        return l;
    }
    match &netlist.nodes[node_idx] {
        FlatNode::Input { .. } | FlatNode::Dff { .. } | FlatNode::Ram { .. } | FlatNode::Rom { .. } => {
            levels[node_idx] = Some(0);
            return 0;
        }
        _ => {}
    }
    if visiting[node_idx] {
        // Combinational feedback cycle; break it here. The cycle is resolved
        // at runtime by the evaluator's one-shot re-evaluation pass.
        *had_cycle = true;
        return 0;
    }
    visiting[node_idx] = true;
    let ins = comb_inputs(&netlist.nodes[node_idx]);
    let max_in = ins
        .iter()
        .map(|&w| wire_level(w, netlist, producer, levels, visiting, had_cycle))
        .max()
        .unwrap_or(0);
    visiting[node_idx] = false;
    let lvl = 1 + max_in;
    levels[node_idx] = Some(lvl);
    lvl
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use indexmap::IndexMap;

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
    fn chain_of_nands_levels_strictly_increasing() {
        // wires: 0=a(input) 1=b(input) 2=n1=nand(0,1) 3=n2=nand(2,2)
        let nodes = vec![
            FlatNode::Input { out: 0 },
            FlatNode::Input { out: 1 },
            FlatNode::Nand { a: 0, b: 1, out: 2, mask: 1 },
            FlatNode::Nand { a: 2, b: 2, out: 3, mask: 1 },
        ];
        let lvl = levelize(netlist_of(nodes, vec![1, 1, 1, 1]));
        assert!(!lvl.had_cycle);
        // node 3 (the second nand) must come after node 2 in comb_order.
        let pos2 = lvl.comb_order.iter().position(|&i| i == 2).unwrap();
        let pos3 = lvl.comb_order.iter().position(|&i| i == 3).unwrap();
        assert!(pos2 < pos3);
    }

    #[test]
    fn dff_output_is_a_fixed_root_not_in_comb_order() {
        let nodes = vec![
            FlatNode::Input { out: 0 }, // d
            FlatNode::Input { out: 1 }, // clk
            FlatNode::Dff { d: 0, clk: 1, out: 2 },
            FlatNode::Nand { a: 2, b: 2, out: 3, mask: 1 },
        ];
        let lvl = levelize(netlist_of(nodes, vec![1, 1, 1, 1]));
        assert_eq!(lvl.sequential, vec![2]);
        assert!(!lvl.comb_order.contains(&2));
        assert!(lvl.comb_order.contains(&3));
    }

    #[test]
    fn combinational_cycle_is_detected_but_still_ordered() {
        // Two nands feeding each other — not buildable from a real AST, but
        // the levelizer must not infinite-loop on a malformed netlist.
        let nodes = vec![
            FlatNode::Nand { a: 1, b: 1, out: 0, mask: 1 },
            FlatNode::Nand { a: 0, b: 0, out: 1, mask: 1 },
        ];
        let lvl = levelize(netlist_of(nodes, vec![1, 1]));
        assert!(lvl.had_cycle);
        assert_eq!(lvl.comb_order.len(), 2);
    }
}
