//! Flattener: recursively inlines `Module` call nodes from a per-module
//! compiled graph into one primitive-only [`FlatNetlist`], resolving
//! hierarchical dotted field access and aliasing on demand.
//!
//! Unlike the four-phase pre-registration scheme a literal reading of the
//! data model suggests, this flattener resolves every wire name lazily and
//! memoizes the result (see [`wire_index`]): a forward reference to a
//! not-yet-visited module output simply recurses into that output's own
//! producer the first time it's asked for, and every later reference to the
//! same resolved name hits the memo. This sidesteps phase ordering entirely
//! while producing the same netlist a phased walk would, and handles
//! multi-level `a.b.c` nesting uniformly rather than as a two-pass special
//! case.

use ahash::AHashMap;
use indexmap::IndexMap;
use wire_eval::Evaluator;
use wire_types::{
    graph::{CompiledModule, Node},
    flat::{FlatNetlist, FlatNode},
    BuildError,
};

/// Total input bit-width above which a sub-module is never memoized as a LUT.
const MAX_LUT_INPUT_BITS: u32 = 8;
/// Minimum primitive-node count below which memoizing a sub-module as a LUT
/// isn't worth the table-construction cost. Counts only nodes with actual
/// logic (`Nand`/`Index`/`Slice`/`Concat`/`Dff`/`Ram`/`Rom`/`Lut`) — `Input`
/// markers and `Const` literals carry no evaluation cost to amortize, so
/// they don't count toward the floor.
const MIN_NODE_COUNT_FOR_LUT: usize = 20;

/// Flattens `top` (and everything it transitively instantiates) from
/// `compiled` into one primitive-only netlist, with LUT memoization enabled.
pub fn flatten(compiled: &AHashMap<String, CompiledModule>, top: &str) -> Result<FlatNetlist, BuildError> {
    flatten_inner(compiled, top, true)
}

fn flatten_inner(
    compiled: &AHashMap<String, CompiledModule>,
    top: &str,
    lut_enabled: bool,
) -> Result<FlatNetlist, BuildError> {
    let top_module = compiled
        .get(top)
        .ok_or_else(|| BuildError::UnknownTopModule { name: top.to_string() })?;

    let mut ctx = FlattenCtx {
        compiled,
        lut_enabled,
        widths: Vec::new(),
        nodes: Vec::new(),
        rom_banks: AHashMap::default(),
        ram_banks: AHashMap::default(),
        num_roms: 0,
        num_rams: 0,
        call_outputs: AHashMap::default(),
        lut_cache: AHashMap::default(),
        active: vec![top.to_string()],
    };

    let mut inst = Instance {
        module: top_module,
        prefix: String::new(),
        is_top: true,
        arg_map: AHashMap::default(),
        node_map: AHashMap::default(),
    };

    // Force every real primitive into existence, including dead-output
    // `ram`/`rom` blocks nothing downstream reads but whose storage is still
    // addressable through the façade's `read_ram`/`write_ram`.
    for (name, _) in &top_module.nodes {
        ctx.wire_index(&mut inst, name);
    }

    let mut input_names = AHashMap::default();
    for (name, _) in &top_module.inputs {
        input_names.insert(name.clone(), ctx.wire_index(&mut inst, name));
    }

    let mut output_names = AHashMap::default();
    for (name, _) in &top_module.outputs {
        output_names.insert(name.clone(), ctx.wire_index(&mut inst, name));
    }

    let mut wire_names = IndexMap::default();
    let mut addressable: Vec<&String> = top_module.widths.keys().chain(top_module.aliases.keys()).collect();
    addressable.sort();
    for name in addressable {
        wire_names.insert(name.clone(), ctx.wire_index(&mut inst, name));
    }

    Ok(FlatNetlist {
        widths: ctx.widths,
        nodes: ctx.nodes,
        input_names,
        output_names,
        wire_names,
        rom_banks: ctx.rom_banks,
        ram_banks: ctx.ram_banks,
        num_roms: ctx.num_roms,
        num_rams: ctx.num_rams,
    })
}

/// One module instantiation's local scope: its own definition, the name
/// prefix used for its RAM/ROM bank keys, and a memo of already-resolved
/// wire names (keyed post-alias-resolution).
struct Instance<'a> {
    module: &'a CompiledModule,
    prefix: String,
    is_top: bool,
    /// Input port name -> the caller's already-allocated argument wire.
    /// Empty (and unused) for the top instance, whose inputs are real,
    /// externally-driven wires.
    arg_map: AHashMap<String, usize>,
    node_map: AHashMap<String, usize>,
}

#[derive(Debug, Clone)]
struct LutPlan {
    out_widths: Vec<u32>,
    table: Vec<u32>,
}

struct FlattenCtx<'a> {
    compiled: &'a AHashMap<String, CompiledModule>,
    lut_enabled: bool,
    widths: Vec<u32>,
    nodes: Vec<FlatNode>,
    rom_banks: AHashMap<String, usize>,
    ram_banks: AHashMap<String, usize>,
    num_roms: usize,
    num_rams: usize,
    /// `call_id -> output wire indices`, in the callee's declared order.
    /// Keyed by `call_id` rather than per-instance, since `call_id`s are
    /// unique across an entire build batch (see `wire_types::BuildCtx`).
    call_outputs: AHashMap<u64, Vec<usize>>,
    /// `callee module name -> memoization plan, if one applies`. A LUT's
    /// eligibility and contents depend only on the callee's own definition,
    /// never on a particular call site, so this is cached by name once.
    lut_cache: AHashMap<String, Option<LutPlan>>,
    /// Ancestor module names on the current instantiation path, for cycle
    /// detection (`a` instantiating `b` instantiating `a`).
    active: Vec<String>,
}

impl<'a> FlattenCtx<'a> {
    fn alloc(&mut self, width: u32) -> usize {
        let idx = self.widths.len();
        self.widths.push(width);
        idx
    }

    /// Resolves `name` (in `inst`'s scope) to its dense wire index,
    /// allocating and emitting whatever primitive produces it on first use.
    fn wire_index(&mut self, inst: &mut Instance<'_>, name: &str) -> usize {
        let resolved = inst.module.resolve_alias(name).to_string();
        if let Some(&idx) = inst.node_map.get(&resolved) {
            return idx;
        }

        if let Some(dot) = resolved.find('.') {
            let base = resolved[..dot].to_string();
            let field = resolved[dot + 1..].to_string();
            let idx = self.resolve_dotted(inst, &base, &field);
            inst.node_map.insert(resolved, idx);
            return idx;
        }

        if let Some(pos) = inst.module.inputs.iter().position(|(n, _)| n == &resolved) {
            let idx = if inst.is_top {
                let width = inst.module.inputs[pos].1;
                let idx = self.alloc(width);
                self.nodes.push(FlatNode::Input { out: idx });
                idx
            } else {
                *inst.arg_map.get(&resolved).unwrap_or_else(|| {
                    panic!(
                        "flatten: missing argument binding for input `{resolved}` in module `{}`",
                        inst.module.name
                    )
                })
            };
            inst.node_map.insert(resolved, idx);
            return idx;
        }

        let idx = match inst.module.node_for(&resolved).cloned() {
            Some(node) => self.emit_node(inst, &resolved, &node),
            None => {
                // Dangling: referenced but never produced. Width still
                // recorded (best-effort from the builder's tables); the
                // wire simply reads as 0 forever, nothing writes to it.
                let width = inst.module.width_of(&resolved).unwrap_or(1);
                self.alloc(width)
            }
        };
        inst.node_map.insert(resolved, idx);
        idx
    }

    /// Resolves `base.field`: ensures `base`'s own module instantiation has
    /// happened, then looks up `field`'s wire index among that instance's
    /// recorded outputs.
    fn resolve_dotted(&mut self, inst: &mut Instance<'_>, base: &str, field: &str) -> usize {
        let base_resolved = inst.module.resolve_alias(base).to_string();
        let Some(Node::Module { callee, call_id, .. }) = inst.module.node_for(&base_resolved).cloned() else {
            // `base` isn't a module instance: `.field` has nothing to pick
            // out, so this behaves like any other dangling reference.
            return self.alloc(1);
        };
        // Ensure the instance exists and its outputs are recorded.
        self.wire_index(inst, &base_resolved);
        let outs = self
            .call_outputs
            .get(&call_id)
            .unwrap_or_else(|| panic!("flatten: module instance for call {call_id} never recorded its outputs"));
        // An unknown callee (referenced by name but absent from this flatten's
        // module set) is not a flatten-time error: the field reads as a
        // dangling, always-zero wire, same as an unknown field on a known
        // module.
        let Some(callee_module) = self.compiled.get(&callee) else {
            return self.alloc(1);
        };
        match callee_module.outputs.iter().position(|(n, _)| n == field) {
            Some(pos) => outs[pos],
            // Unknown field on a known module: dangling, width defaults to 1.
            None => self.alloc(1),
        }
    }

    fn emit_node(&mut self, inst: &mut Instance<'_>, name: &str, node: &Node) -> usize {
        match node {
            Node::Input => unreachable!("flatten: Input is handled before emit_node is reached"),
            Node::Const { value, width } => {
                let idx = self.alloc(*width);
                let masked = (*value as u32) & FlatNetlist::mask_for(*width);
                self.nodes.push(FlatNode::Const { out: idx, value: masked, width: *width });
                idx
            }
            Node::Nand { a, b, width } => {
                let ia = self.wire_index(inst, a);
                let ib = self.wire_index(inst, b);
                let idx = self.alloc(*width);
                let mask = FlatNetlist::mask_for(*width);
                self.nodes.push(FlatNode::Nand { a: ia, b: ib, out: idx, mask });
                idx
            }
            Node::Index { v, bit } => {
                let iv = self.wire_index(inst, v);
                let idx = self.alloc(1);
                self.nodes.push(FlatNode::Index { v: iv, out: idx, bit: *bit });
                idx
            }
            Node::Slice { v, lo, hi } => {
                let iv = self.wire_index(inst, v);
                let width = hi - lo + 1;
                let idx = self.alloc(width);
                let mask = FlatNetlist::mask_for(width);
                self.nodes.push(FlatNode::Slice { v: iv, out: idx, lo: *lo, mask });
                idx
            }
            Node::Concat { parts, widths } => {
                let ins: Vec<usize> = parts.iter().map(|p| self.wire_index(inst, p)).collect();
                let total: u32 = widths.iter().sum();
                let idx = self.alloc(total);
                self.nodes.push(FlatNode::Concat { ins, widths: widths.clone(), out: idx });
                idx
            }
            Node::Dff { d, clk } => {
                let id_d = self.wire_index(inst, d);
                let id_clk = self.wire_index(inst, clk);
                let idx = self.alloc(1);
                self.nodes.push(FlatNode::Dff { d: id_d, clk: id_clk, out: idx });
                idx
            }
            Node::Ram { addr, data, write, clk, addr_w } => {
                let id_addr = self.wire_index(inst, addr);
                let id_data = self.wire_index(inst, data);
                let id_write = self.wire_index(inst, write);
                let id_clk = self.wire_index(inst, clk);
                let bank = self.num_rams;
                self.num_rams += 1;
                self.ram_banks.insert(format!("{}{name}", inst.prefix), bank);
                let idx = self.alloc(8);
                self.nodes.push(FlatNode::Ram {
                    addr: id_addr,
                    data: id_data,
                    write: id_write,
                    clk: id_clk,
                    out: idx,
                    addr_w: *addr_w,
                    bank,
                });
                idx
            }
            Node::Rom { addr, addr_w } => {
                let id_addr = self.wire_index(inst, addr);
                let bank = self.num_roms;
                self.num_roms += 1;
                self.rom_banks.insert(format!("{}{name}", inst.prefix), bank);
                let idx = self.alloc(8);
                self.nodes.push(FlatNode::Rom { addr: id_addr, out: idx, addr_w: *addr_w, bank });
                idx
            }
            Node::Module { callee, args, call_id } => self.instantiate_module(inst, callee, args, *call_id),
        }
    }

    fn instantiate_module(&mut self, inst: &mut Instance<'_>, callee: &str, args: &[String], call_id: u64) -> usize {
        if let Some(outs) = self.call_outputs.get(&call_id) {
            return outs[0];
        }

        let arg_indices: Vec<usize> = args.iter().map(|a| self.wire_index(inst, a)).collect();
        let compiled = self.compiled;
        let Some(callee_module) = compiled.get(callee) else {
            // Not a build-time error: a module referenced by name that is
            // absent from this flatten's module set drives its (one known)
            // output wire to a permanent 0, same as any other dangling wire.
            let idx = self.alloc(1);
            self.call_outputs.insert(call_id, vec![idx]);
            return idx;
        };

        if self.active.iter().any(|m| m == callee) {
            panic!("flatten: cyclic module instantiation through `{callee}`");
        }

        if self.lut_enabled {
            if let Some(plan) = self.lut_plan_for(callee) {
                let outs: Vec<usize> = callee_module.outputs.iter().map(|(_, w)| self.alloc(*w)).collect();
                let in_widths: Vec<u32> = callee_module.inputs.iter().map(|(_, w)| *w).collect();
                self.nodes.push(FlatNode::Lut {
                    ins: arg_indices,
                    in_widths,
                    outs: outs.clone(),
                    out_widths: plan.out_widths.clone(),
                    table: plan.table.clone(),
                });
                self.call_outputs.insert(call_id, outs.clone());
                return outs[0];
            }
        }

        let prefix = format!("{}{call_id}.", inst.prefix);
        let mut arg_map = AHashMap::default();
        for (i, (port_name, _)) in callee_module.inputs.iter().enumerate() {
            arg_map.insert(port_name.clone(), arg_indices[i]);
        }
        let mut child = Instance {
            module: callee_module,
            prefix,
            is_top: false,
            arg_map,
            node_map: AHashMap::default(),
        };

        self.active.push(callee.to_string());
        for (name, _) in &callee_module.nodes {
            self.wire_index(&mut child, name);
        }
        let outs: Vec<usize> = callee_module.outputs.iter().map(|(name, _)| self.wire_index(&mut child, name)).collect();
        self.active.pop();

        self.call_outputs.insert(call_id, outs.clone());
        outs[0]
    }

    fn lut_plan_for(&mut self, callee: &str) -> Option<LutPlan> {
        if let Some(cached) = self.lut_cache.get(callee) {
            return cached.clone();
        }
        let plan = self.try_build_lut(callee);
        self.lut_cache.insert(callee.to_string(), plan.clone());
        plan
    }

    fn try_build_lut(&mut self, callee: &str) -> Option<LutPlan> {
        let module = self.compiled.get(callee)?;
        let total_in: u32 = module.inputs.iter().map(|(_, w)| *w).sum();
        let total_out: u32 = module.outputs.iter().map(|(_, w)| *w).sum();
        if total_in == 0 || total_in > MAX_LUT_INPUT_BITS || total_out == 0 || total_out > 32 {
            return None;
        }

        // LUT candidacy is assessed against a throwaway ordinary-inlining
        // flatten of the callee alone, never itself allowed to memoize a
        // nested LUT — that would make eligibility depend on recursion
        // order instead of purely on the callee's own shape.
        let sub = flatten_inner(self.compiled, callee, false).ok()?;
        if sub
            .nodes
            .iter()
            .any(|n| matches!(n, FlatNode::Dff { .. } | FlatNode::Ram { .. } | FlatNode::Rom { .. }))
        {
            return None;
        }
        let primitive_count = sub
            .nodes
            .iter()
            .filter(|n| !matches!(n, FlatNode::Input { .. } | FlatNode::Const { .. }))
            .count();
        if primitive_count < MIN_NODE_COUNT_FOR_LUT {
            return None;
        }

        let levelized = wire_lvl::levelize(sub);
        if levelized.had_cycle {
            return None;
        }

        let out_widths: Vec<u32> = module.outputs.iter().map(|(_, w)| *w).collect();
        let combos = 1usize << total_in;
        let mut table = vec![0u32; combos];
        let mut ev = wire_eval::LevelizedEvaluator::new(levelized);
        for (key, slot) in table.iter_mut().enumerate() {
            ev.reset();
            let mut shift = 0u32;
            for (name, w) in &module.inputs {
                let mask = FlatNetlist::mask_for(*w);
                let v = ((key as u32) >> shift) & mask;
                ev.set_input(name, v);
                shift += w;
            }
            ev.step();
            let mut packed = 0u32;
            let mut shift = 0u32;
            for (name, w) in &module.outputs {
                let mask = FlatNetlist::mask_for(*w);
                packed |= (ev.get_output(name) & mask) << shift;
                shift += w;
            }
            *slot = packed;
        }

        Some(LutPlan { out_widths, table })
    }
}
