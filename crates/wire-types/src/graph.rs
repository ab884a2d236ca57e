//! The per-module compiled form produced by the graph builder: still
//! string-keyed, still hierarchical (`Module` nodes are call sites, not yet
//! inlined), but with primitive arity already validated and aliases already
//! recorded.

use ahash::{AHashMap, AHashSet};

/// Maximum bit width a wire may carry.
pub const MAX_WIDTH: u32 = 32;

/// A node in a per-module compiled graph, keyed by the name of the wire it
/// produces (see [`CompiledModule::nodes`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An external driver; the value is supplied by `set_input`.
    Input,
    /// A literal value of a fixed width.
    Const {
        /// The literal value (masked to `width` bits).
        value: u64,
        /// Resolved width — see the data model's width-inference rule.
        width: u32,
    },
    /// `(~(a & b)) & mask`. Both inputs share `width`.
    Nand {
        /// First operand wire.
        a: String,
        /// Second operand wire.
        b: String,
        /// Shared input/output width.
        width: u32,
    },
    /// `(v >> bit) & 1`.
    Index {
        /// Source wire.
        v: String,
        /// Bit position.
        bit: u32,
    },
    /// `(v >> lo) & mask`, width `hi - lo + 1`.
    Slice {
        /// Source wire.
        v: String,
        /// Low bit, inclusive.
        lo: u32,
        /// High bit, inclusive.
        hi: u32,
    },
    /// Concatenation; `parts[0]` occupies the high bits.
    Concat {
        /// Operand wires, most-significant first.
        parts: Vec<String>,
        /// Per-operand widths, same order as `parts`.
        widths: Vec<u32>,
    },
    /// Width-1 rising-edge D latch.
    Dff {
        /// Data input.
        d: String,
        /// Clock input.
        clk: String,
    },
    /// Synchronous-write, asynchronous-read byte memory.
    Ram {
        /// Address input.
        addr: String,
        /// Write-data input.
        data: String,
        /// Write-enable input.
        write: String,
        /// Clock input.
        clk: String,
        /// Address width, taken from `addr`'s known width.
        addr_w: u32,
    },
    /// Asynchronous-read byte memory, loaded externally.
    Rom {
        /// Address input.
        addr: String,
        /// Address width, taken from `addr`'s known width.
        addr_w: u32,
    },
    /// A pre-flatten module instantiation.
    Module {
        /// Name of the callee module.
        callee: String,
        /// Argument wires, in declared order (maps onto the callee's inputs).
        args: Vec<String>,
        /// Unique id for this call site, used to build the flattener's name
        /// prefix for the inlined instance.
        call_id: u64,
    },
}

/// The compiled form of a single module: ports, the wire→width map, the
/// alias map, and the list of producer nodes.
#[derive(Debug, Clone, Default)]
pub struct CompiledModule {
    /// Module name.
    pub name: String,
    /// Ordered input ports.
    pub inputs: Vec<(String, u32)>,
    /// Ordered output ports.
    pub outputs: Vec<(String, u32)>,
    /// Every non-aliased wire's width, including ports and internal nodes.
    pub widths: AHashMap<String, u32>,
    /// `target -> source` alias entries; `target` has no entry in `widths`.
    pub aliases: AHashMap<String, String>,
    /// Producer nodes in emission order. Every declared input port has an
    /// `Input` entry; everything else is emitted as its statement is lowered.
    pub nodes: Vec<(String, Node)>,
}

impl CompiledModule {
    /// Resolves `name` through the alias chain to its terminal wire name.
    ///
    /// Cycle-safe: aliases are never supposed to cycle (the builder refuses
    /// to create a self-alias), but a malformed chain resolves to the last
    /// name seen rather than looping forever.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        let mut seen: AHashSet<&str> = AHashSet::default();
        while let Some(next) = self.aliases.get(current) {
            if !seen.insert(current) {
                break;
            }
            current = next.as_str();
        }
        current
    }

    /// Looks up the width of `name`, resolving aliases first.
    pub fn width_of(&self, name: &str) -> Option<u32> {
        let resolved = self.resolve_alias(name);
        self.widths.get(resolved).copied()
    }

    /// Finds the node that produces `name` (after alias resolution), if any.
    pub fn node_for(&self, name: &str) -> Option<&Node> {
        let resolved = self.resolve_alias(name);
        self.nodes
            .iter()
            .find(|(wire, _)| wire == resolved)
            .map(|(_, node)| node)
    }
}

/// Per-build-batch context. Hands out unique ids for synthetic wire names
/// (`"<callee>_out_<id>"`) minted for module call results.
///
/// Threaded explicitly through the builder rather than kept as a hidden
/// global counter, so two independent builds never share or contend on it.
#[derive(Debug, Default)]
pub struct BuildCtx {
    next_id: u64,
}

impl BuildCtx {
    /// Starts a fresh context with its counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unique id and advances the counter.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
