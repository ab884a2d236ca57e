//! Simulator façade: ties the build → flatten → levelize → evaluate pipeline
//! together behind one handle. This is the surface external drivers (a CLI,
//! a test harness, the excluded UI) are meant to hold — everything else in
//! the workspace is an implementation detail of how `Simulator::build`
//! produces one.

use ahash::AHashMap;
use wire_eval::{CompiledEvaluator, Evaluator, GraphInterpreter, LevelizedEvaluator};
use wire_types::{BuildError, ParsedModule};

/// Which [`Evaluator`] implementation a [`Simulator`] is backed by. Chosen at
/// construction time; never switched at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// [`GraphInterpreter`]: naive fixed-point sweep, the correctness baseline.
    Interpreter,
    /// [`LevelizedEvaluator`]: precomputed topological order. Default.
    #[default]
    Levelized,
    /// [`CompiledEvaluator`]: the combinational pass precompiled into closures.
    Compiled,
}

/// One of the three interchangeable evaluator backends, boxed behind the
/// shared [`Evaluator`] trait. Strategy selection happens once, in
/// [`Simulator::build_with_strategy`]; `step`/`set_input`/etc. never branch
/// on which variant is live.
#[derive(Debug)]
enum Backend {
    Interpreter(GraphInterpreter),
    Levelized(LevelizedEvaluator),
    Compiled(CompiledEvaluator),
}

impl Evaluator for Backend {
    fn set_input(&mut self, name: &str, value: u32) {
        match self {
            Backend::Interpreter(e) => e.set_input(name, value),
            Backend::Levelized(e) => e.set_input(name, value),
            Backend::Compiled(e) => e.set_input(name, value),
        }
    }

    fn get_output(&self, name: &str) -> u32 {
        match self {
            Backend::Interpreter(e) => e.get_output(name),
            Backend::Levelized(e) => e.get_output(name),
            Backend::Compiled(e) => e.get_output(name),
        }
    }

    fn get_wire(&self, probe: &str) -> u32 {
        match self {
            Backend::Interpreter(e) => e.get_wire(probe),
            Backend::Levelized(e) => e.get_wire(probe),
            Backend::Compiled(e) => e.get_wire(probe),
        }
    }

    fn step(&mut self) {
        match self {
            Backend::Interpreter(e) => e.step(),
            Backend::Levelized(e) => e.step(),
            Backend::Compiled(e) => e.step(),
        }
    }

    fn reset(&mut self) {
        match self {
            Backend::Interpreter(e) => e.reset(),
            Backend::Levelized(e) => e.reset(),
            Backend::Compiled(e) => e.reset(),
        }
    }

    fn load_rom(&mut self, data: &[u8], node_id: Option<&str>) {
        match self {
            Backend::Interpreter(e) => e.load_rom(data, node_id),
            Backend::Levelized(e) => e.load_rom(data, node_id),
            Backend::Compiled(e) => e.load_rom(data, node_id),
        }
    }

    fn read_ram(&self, addr: u32, node_id: Option<&str>) -> u8 {
        match self {
            Backend::Interpreter(e) => e.read_ram(addr, node_id),
            Backend::Levelized(e) => e.read_ram(addr, node_id),
            Backend::Compiled(e) => e.read_ram(addr, node_id),
        }
    }

    fn write_ram(&mut self, addr: u32, value: u8, node_id: Option<&str>) {
        match self {
            Backend::Interpreter(e) => e.write_ram(addr, value, node_id),
            Backend::Levelized(e) => e.write_ram(addr, value, node_id),
            Backend::Compiled(e) => e.write_ram(addr, value, node_id),
        }
    }

    fn get_all_wires(&self) -> AHashMap<String, u32> {
        match self {
            Backend::Interpreter(e) => e.get_all_wires(),
            Backend::Levelized(e) => e.get_all_wires(),
            Backend::Compiled(e) => e.get_all_wires(),
        }
    }
}

/// A compiled, runnable Wire circuit. Owns its evaluator backend; cheap to
/// construct repeatedly (e.g. once per test case) since `build` does the
/// full build → flatten → levelize pipeline internally.
#[derive(Debug)]
pub struct Simulator {
    backend: Backend,
}

impl Simulator {
    /// Builds `top` (or the last module in `modules` if `top` is `None`)
    /// using the default strategy ([`Strategy::Levelized`]).
    pub fn build(modules: &[ParsedModule], top: Option<&str>) -> Result<Self, BuildError> {
        Self::build_with_strategy(modules, top, Strategy::default())
    }

    /// Builds with an explicit evaluator strategy.
    pub fn build_with_strategy(
        modules: &[ParsedModule],
        top: Option<&str>,
        strategy: Strategy,
    ) -> Result<Self, BuildError> {
        if modules.is_empty() {
            return Err(BuildError::NoModules);
        }
        let compiled = wire_build::build_all(modules)?;
        let top_name = match top {
            Some(name) => name,
            None => modules.last().map(|m| m.name.as_str()).unwrap_or_default(),
        };
        let netlist = wire_flatten::flatten(&compiled, top_name)?;
        let levelized = wire_lvl::levelize(netlist);
        let backend = match strategy {
            Strategy::Interpreter => Backend::Interpreter(GraphInterpreter::new(levelized)),
            Strategy::Levelized => Backend::Levelized(LevelizedEvaluator::new(levelized)),
            Strategy::Compiled => Backend::Compiled(CompiledEvaluator::new(levelized)),
        };
        Ok(Self { backend })
    }

    /// Writes `value` (masked to the wire's declared width) to the named
    /// input. Silently ignored if `name` is not a known input.
    pub fn set_input(&mut self, name: &str, value: u32) {
        self.backend.set_input(name, value);
    }

    /// Reads the named top-level output. `0` if `name` is unknown.
    pub fn get_output(&self, name: &str) -> u32 {
        self.backend.get_output(name)
    }

    /// Reads any named wire, or a `name[i]` / `name[lo:hi]` probe of it.
    pub fn get_wire(&self, probe: &str) -> u32 {
        self.backend.get_wire(probe)
    }

    /// Advances the simulation by one logical clock step.
    pub fn step(&mut self) {
        self.backend.step();
    }

    /// Runs `n` successive steps.
    pub fn run(&mut self, n: usize) {
        self.backend.run(n);
    }

    /// Zeroes wire values, DFF/RAM state, and RAM storage. ROM is untouched.
    pub fn reset(&mut self) {
        self.backend.reset();
    }

    /// Loads ROM contents. `node_id` names a specific `rom(...)` call site
    /// (by its target wire name, or a `prefix.name` path for nested ones);
    /// `None` loads every ROM bank.
    pub fn load_rom(&mut self, data: &[u8], node_id: Option<&str>) {
        self.backend.load_rom(data, node_id);
    }

    /// Reads one byte from the named RAM (or the first bank if `node_id` is
    /// `None`). Out-of-range addresses read `0`.
    pub fn read_ram(&self, addr: u32, node_id: Option<&str>) -> u8 {
        self.backend.read_ram(addr, node_id)
    }

    /// Writes one byte to the named RAM (or the first bank if `node_id` is
    /// `None`). Out-of-range addresses are silently dropped.
    pub fn write_ram(&mut self, addr: u32, value: u8, node_id: Option<&str>) {
        self.backend.write_ram(addr, value, node_id);
    }

    /// Snapshots every named wire reachable from the top module.
    pub fn get_all_wires(&self) -> AHashMap<String, u32> {
        self.backend.get_all_wires()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire_types::Expr;

    fn half_adder() -> ParsedModule {
        ParsedModule::new("half_adder")
            .input("a", 1)
            .input("b", 1)
            .output("sum", 1)
            .output("carry", 1)
            .stmt("n1", Expr::call("nand", vec![Expr::ident("a"), Expr::ident("b")]))
            .stmt("n2", Expr::call("nand", vec![Expr::ident("a"), Expr::ident("n1")]))
            .stmt("n3", Expr::call("nand", vec![Expr::ident("b"), Expr::ident("n1")]))
            .stmt("sum", Expr::call("nand", vec![Expr::ident("n2"), Expr::ident("n3")]))
            .stmt("carry", Expr::call("nand", vec![Expr::ident("n1"), Expr::ident("n1")]))
    }

    #[test]
    fn half_adder_truth_table_holds_for_every_strategy() {
        for strategy in [Strategy::Interpreter, Strategy::Levelized, Strategy::Compiled] {
            let cases = [(0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 1, 0), (1, 1, 0, 1)];
            for (a, b, expected_sum, expected_carry) in cases {
                let modules = [half_adder()];
                let mut sim = Simulator::build_with_strategy(&modules, None, strategy).unwrap();
                sim.set_input("a", a);
                sim.set_input("b", b);
                sim.step();
                assert_eq!(sim.get_output("sum"), expected_sum, "sum mismatch under {strategy:?}");
                assert_eq!(sim.get_output("carry"), expected_carry, "carry mismatch under {strategy:?}");
            }
        }
    }

    #[test]
    fn top_defaults_to_last_module_when_omitted() {
        let sub = ParsedModule::new("helper").output("z", 1).stmt("z", Expr::konst_w(1, 1));
        let top = ParsedModule::new("main").output("o", 1).stmt("o", Expr::konst_w(0, 1));
        let modules = [sub, top];
        let sim = Simulator::build(&modules, None).unwrap();
        assert_eq!(sim.get_output("o"), 0);
    }

    #[test]
    fn empty_module_list_is_rejected() {
        let err = Simulator::build(&[], None).unwrap_err();
        assert!(matches!(err, BuildError::NoModules));
    }

    #[test]
    fn dff_holds_value_until_the_next_rising_edge() {
        let m = ParsedModule::new("latch")
            .input("d", 1)
            .input("clk", 1)
            .output("q", 1)
            .stmt("q", Expr::call("dff", vec![Expr::ident("d"), Expr::ident("clk")]));
        let modules = [m];
        let mut sim = Simulator::build(&modules, None).unwrap();
        sim.set_input("d", 1);
        sim.set_input("clk", 0);
        sim.step();
        assert_eq!(sim.get_output("q"), 0);
        sim.set_input("clk", 1);
        sim.step();
        assert_eq!(sim.get_output("q"), 1);
        sim.set_input("d", 0);
        sim.step(); // clk stays 1: no rising edge, q must hold
        assert_eq!(sim.get_output("q"), 1);
    }

    #[test]
    fn reset_zeroes_state_but_preserves_rom_contents() {
        let m = ParsedModule::new("rom_reader")
            .input("addr", 2)
            .output("data", 8)
            .stmt("data", Expr::call("rom", vec![Expr::ident("addr")]));
        let modules = [m];
        let mut sim = Simulator::build(&modules, None).unwrap();
        sim.load_rom(&[10, 20, 30, 40], None);
        sim.set_input("addr", 1);
        sim.step();
        assert_eq!(sim.get_output("data"), 20);
        sim.reset();
        sim.set_input("addr", 1);
        sim.step();
        assert_eq!(sim.get_output("data"), 20);
    }

    #[test]
    fn ram_write_then_read_round_trips() {
        let m = ParsedModule::new("ram_cell")
            .input("addr", 2)
            .input("data", 8)
            .input("write", 1)
            .input("clk", 1)
            .output("out", 8)
            .stmt("out", Expr::call("ram", vec![
                Expr::ident("addr"),
                Expr::ident("data"),
                Expr::ident("write"),
                Expr::ident("clk"),
            ]));
        let modules = [m];
        let mut sim = Simulator::build(&modules, None).unwrap();
        sim.set_input("addr", 2);
        sim.set_input("data", 99);
        sim.set_input("write", 1);
        sim.set_input("clk", 0);
        sim.step();
        sim.set_input("clk", 1);
        sim.step();
        assert_eq!(sim.read_ram(2, None), 99);
        sim.set_input("write", 0);
        sim.set_input("clk", 0);
        sim.step();
        sim.set_input("clk", 1);
        sim.step();
        assert_eq!(sim.get_output("out"), 99);
    }

    #[test]
    fn out_of_range_ram_access_is_silently_ignored() {
        let m = ParsedModule::new("small_ram")
            .input("addr", 1)
            .input("data", 8)
            .input("write", 1)
            .input("clk", 1)
            .output("out", 8)
            .stmt("out", Expr::call("ram", vec![
                Expr::ident("addr"),
                Expr::ident("data"),
                Expr::ident("write"),
                Expr::ident("clk"),
            ]));
        let modules = [m];
        let mut sim = Simulator::build(&modules, None).unwrap();
        sim.write_ram(200, 5, None);
        assert_eq!(sim.read_ram(200, None), 0);
    }

    #[test]
    fn unknown_wire_name_reads_zero() {
        let m = ParsedModule::new("m").output("o", 1).stmt("o", Expr::konst_w(1, 1));
        let modules = [m];
        let sim = Simulator::build(&modules, None).unwrap();
        assert_eq!(sim.get_wire("nonexistent"), 0);
        assert_eq!(sim.get_output("nonexistent"), 0);
    }
}
