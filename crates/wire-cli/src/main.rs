//! A small trace-dump CLI over the fixtures in `wire-demos`: build one,
//! drive its clock for a number of cycles, and print every declared output
//! after each cycle. Not a replacement for the (excluded) text-format
//! front end — just a convenient way to poke at a fixture from a shell.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use wire_demos::{alu8, dff_latch, lda_sta_hlt_program, nand_gate, program_counter, ripple_adder, tiny_cpu};
use wire_sim::{Simulator, Strategy};

#[derive(Parser)]
#[command(name = "wire")]
#[command(about = "Run one of the wire-demos fixtures and print its cycle-by-cycle trace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a fixture for a number of clock cycles and print its outputs.
    Run {
        /// Which fixture to build.
        #[arg(value_enum)]
        circuit: Circuit,

        /// Number of clock cycles to run.
        #[arg(short, long, default_value_t = 4)]
        cycles: usize,

        /// Which evaluator strategy to run it with.
        #[arg(short, long, value_enum, default_value_t = StrategyArg::Levelized)]
        strategy: StrategyArg,

        /// Set an input before the first cycle, as `name=value` (decimal or
        /// `0x`-prefixed hex). May be given more than once.
        #[arg(long = "set", value_parser = parse_key_val, num_args = 0..)]
        set: Vec<(String, u32)>,
    },
    /// List the fixtures `run` understands.
    List,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Circuit {
    Nand,
    Dff,
    Adder8,
    Adder16,
    Alu8,
    Pc,
    Cpu,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Interpreter,
    Levelized,
    Compiled,
}

impl From<StrategyArg> for Strategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::Interpreter => Strategy::Interpreter,
            StrategyArg::Levelized => Strategy::Levelized,
            StrategyArg::Compiled => Strategy::Compiled,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, u32), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected `name=value`, found `{s}`"))?;
    let value = if let Some(hex) = value.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).map_err(|e| e.to_string())?
    } else {
        value.parse::<u32>().map_err(|e| e.to_string())?
    };
    Ok((name.to_string(), value))
}

/// A fixture's module list, its top module's name, and the output port
/// names worth printing every cycle.
fn fixture(circuit: Circuit) -> (Vec<wire_types::ParsedModule>, &'static str, Vec<&'static str>) {
    match circuit {
        Circuit::Nand => (nand_gate(), "nand_gate", vec!["out"]),
        Circuit::Dff => (dff_latch(), "dff_latch", vec!["q"]),
        Circuit::Adder8 => (ripple_adder(8), "adder8", vec!["sum", "cout"]),
        Circuit::Adder16 => (ripple_adder(16), "adder16", vec!["sum", "cout"]),
        Circuit::Alu8 => (alu8(), "alu8", vec!["result", "z", "n", "c", "v"]),
        Circuit::Pc => (program_counter(), "pc", vec!["pc"]),
        Circuit::Cpu => (
            tiny_cpu(),
            "tiny_cpu",
            vec!["halted", "pc", "acc", "write_enable", "write_addr", "write_data"],
        ),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::List => {
            for c in Circuit::value_variants() {
                println!("{}", c.to_possible_value().unwrap().get_name());
            }
        }
        Commands::Run { circuit, cycles, strategy, set } => {
            let (modules, top, outputs) = fixture(circuit);
            let mut sim = Simulator::build_with_strategy(&modules, Some(top), strategy.into())
                .with_context(|| format!("failed to build `{top}`"))?;

            if matches!(circuit, Circuit::Cpu) {
                sim.load_rom(&lda_sta_hlt_program(), None);
            }
            for (name, value) in &set {
                sim.set_input(name, *value);
            }

            for cycle in 0..cycles {
                sim.set_input("clk", 0);
                sim.step();
                sim.set_input("clk", 1);
                sim.step();
                let trace: Vec<String> =
                    outputs.iter().map(|o| format!("{o}={}", sim.get_output(o))).collect();
                println!("cycle {cycle}: {}", trace.join(" "));
            }
        }
    }
    Ok(())
}
