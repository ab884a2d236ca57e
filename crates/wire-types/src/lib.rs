//! Shared data types passed between the stages of the Wire compilation and
//! evaluation pipeline: the parsed-module AST consumed from the (excluded)
//! parser, the per-module compiled graph produced by the graph builder, and
//! the flat primitive-only netlist produced by the flattener.

pub mod ast;
pub mod error;
pub mod flat;
pub mod graph;
pub mod primitive;

pub use ast::{Expr, ParsedModule, Statement};
pub use error::BuildError;
pub use flat::{FlatNetlist, FlatNode};
pub use graph::{BuildCtx, CompiledModule, Node, MAX_WIDTH};
pub use primitive::{is_primitive, primitive_arity, Arity};
