//! Graph builder: lowers one [`ParsedModule`] at a time into a
//! [`CompiledModule`] — a per-module graph of typed nodes, a wire→width map,
//! and a target→source alias map. Module-call nodes are left unresolved
//! (that's the flattener's job); only primitive fan-in is validated here.

use ahash::AHashMap;
use wire_types::{
    graph::{BuildCtx, CompiledModule, Node, MAX_WIDTH},
    primitive_arity, BuildError, Expr, ParsedModule,
};

/// Builds every module in `modules` into its compiled graph.
///
/// Fails fast: any one module's `BadArity`/`UnknownPrimitive`/`InvalidWidth`
/// aborts the whole batch, and no partial map is returned.
pub fn build_all(modules: &[ParsedModule]) -> Result<AHashMap<String, CompiledModule>, BuildError> {
    if modules.is_empty() {
        return Err(BuildError::NoModules);
    }

    let lookup: AHashMap<&str, &ParsedModule> =
        modules.iter().map(|m| (m.name.as_str(), m)).collect();

    let mut ctx = BuildCtx::new();
    let mut compiled = AHashMap::default();
    for m in modules {
        let graph = build_module(m, &lookup, &mut ctx)?;
        compiled.insert(m.name.clone(), graph);
    }
    Ok(compiled)
}

/// Lowers a single module. Exposed separately from [`build_all`] so callers
/// that already have a shared [`BuildCtx`] (e.g. the LUT memoization path in
/// the flattener, which builds a throwaway sub-netlist) can reuse it.
pub fn build_module(
    module: &ParsedModule,
    lookup: &AHashMap<&str, &ParsedModule>,
    ctx: &mut BuildCtx,
) -> Result<CompiledModule, BuildError> {
    let mut state = BuilderState {
        module_name: module.name.as_str(),
        lookup,
        ctx,
        widths: AHashMap::default(),
        aliases: AHashMap::default(),
        nodes: Vec::new(),
    };

    for (name, width) in &module.inputs {
        state.widths.insert(name.clone(), *width);
        state.nodes.push((name.clone(), Node::Input));
    }

    for stmt in &module.statements {
        state.process_statement(&stmt.target, &stmt.expr)?;
    }

    Ok(CompiledModule {
        name: module.name.clone(),
        inputs: module.inputs.clone(),
        outputs: module.outputs.clone(),
        widths: state.widths,
        aliases: state.aliases,
        nodes: state.nodes,
    })
}

struct BuilderState<'a> {
    module_name: &'a str,
    lookup: &'a AHashMap<&'a str, &'a ParsedModule>,
    ctx: &'a mut BuildCtx,
    widths: AHashMap<String, u32>,
    aliases: AHashMap<String, String>,
    nodes: Vec<(String, Node)>,
}

impl<'a> BuilderState<'a> {
    fn bad_arity(&self, primitive: &str, expected: wire_types::Arity, found: usize) -> BuildError {
        BuildError::BadArity {
            module: self.module_name.to_string(),
            primitive: primitive.to_string(),
            expected,
            found,
        }
    }

    fn invalid_width(&self, detail: impl Into<String>) -> BuildError {
        BuildError::InvalidWidth {
            module: self.module_name.to_string(),
            detail: detail.into(),
        }
    }

    /// Resolves `name` through the alias chain built so far, returning its
    /// width if registered. Unknown (forward-referenced) names default to
    /// width 1; the flattener corrects this once the real producer is known.
    fn width_of_current(&self, name: &str) -> u32 {
        let mut current = name;
        let mut steps = 0usize;
        while let Some(next) = self.aliases.get(current) {
            steps += 1;
            if steps > self.aliases.len() + 1 {
                break; // malformed cycle guard; aliases are never meant to cycle
            }
            current = next.as_str();
        }
        self.widths.get(current).copied().unwrap_or(1)
    }

    fn fresh_name(&mut self) -> String {
        format!("__t{}", self.ctx.next_id())
    }

    /// Top-level entry point for one `target = expr` statement.
    fn process_statement(&mut self, target: &str, expr: &Expr) -> Result<(), BuildError> {
        match expr {
            Expr::Ident(_) | Expr::Member { .. } => {
                let (resolved, _width) = self.lower_reference(expr)?;
                if resolved != target {
                    self.aliases.insert(target.to_string(), resolved);
                }
                // else: self-alias — never created.
            }
            _ => {
                let (name, _width) = self.lower_producing(expr, Some(target))?;
                if name != target {
                    // Only module calls take this path: they always mint a
                    // synthetic `<callee>_out_<id>` name, and `target`
                    // becomes a plain alias to it.
                    self.aliases.insert(target.to_string(), name);
                }
            }
        }
        Ok(())
    }

    /// Lowers a pure-reference expression (`Ident` or `Member`): never
    /// allocates a node, just computes the wire name the caller should use
    /// and its (possibly forward-ref-defaulted) width.
    ///
    /// Per the spec, the returned name is the *original* identifier (or
    /// freshly-built dotted name), not further alias-resolved — resolution
    /// happens again at read time so later writes to an alias stay visible.
    fn lower_reference(&mut self, expr: &Expr) -> Result<(String, u32), BuildError> {
        match expr {
            Expr::Ident(name) => Ok((name.clone(), self.width_of_current(name))),
            Expr::Member { base, field } => {
                let (base_name, _) = self.lower_reference(base)?;
                let dotted = format!("{base_name}.{field}");
                let width = self.width_of_current(&dotted);
                Ok((dotted, width))
            }
            other => self.lower_producing(other, None),
        }
    }

    /// Lowers an expression that always produces a node: `Const`, a
    /// primitive or module `Call`, `Index`, `Slice`. `preferred_name`, when
    /// given, becomes the node's output wire name (used when the expression
    /// is the direct right-hand side of a statement); otherwise a fresh
    /// synthetic name is minted. Module calls ignore `preferred_name` and
    /// always mint `<callee>_out_<id>`.
    fn lower_producing(
        &mut self,
        expr: &Expr,
        preferred_name: Option<&str>,
    ) -> Result<(String, u32), BuildError> {
        match expr {
            Expr::Ident(_) | Expr::Member { .. } => self.lower_reference(expr),
            Expr::Const(value, width) => {
                let width = match width {
                    Some(w) => *w,
                    None => infer_const_width(*value),
                };
                if width == 0 || width > MAX_WIDTH {
                    return Err(self.invalid_width(format!(
                        "constant {value} needs width {width}, outside 1..={MAX_WIDTH}"
                    )));
                }
                let out = preferred_name.map(String::from).unwrap_or_else(|| self.fresh_name());
                self.widths.insert(out.clone(), width);
                self.nodes.push((
                    out.clone(),
                    Node::Const {
                        value: *value,
                        width,
                    },
                ));
                Ok((out, width))
            }
            Expr::Index { base, index } => {
                let (v, _) = self.lower_reference(base)?;
                let out = preferred_name.map(String::from).unwrap_or_else(|| self.fresh_name());
                self.widths.insert(out.clone(), 1);
                self.nodes.push((out.clone(), Node::Index { v, bit: *index }));
                Ok((out, 1))
            }
            Expr::Slice { base, lo, hi } => {
                if hi < lo {
                    return Err(self.invalid_width(format!("slice [{lo}:{hi}] has hi < lo")));
                }
                let width = hi - lo + 1;
                if width > MAX_WIDTH {
                    return Err(self.invalid_width(format!(
                        "slice [{lo}:{hi}] has width {width} > {MAX_WIDTH}"
                    )));
                }
                let (v, _) = self.lower_reference(base)?;
                let out = preferred_name.map(String::from).unwrap_or_else(|| self.fresh_name());
                self.widths.insert(out.clone(), width);
                self.nodes.push((
                    out.clone(),
                    Node::Slice {
                        v,
                        lo: *lo,
                        hi: *hi,
                    },
                ));
                Ok((out, width))
            }
            Expr::Call { name, args } => self.lower_call(name, args, preferred_name),
        }
    }

    fn lower_call(
        &mut self,
        name: &str,
        args: &[Expr],
        preferred_name: Option<&str>,
    ) -> Result<(String, u32), BuildError> {
        if let Some(arity) = primitive_arity(name) {
            if !arity.satisfied_by(args.len()) {
                return Err(self.bad_arity(name, arity, args.len()));
            }
            return self.lower_primitive(name, args, preferred_name);
        }

        if self.lookup.contains_key(name) {
            return self.lower_module_call(name, args);
        }

        Err(BuildError::UnknownPrimitive {
            module: self.module_name.to_string(),
            name: name.to_string(),
        })
    }

    fn lower_primitive(
        &mut self,
        name: &str,
        args: &[Expr],
        preferred_name: Option<&str>,
    ) -> Result<(String, u32), BuildError> {
        let out = preferred_name.map(String::from).unwrap_or_else(|| self.fresh_name());

        let (node, width) = match name {
            "nand" => {
                let (a, wa) = self.lower_reference(&args[0])?;
                let (b, _wb) = self.lower_reference(&args[1])?;
                (Node::Nand { a, b, width: wa }, wa)
            }
            "dff" => {
                let (d, _) = self.lower_reference(&args[0])?;
                let (clk, _) = self.lower_reference(&args[1])?;
                (Node::Dff { d, clk }, 1)
            }
            "ram" => {
                let (addr, addr_w) = self.lower_reference(&args[0])?;
                let (data, _) = self.lower_reference(&args[1])?;
                let (write, _) = self.lower_reference(&args[2])?;
                let (clk, _) = self.lower_reference(&args[3])?;
                if !(1..=16).contains(&addr_w) {
                    return Err(self.invalid_width(format!(
                        "ram address width {addr_w} outside 1..=16"
                    )));
                }
                (
                    Node::Ram {
                        addr,
                        data,
                        write,
                        clk,
                        addr_w,
                    },
                    8,
                )
            }
            "rom" => {
                let (addr, addr_w) = self.lower_reference(&args[0])?;
                if !(1..=16).contains(&addr_w) {
                    return Err(self.invalid_width(format!(
                        "rom address width {addr_w} outside 1..=16"
                    )));
                }
                (Node::Rom { addr, addr_w }, 8)
            }
            "concat" => {
                let mut parts = Vec::with_capacity(args.len());
                let mut widths = Vec::with_capacity(args.len());
                let mut total = 0u32;
                for a in args {
                    let (w, wd) = self.lower_reference(a)?;
                    total += wd;
                    parts.push(w);
                    widths.push(wd);
                }
                if total == 0 || total > MAX_WIDTH {
                    return Err(self.invalid_width(format!(
                        "concat of widths {widths:?} totals {total}, outside 1..={MAX_WIDTH}"
                    )));
                }
                (Node::Concat { parts, widths }, total)
            }
            _ => unreachable!("lower_primitive called with non-primitive name"),
        };

        self.widths.insert(out.clone(), width);
        self.nodes.push((out.clone(), node));
        Ok((out, width))
    }

    fn lower_module_call(&mut self, callee: &str, args: &[Expr]) -> Result<(String, u32), BuildError> {
        let mut arg_names = Vec::with_capacity(args.len());
        for a in args {
            let (w, _) = self.lower_reference(a)?;
            arg_names.push(w);
        }

        let call_id = self.ctx.next_id();
        let out = format!("{callee}_out_{call_id}");
        let width = self
            .lookup
            .get(callee)
            .and_then(|m| m.outputs.first())
            .map(|(_, w)| *w)
            .unwrap_or(1);

        self.widths.insert(out.clone(), width);
        self.nodes.push((
            out.clone(),
            Node::Module {
                callee: callee.to_string(),
                args: arg_names,
                call_id,
            },
        ));
        Ok((out, width))
    }
}

/// Minimum width holding `value`, clamped to `[1, 32]`.
fn infer_const_width(value: u64) -> u32 {
    if value <= 1 {
        1
    } else {
        (64 - value.leading_zeros()).min(MAX_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire_types::Expr;

    fn lookup_of<'a>(modules: &'a [ParsedModule]) -> AHashMap<&'a str, &'a ParsedModule> {
        modules.iter().map(|m| (m.name.as_str(), m)).collect()
    }

    #[test]
    fn nand_truth_table_module_builds() {
        let m = ParsedModule::new("m")
            .input("a", 1)
            .input("b", 1)
            .output("out", 1)
            .stmt("out", Expr::call("nand", vec![Expr::ident("a"), Expr::ident("b")]));
        let modules = [m];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let g = build_module(&modules[0], &lookup, &mut ctx).unwrap();
        assert!(matches!(
            g.node_for("out"),
            Some(Node::Nand { width: 1, .. })
        ));
    }

    #[test]
    fn wrong_arity_nand_is_rejected() {
        let m = ParsedModule::new("m")
            .input("a", 1)
            .output("out", 1)
            .stmt("out", Expr::call("nand", vec![Expr::ident("a")]));
        let modules = [m];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let err = build_module(&modules[0], &lookup, &mut ctx).unwrap_err();
        assert!(matches!(err, BuildError::BadArity { .. }));
    }

    #[test]
    fn unknown_call_name_is_rejected() {
        let m = ParsedModule::new("m")
            .input("a", 1)
            .output("out", 1)
            .stmt("out", Expr::call("frobnicate", vec![Expr::ident("a")]));
        let modules = [m];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let err = build_module(&modules[0], &lookup, &mut ctx).unwrap_err();
        assert!(matches!(err, BuildError::UnknownPrimitive { .. }));
    }

    #[test]
    fn alias_chain_is_recorded_without_new_wires() {
        let m = ParsedModule::new("m")
            .input("a", 4)
            .output("out", 4)
            .stmt("b", Expr::ident("a"))
            .stmt("out", Expr::ident("b"));
        let modules = [m];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let g = build_module(&modules[0], &lookup, &mut ctx).unwrap();
        assert_eq!(g.aliases.get("b").map(String::as_str), Some("a"));
        assert_eq!(g.aliases.get("out").map(String::as_str), Some("b"));
        assert!(!g.widths.contains_key("b"));
        assert!(!g.widths.contains_key("out"));
        assert_eq!(g.width_of("out"), Some(4));
    }

    #[test]
    fn self_alias_is_never_created() {
        let m = ParsedModule::new("m")
            .input("a", 1)
            .output("a", 1)
            .stmt("a", Expr::ident("a"));
        let modules = [m];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let g = build_module(&modules[0], &lookup, &mut ctx).unwrap();
        assert!(!g.aliases.contains_key("a"));
    }

    #[test]
    fn module_call_mints_synthetic_name_and_aliases_target() {
        let sub = ParsedModule::new("sub").input("x", 1).output("y", 1).stmt(
            "y",
            Expr::call("nand", vec![Expr::ident("x"), Expr::ident("x")]),
        );
        let top = ParsedModule::new("top")
            .input("a", 1)
            .output("o", 1)
            .stmt("inst", Expr::call("sub", vec![Expr::ident("a")]))
            .stmt("o", Expr::ident("inst"));
        let modules = [sub, top];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let g = build_module(&modules[1], &lookup, &mut ctx).unwrap();
        let synth = g.aliases.get("inst").unwrap();
        assert!(synth.starts_with("sub_out_"));
        assert!(matches!(g.node_for("inst"), Some(Node::Module { .. })));
    }

    #[test]
    fn member_access_forward_reference_defaults_to_width_one() {
        let sub = ParsedModule::new("sub")
            .input("x", 1)
            .output("y", 8)
            .stmt("y", Expr::call("concat", vec![Expr::ident("x"); 8]));
        let top = ParsedModule::new("top")
            .input("a", 1)
            .output("o", 1)
            // `alu.y` referenced before `alu` is bound by its call statement.
            .stmt("early", Expr::ident("alu").member("y"))
            .stmt("alu", Expr::call("sub", vec![Expr::ident("a")]))
            .stmt("o", Expr::ident("early").index(0));
        let modules = [sub, top];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let g = build_module(&modules[1], &lookup, &mut ctx).unwrap();
        assert_eq!(g.aliases.get("early").map(String::as_str), Some("alu.y"));
        assert_eq!(g.width_of("early"), Some(1));
    }

    #[test]
    fn const_width_is_inferred_when_not_declared() {
        let m = ParsedModule::new("m")
            .output("out", 8)
            .stmt("out", Expr::konst(200));
        let modules = [m];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let g = build_module(&modules[0], &lookup, &mut ctx).unwrap();
        assert_eq!(g.width_of("out"), Some(8));
    }

    #[test]
    fn concat_over_32_bits_is_invalid_width() {
        let m = ParsedModule::new("m")
            .input("a", 32)
            .input("b", 1)
            .output("out", 33)
            .stmt(
                "out",
                Expr::call("concat", vec![Expr::ident("a"), Expr::ident("b")]),
            );
        let modules = [m];
        let lookup = lookup_of(&modules);
        let mut ctx = BuildCtx::new();
        let err = build_module(&modules[0], &lookup, &mut ctx).unwrap_err();
        assert!(matches!(err, BuildError::InvalidWidth { .. }));
    }

    #[test]
    fn no_modules_is_rejected() {
        let err = build_all(&[]).unwrap_err();
        assert!(matches!(err, BuildError::NoModules));
    }
}
