//! Parsed-module AST consumed by the core pipeline.
//!
//! This is the interface the excluded lexer/parser produces; the core never
//! constructs these from source text, only lowers them. The constructor
//! methods below exist so the core's own tests, demos, and benchmarks can
//! build fixtures without a parser.

/// A module as produced by the (excluded) parser: a name, ordered ports, and
/// an ordered list of `target = expr` statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModule {
    /// Module name, unique within a build batch.
    pub name: String,
    /// Ordered `(name, width)` input ports.
    pub inputs: Vec<(String, u32)>,
    /// Ordered `(name, width)` output ports.
    pub outputs: Vec<(String, u32)>,
    /// Body statements, in source order.
    pub statements: Vec<Statement>,
}

/// One `target = expr` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// The assigned wire name (possibly a previously-declared port).
    pub target: String,
    /// The right-hand-side expression.
    pub expr: Expr,
}

/// A right-hand-side expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A bare identifier, possibly dotted (`alu.result`) — dotted access is
    /// represented as nested [`Expr::Member`], not as a single string.
    Ident(String),
    /// An integer literal. `None` width is inferred (see the data model's
    /// width-inference rule); `Some(w)` pins it explicitly.
    Const(u64, Option<u32>),
    /// A primitive or module call; the builder disambiguates by name.
    Call {
        /// Primitive or module name.
        name: String,
        /// Argument expressions, in declared order.
        args: Vec<Expr>,
    },
    /// `base.field` hierarchical field access.
    Member {
        /// The base expression (usually an `Ident` naming a module instance).
        base: Box<Expr>,
        /// The field name.
        field: String,
    },
    /// `base[n]` single-bit index.
    Index {
        /// The base expression.
        base: Box<Expr>,
        /// Bit position, 0 = least significant.
        index: u32,
    },
    /// `base[lo:hi]` inclusive bit slice.
    Slice {
        /// The base expression.
        base: Box<Expr>,
        /// Low bit, inclusive.
        lo: u32,
        /// High bit, inclusive.
        hi: u32,
    },
}

impl ParsedModule {
    /// Starts a new module with no ports or statements.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Appends an input port. Builder-style: returns `self`.
    pub fn input(mut self, name: impl Into<String>, width: u32) -> Self {
        self.inputs.push((name.into(), width));
        self
    }

    /// Appends an output port. Builder-style: returns `self`.
    pub fn output(mut self, name: impl Into<String>, width: u32) -> Self {
        self.outputs.push((name.into(), width));
        self
    }

    /// Appends a `target = expr` statement. Builder-style: returns `self`.
    pub fn stmt(mut self, target: impl Into<String>, expr: Expr) -> Self {
        self.statements.push(Statement {
            target: target.into(),
            expr,
        });
        self
    }
}

impl Expr {
    /// Shorthand for [`Expr::Ident`].
    pub fn ident(s: impl Into<String>) -> Self {
        Expr::Ident(s.into())
    }

    /// Shorthand for a width-inferred [`Expr::Const`].
    pub fn konst(v: u64) -> Self {
        Expr::Const(v, None)
    }

    /// Shorthand for an explicitly-widthed [`Expr::Const`].
    pub fn konst_w(v: u64, w: u32) -> Self {
        Expr::Const(v, Some(w))
    }

    /// Shorthand for [`Expr::Call`].
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    /// Chains a `.field` member access onto this expression.
    pub fn member(self, field: impl Into<String>) -> Self {
        Expr::Member {
            base: Box::new(self),
            field: field.into(),
        }
    }

    /// Chains a `[index]` access onto this expression.
    pub fn index(self, index: u32) -> Self {
        Expr::Index {
            base: Box::new(self),
            index,
        }
    }

    /// Chains a `[lo:hi]` slice onto this expression.
    pub fn slice(self, lo: u32, hi: u32) -> Self {
        Expr::Slice {
            base: Box::new(self),
            lo,
            hi,
        }
    }
}
