//! Reserved primitive names and their fan-in arity.
//!
//! A `Call` whose name is not one of these is either a module instantiation
//! or, if it matches no supplied module either, an [`UnknownPrimitive`]
//! build error (see [`crate::error::BuildError`]).

/// Fan-in arity contract for a reserved primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Exact(usize),
    /// At least this many arguments.
    Min(usize),
}

impl Arity {
    /// Whether `found` arguments satisfies this contract.
    pub fn satisfied_by(&self, found: usize) -> bool {
        match self {
            Arity::Exact(n) => found == *n,
            Arity::Min(n) => found >= *n,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {n}"),
            Arity::Min(n) => write!(f, "at least {n}"),
        }
    }
}

/// Looks up the arity contract for a reserved primitive name.
///
/// Returns `None` if `name` is not reserved, in which case the caller should
/// treat the call as a module instantiation attempt.
pub fn primitive_arity(name: &str) -> Option<Arity> {
    match name {
        "nand" => Some(Arity::Exact(2)),
        "dff" => Some(Arity::Exact(2)),
        "ram" => Some(Arity::Exact(4)),
        "rom" => Some(Arity::Exact(1)),
        "concat" => Some(Arity::Min(2)),
        _ => None,
    }
}

/// Whether `name` names a reserved primitive.
pub fn is_primitive(name: &str) -> bool {
    primitive_arity(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nand_is_exactly_two() {
        assert_eq!(primitive_arity("nand"), Some(Arity::Exact(2)));
        assert!(primitive_arity("nand").unwrap().satisfied_by(2));
        assert!(!primitive_arity("nand").unwrap().satisfied_by(3));
    }

    #[test]
    fn concat_is_at_least_two() {
        let a = primitive_arity("concat").unwrap();
        assert!(!a.satisfied_by(1));
        assert!(a.satisfied_by(2));
        assert!(a.satisfied_by(5));
    }

    #[test]
    fn module_calls_are_not_primitives() {
        assert!(!is_primitive("alu8"));
        assert!(!is_primitive("full_adder"));
    }
}
