//! Quantifier prefix: alternating blocks of existentially/universally bound
//! variables, plus a direct-addressed index from variable to binding block.

use crate::datastructure::VarVec;
use crate::literal::Var;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantKind {
    Existential,
    Universal,
}

impl std::fmt::Display for QuantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuantKind::Existential => write!(f, "e"),
            QuantKind::Universal => write!(f, "a"),
        }
    }
}

/// A single `e`/`a` block: its kind, its 0-based position within the prefix
/// sequence (`ord`), and the variables it binds.
#[derive(Debug, Clone)]
pub struct Quantifier {
    pub kind: QuantKind,
    pub ord: usize,
    pub variables: Vec<Var>,
}

impl std::fmt::Display for Quantifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        for &var in &self.variables {
            write!(f, " {var}")?;
        }
        write!(f, " 0")
    }
}

/// The quantifier prefix of a QBF: an ordered sequence of [`Quantifier`]
/// blocks plus a direct-addressed lookup from variable to binding block.
/// Free variables (absent from `index`) are treated as existential, at
/// ordering position 0.
#[derive(Debug, Clone, Default)]
pub struct Prefix {
    blocks: Vec<Quantifier>,
    index: VarVec<Option<usize>>,
    num_alternations: u32,
}

impl Prefix {
    pub fn blocks(&self) -> &[Quantifier] {
        &self.blocks
    }

    pub fn num_alternations(&self) -> u32 {
        self.num_alternations
    }

    /// Returns the block binding `var`, or `None` if `var` is free.
    pub fn quantifier_of(&self, var: Var) -> Option<&Quantifier> {
        self.index.get(var).copied().flatten().map(|idx| &self.blocks[idx])
    }

    /// The ordering index used by the checker: the binding block's `ord`, or
    /// `0` for a free variable.
    pub fn ordering_of(&self, var: Var) -> usize {
        self.quantifier_of(var).map_or(0, |q| q.ord)
    }

    pub fn is_universal(&self, var: Var) -> bool {
        matches!(self.quantifier_of(var), Some(Quantifier { kind: QuantKind::Universal, .. }))
    }

    /// True for existentially-quantified variables *and* free variables,
    /// matching the "free ⇒ existential@0" convention.
    pub fn is_existential_or_free(&self, var: Var) -> bool {
        !self.is_universal(var)
    }

    /// Appends a new block of deduplicated variables to the prefix, wiring
    /// up the variable index and the alternation count. Returns the number
    /// of variables dropped because they were already bound elsewhere in
    /// the prefix (the caller is expected to warn about these).
    pub(crate) fn push_block(&mut self, kind: QuantKind, vars: &[Var]) -> usize {
        let mut deduped = Vec::with_capacity(vars.len());
        let mut dropped = 0;
        for &var in vars {
            self.index.ensure(var);
            if self.index[var].is_some() {
                dropped += 1;
                continue;
            }
            deduped.push(var);
        }
        if deduped.is_empty() {
            return dropped;
        }
        let ord = self.blocks.len();
        if let Some(last) = self.blocks.last() {
            if last.kind != kind {
                self.num_alternations += 1;
            }
        }
        for &var in &deduped {
            self.index[var] = Some(ord);
        }
        self.blocks.push(Quantifier { kind, ord, variables: deduped });
        dropped
    }

    /// True if the previous block (if any) has the same kind as `kind`,
    /// i.e. appending another block of `kind` would *not* count as an
    /// alternation and should trigger the "consecutive same-kind block"
    /// warning.
    pub(crate) fn repeats_last_kind(&self, kind: QuantKind) -> bool {
        self.blocks.last().is_some_and(|last| last.kind == kind)
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn free_variable_is_existential_at_zero() {
        let prefix = Prefix::default();
        let free = Var::from_dimacs(7);
        assert_eq!(prefix.ordering_of(free), 0);
        assert!(prefix.is_existential_or_free(free));
    }

    #[test]
    fn duplicate_variable_is_dropped() {
        let mut prefix = Prefix::default();
        let v1 = Var::from_dimacs(1);
        let v2 = Var::from_dimacs(2);
        prefix.push_block(QuantKind::Universal, &[v1, v2]);
        let dropped = prefix.push_block(QuantKind::Existential, &[v2, Var::from_dimacs(3)]);
        assert_eq!(dropped, 1);
        assert!(prefix.is_universal(v2));
    }

    #[test]
    fn alternation_count() {
        let mut prefix = Prefix::default();
        prefix.push_block(QuantKind::Universal, &[Var::from_dimacs(1)]);
        prefix.push_block(QuantKind::Existential, &[Var::from_dimacs(2)]);
        prefix.push_block(QuantKind::Universal, &[Var::from_dimacs(3)]);
        assert_eq!(prefix.num_alternations(), 2);
    }
}
