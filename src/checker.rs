//! The per-clause checking engine: for each expansion clause, find a
//! candidate QBF clause, verify the existential-literal correspondence, then
//! verify the universal annotation.

use crate::clause::Clause;
use crate::expansion::{Expansion, ExpansionParseError};
use crate::literal::Lit;
use crate::qbf::Qbf;
use crate::quantifier::QuantKind;
use crate::result::{FailureKind, VerificationResult};
use crate::sort::SortStack;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Expansion(#[from] ExpansionParseError),

    #[error(
        "origin index {index} for expansion clause {clause_index} is out of bounds for a matrix of {matrix_len} clause(s)"
    )]
    OriginOutOfBounds { index: usize, clause_index: usize, matrix_len: usize },
}

/// Owns the transient storage reused across every expansion clause in one
/// verification run: the `U`/`V` literal sets and quicksort stacks, reused
/// for performance across the whole run.
#[derive(Debug, Default)]
pub struct Checker {
    clause_sort: SortStack,
    order_sort: SortStack,
    order_buf: Vec<Lit>,
    u: Vec<Lit>,
    v: Vec<Lit>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks every expansion clause yielded by `expansion` against `qbf`,
    /// in input order, and returns the aggregated result.
    pub fn check(
        &mut self,
        qbf: &Qbf,
        expansion: &mut Expansion,
    ) -> Result<VerificationResult, CheckError> {
        let mut result = VerificationResult::default();
        let mut index = 0usize;
        while let Some(mut exp_clause) = expansion.next_clause()? {
            self.clause_sort.sort_by_key(exp_clause.lits_mut(), |&lit| lit.as_repr());
            self.check_one(qbf, expansion, &exp_clause, index, &mut result)?;
            index += 1;
        }
        Ok(result)
    }

    fn check_one(
        &mut self,
        qbf: &Qbf,
        expansion: &mut Expansion,
        exp_clause: &Clause,
        index: usize,
        result: &mut VerificationResult,
    ) -> Result<(), CheckError> {
        if let Some(origins) = expansion.clause_origins() {
            if index < origins.len() {
                let candidate_idx = origins[index];
                let matrix_len = qbf.matrix().len();
                if candidate_idx >= matrix_len {
                    return Err(CheckError::OriginOutOfBounds {
                        index: candidate_idx,
                        clause_index: index,
                        matrix_len,
                    });
                }
                // Origin is trusted: no fallback to other candidates even if
                // this one fails, by design.
                let candidate = &qbf.matrix()[candidate_idx];
                if self.existential_test(qbf, expansion, candidate, exp_clause) {
                    if self.annotation_test(qbf, expansion, candidate, exp_clause) {
                        return Ok(());
                    }
                    result.record(FailureKind::IncorrectAnnotation, index);
                } else {
                    result.record(FailureKind::IncorrectLiterals, index);
                }
                return Ok(());
            }
            tracing::warn!(
                clause_index = index,
                "origin map is shorter than the expansion clause stream; falling back to iterative candidate search"
            );
            expansion.discard_clause_origins();
        }
        self.check_iterative(qbf, expansion, exp_clause, index, result);
        Ok(())
    }

    fn check_iterative(
        &mut self,
        qbf: &Qbf,
        expansion: &mut Expansion,
        exp_clause: &Clause,
        index: usize,
        result: &mut VerificationResult,
    ) {
        let mut any_existential_match = false;
        for index in 0..qbf.matrix().len() {
            let candidate = &qbf.matrix()[index];
            if self.existential_test(qbf, expansion, candidate, exp_clause) {
                any_existential_match = true;
                if self.annotation_test(qbf, expansion, candidate, exp_clause) {
                    return;
                }
            }
        }
        if any_existential_match {
            result.record(FailureKind::IncorrectAnnotation, index);
        } else {
            result.record(FailureKind::IncorrectLiterals, index);
        }
    }

    /// `E` matches `Q` iff every expansion literal's mapped QBF
    /// literal occurs in `Q`, and `|E|` equals the number of existential (or
    /// free) literals in `Q` — no unmapped existential may remain.
    fn existential_test(
        &self,
        qbf: &Qbf,
        expansion: &mut Expansion,
        candidate: &Clause,
        exp_clause: &Clause,
    ) -> bool {
        for &e in exp_clause.lits() {
            let mapping = expansion.mapping(e.var());
            let q = Lit::encode(mapping.qbf_var(), e.is_negative());
            if !candidate.lits().contains(&q) {
                return false;
            }
        }
        let k = candidate
            .lits()
            .iter()
            .filter(|lit| qbf.prefix().is_existential_or_free(lit.var()))
            .count();
        exp_clause.len() == k
    }

    /// Walks the QBF prefix left to right, tracking universal
    /// literals that occur in `candidate` (`U`, negated relative to
    /// `candidate`) and those that don't (`V`, both polarities), and checks
    /// each expansion literal's annotation against them.
    fn annotation_test(
        &mut self,
        qbf: &Qbf,
        expansion: &mut Expansion,
        candidate: &Clause,
        exp_clause: &Clause,
    ) -> bool {
        let prefix = qbf.prefix();

        self.order_buf.clear();
        self.order_buf.extend(exp_clause.lits());
        let order_keys: Vec<usize> = self
            .order_buf
            .iter()
            .map(|&e| prefix.ordering_of(expansion.mapping(e.var()).qbf_var()))
            .collect();
        let mut keyed: Vec<(usize, Lit)> =
            order_keys.into_iter().zip(self.order_buf.iter().copied()).collect();
        self.order_sort.sort_by_key(&mut keyed, |&(ord, _)| ord);

        self.u.clear();
        self.v.clear();
        let mut universals_seen: usize = 0;
        let mut last_q_idx: usize = 0;

        for &(_, e) in &keyed {
            let mapping = expansion.mapping(e.var());
            let qbf_var = mapping.qbf_var();
            let q_idx = prefix.ordering_of(qbf_var);

            for block in &prefix.blocks()[last_q_idx.min(prefix.blocks().len())..q_idx.min(prefix.blocks().len())]
            {
                if block.kind != QuantKind::Universal {
                    continue;
                }
                for &uvar in &block.variables {
                    universals_seen += 1;
                    if let Some(&lit) = candidate.lits().iter().find(|l| l.var() == uvar) {
                        insert_sorted(&mut self.u, !lit);
                    } else {
                        insert_sorted(&mut self.v, uvar.positive());
                        insert_sorted(&mut self.v, uvar.negative());
                    }
                }
            }

            if mapping.annotation().len() != universals_seen {
                return false;
            }
            for &a in mapping.annotation() {
                if !contains_sorted(&self.v, a) && !contains_sorted(&self.u, a) {
                    return false;
                }
            }
            for &a in mapping.annotation() {
                remove_sorted(&mut self.v, !a);
            }

            last_q_idx = q_idx;
        }
        true
    }
}

fn insert_sorted(set: &mut Vec<Lit>, lit: Lit) {
    if let Err(pos) = set.binary_search(&lit) {
        set.insert(pos, lit);
    }
}

fn contains_sorted(set: &[Lit], lit: Lit) -> bool {
    set.binary_search(&lit).is_ok()
}

fn remove_sorted(set: &mut Vec<Lit>, lit: Lit) {
    if let Ok(pos) = set.binary_search(&lit) {
        set.remove(pos);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::qbf;
    use crate::ParserOptions;
    use std::io::Cursor;

    fn check(qbf_src: &str, exp_src: &str) -> VerificationResult {
        let qbf =
            qbf::parse(Cursor::new(qbf_src.as_bytes().to_vec()), &ParserOptions::default()).unwrap();
        let mut expansion =
            Expansion::open(Cursor::new(exp_src.as_bytes().to_vec()), ParserOptions::default())
                .unwrap();
        Checker::new().check(&qbf, &mut expansion).unwrap()
    }

    #[test]
    fn empty_formula_is_verified() {
        let result = check("p cnf 0 0\n", "p cnf 0 0\n");
        assert!(result.is_valid());
    }

    #[test]
    fn scenario_2_simple_expansion_is_verified() {
        // a x1; e x2 x3. (x1 | x2 | x3)
        let result = check(
            "p cnf 3 1\na 1 0\ne 2 3 0\n1 2 3 0\n",
            "p cnf 2 1\nc x 1 2 0 2 3 0 -1 0\nc o 1 0\n1 2 0\n",
        );
        assert!(result.is_valid(), "{:?}", result.failures());
    }

    #[test]
    fn scenario_3_wrong_polarity_annotation_fails() {
        let result = check(
            "p cnf 3 1\na 1 0\ne 2 3 0\n1 2 3 0\n",
            "p cnf 2 1\nc x 1 2 0 2 3 0 1 -1 0\nc o 1 0\n1 2 0\n",
        );
        assert!(!result.is_valid());
        assert_eq!(result.failures()[0].kind, FailureKind::IncorrectAnnotation);
    }

    #[test]
    fn extra_existential_literal_is_incorrect_literals() {
        // Q has an existential literal (x3) with no counterpart in E.
        let result = check(
            "p cnf 3 1\na 1 0\ne 2 3 0\n2 3 0\n",
            "p cnf 1 1\nc x 1 0 2 0 0\nc o 1 0\n1 0\n",
        );
        assert!(!result.is_valid());
        assert_eq!(result.failures()[0].kind, FailureKind::IncorrectLiterals);
    }

    #[test]
    fn origin_out_of_bounds_is_fatal() {
        let qbf =
            qbf::parse(Cursor::new(b"p cnf 1 1\n1 0\n".to_vec()), &ParserOptions::default()).unwrap();
        let mut expansion = Expansion::open(
            Cursor::new(b"p cnf 1 1\nc o 5 0\n1 0\n".to_vec()),
            ParserOptions::default(),
        )
        .unwrap();
        let err = Checker::new().check(&qbf, &mut expansion).unwrap_err();
        assert!(matches!(err, CheckError::OriginOutOfBounds { .. }));
    }

    #[test]
    fn toggling_origin_presence_preserves_verdict() {
        let with_origin = check(
            "p cnf 3 1\na 1 0\ne 2 3 0\n1 2 3 0\n",
            "p cnf 2 1\nc x 1 2 0 2 3 0 -1 0\nc o 1 0\n1 2 0\n",
        );
        let without_origin = check(
            "p cnf 3 1\na 1 0\ne 2 3 0\n1 2 3 0\n",
            "p cnf 2 1\nc x 1 2 0 2 3 0 -1 0\n1 2 0\n",
        );
        assert!(with_origin.is_valid());
        assert_eq!(with_origin.is_valid(), without_origin.is_valid());
    }
}
