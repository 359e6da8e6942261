//! The result aggregator: an ordered list of typed, per-clause failures
//! plus the stdout formatting.

use std::fmt::Write as _;

/// The two ways an expansion clause can fail to check out against the QBF
/// matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No candidate QBF clause has an existential-literal correspondence
    /// with this expansion clause.
    IncorrectLiterals,
    /// Some candidate matched existentially, but none had admissible
    /// universal-literal annotations.
    IncorrectAnnotation,
}

impl FailureKind {
    fn description(self) -> &'static str {
        match self {
            FailureKind::IncorrectLiterals => {
                "no QBF clause matches the expansion clause's existential literals"
            }
            FailureKind::IncorrectAnnotation => {
                "the expansion clause's annotations are not admissible for any matching QBF clause"
            }
        }
    }
}

/// One recorded failure: its kind, and the 0-based index of the offending
/// expansion clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub expansion_clause_index: usize,
}

/// The ordered outcome of checking every expansion clause. Failures
/// appear in the order expansion clauses were checked, i.e. input order
/// (checked strictly in input order).
#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    failures: Vec<Failure>,
}

impl VerificationResult {
    pub(crate) fn record(&mut self, kind: FailureKind, expansion_clause_index: usize) {
        self.failures.push(Failure { kind, expansion_clause_index });
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn num_failures(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Renders the `s VERIFIED`/`s NOT VERIFIED` verdict line and, when not
    /// verified, the 1-indexed `c   <n>. <description> in expansion clause
    /// <i>` lines.
    pub fn format_report(&self) -> String {
        let mut out = String::new();
        if self.is_valid() {
            writeln!(out, "s VERIFIED").unwrap();
            return out;
        }
        writeln!(out, "s NOT VERIFIED").unwrap();
        for (n, failure) in self.failures.iter().enumerate() {
            writeln!(
                out,
                "c   {}. {} in expansion clause {}",
                n + 1,
                failure.kind.description(),
                failure.expansion_clause_index
            )
            .unwrap();
        }
        out
    }
}
