#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_panics_doc, clippy::module_name_repetitions)]

use std::{
    fmt::Display,
    io::Read,
    process::{ExitCode, Termination},
};

use miette::Diagnostic;
use thiserror::Error;

pub mod checker;
pub mod clause;
pub mod cli;
mod datastructure;
pub mod expansion;
pub mod literal;
pub mod qbf;
mod quantifier;
pub mod reader;
pub mod result;
mod sort;
mod warn;

pub use checker::{CheckError, Checker};
pub use expansion::{Expansion, ExpansionParseError};
pub use qbf::{Qbf, QbfParseError};
pub use quantifier::{Prefix, QuantKind, Quantifier};
pub use result::VerificationResult;

/// Parser configuration shared by the QBF and expansion parsers ("the
/// parser is in silent mode").
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    pub silent: bool,
}

/// The top-level error a verification run can fail with: opening an input,
/// or either parser rejecting its input outright. Semantic check failures
/// (`INCORRECT_LITERALS`/`INCORRECT_ANNOTATION`) are never fatal and never
/// appear here — they are recorded in the [`VerificationResult`] instead.
#[derive(Debug, Error, Diagnostic)]
pub enum VerifierError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] cli::InputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Qbf(#[from] QbfParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expansion(#[from] ExpansionParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Check(#[from] CheckError),
}

impl VerifierError {
    /// The process exit code this error should be reported under.
    pub fn exit_code(&self) -> u8 {
        match self {
            VerifierError::Input(_) => 1,
            VerifierError::Qbf(_) | VerifierError::Expansion(_) | VerifierError::Check(_) => 80,
        }
    }
}

/// The verdict of a completed verification run: `VERIFIED` if every
/// expansion clause checked out, `NOT_VERIFIED` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Verdict {
    Verified = 10,
    NotVerified = 20,
}

impl From<&VerificationResult> for Verdict {
    fn from(result: &VerificationResult) -> Self {
        if result.is_valid() {
            Verdict::Verified
        } else {
            Verdict::NotVerified
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Verified => write!(f, "VERIFIED"),
            Verdict::NotVerified => write!(f, "NOT VERIFIED"),
        }
    }
}

impl Termination for Verdict {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}

/// Parses both inputs and checks every expansion clause against the QBF
/// matrix. The driver opens inputs, orchestrates parse → sort → check,
/// and emits a verdict; matrix sorting happens inside [`qbf::parse`].
pub fn verify<R1: Read + 'static, R2: Read + 'static>(
    qbf_source: R1,
    expansion_source: R2,
    options: ParserOptions,
) -> Result<VerificationResult, VerifierError> {
    let qbf = qbf::parse(qbf_source, &options)?;
    tracing::info!(
        matrix_clauses = qbf.matrix().len(),
        max_var = qbf.max_var(),
        num_alternations = qbf.num_alternations(),
        "parsed QBF"
    );

    let mut expansion = Expansion::open(expansion_source, options)?;
    tracing::info!(
        declared_clauses = expansion.declared_num_clauses(),
        has_origin_map = expansion.clause_origins().is_some(),
        "parsed expansion preamble"
    );

    let result = Checker::new().check(&qbf, &mut expansion)?;
    tracing::info!(failures = result.num_failures(), "verification complete");
    Ok(result)
}
