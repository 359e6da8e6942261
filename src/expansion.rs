//! The expansion side: preamble (`p`, `c x` mapping comments, `c o` origin
//! comments) plus a lazy clause generator.

use crate::clause::Clause;
use crate::datastructure::VarVec;
use crate::literal::{Lit, Var};
use crate::reader::{Position, Reader, ReaderError};
use crate::warn::WarnOnce;
use crate::ParserOptions;
use miette::{Diagnostic, SourceSpan};
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ExpansionParseError {
    #[error("The underlying IO has failed")]
    Io(#[from] std::io::Error),

    #[error("Duplicate `p cnf` header")]
    DuplicateHeader {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Missing `p cnf ...` header")]
    MissingHeader,

    #[error("`c x` line maps {exp_vars} expansion variable(s) to {qbf_vars} QBF variable(s)")]
    MappingLengthMismatch {
        exp_vars: usize,
        qbf_vars: usize,
        #[label]
        err_span: SourceSpan,
    },

    #[error("Unexpected end of file")]
    UnexpectedEndOfFile {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Unexpected character")]
    UnexpectedChar {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Invalid integer")]
    InvalidInt {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Value {val} is out of bound")]
    OutOfBound {
        val: i64,
        #[label]
        err_span: SourceSpan,
    },
}

impl From<ReaderError> for ExpansionParseError {
    fn from(err: ReaderError) -> Self {
        let err_span = err.span();
        match err {
            ReaderError::IO(e) => ExpansionParseError::Io(e),
            ReaderError::UnexpectedEndOfFile { .. } => {
                ExpansionParseError::UnexpectedEndOfFile { err_span }
            }
            ReaderError::UnexpectedChar { .. } => ExpansionParseError::UnexpectedChar { err_span },
            ReaderError::InvalidInt { .. } => ExpansionParseError::InvalidInt { err_span },
            ReaderError::OutOfBound { val, .. } => ExpansionParseError::OutOfBound { val, err_span },
        }
    }
}

/// `(qbf_var, annotation)` for one expansion variable, recorded by a `c x`
/// mapping comment.
#[derive(Debug, Clone)]
pub struct AnnotationRecord {
    pub qbf_var: Var,
    pub annotation: Vec<Lit>,
}

/// The result of looking up an expansion variable's annotation record.
/// Expansion variables that never appear in a `c x` line fall back to an
/// identity mapping onto the QBF variable of the same id, with an empty
/// annotation (warned once, per the "except free variables" invariant).
#[derive(Debug, Clone, Copy)]
pub enum MappingRef<'a> {
    Explicit(&'a AnnotationRecord),
    Identity(Var),
}

impl MappingRef<'_> {
    pub fn qbf_var(&self) -> Var {
        match self {
            Self::Explicit(record) => record.qbf_var,
            Self::Identity(var) => *var,
        }
    }

    pub fn annotation(&self) -> &[Lit] {
        match self {
            Self::Explicit(record) => &record.annotation,
            Self::Identity(_) => &[],
        }
    }
}

/// A parsed expansion preamble plus the still-open reader driving the lazy
/// clause generator. Not `Clone`: the clause stream is a
/// finite, non-restartable sequence.
///
/// The backing reader is always boxed: gzip detection must wrap the
/// caller-supplied source in a decoder before any lexing begins, and that
/// wrapping is invisible to every layer above the reader.
pub struct Expansion {
    reader: Reader<Box<dyn Read>>,
    mappings: VarVec<Option<AnnotationRecord>>,
    clause_origins: Option<Vec<usize>>,
    max_var: u32,
    declared_num_clauses: u32,
    options: ParserOptions,
    warned: WarnOnce,
    clauses_yielded: u32,
    finished: bool,
}

impl Expansion {
    /// Parses the preamble (phase 1) and returns a value ready to
    /// drive phase 2 via [`Self::next_clause`].
    pub fn open<R: Read + 'static>(source: R, options: ParserOptions) -> Result<Self, ExpansionParseError> {
        let source = crate::reader::detect_and_wrap(source)?;
        let mut reader = Reader::new(source);
        let mut mappings: VarVec<Option<AnnotationRecord>> = VarVec::default();
        let mut clause_origins: Option<Vec<usize>> = None;
        let mut warned = WarnOnce::default();
        let mut header: Option<(u32, u32)> = None;
        let mut max_var: u32 = 0;

        loop {
            let Some(b) = reader.skip_all_ws()? else { break };
            match b {
                b'p' => {
                    let start = reader.offset();
                    if header.is_some() {
                        return Err(ExpansionParseError::DuplicateHeader { err_span: start.into() });
                    }
                    let (declared_max_var, declared_num_clauses) = parse_header(&mut reader)?;
                    max_var = max_var.max(declared_max_var);
                    header = Some((declared_max_var, declared_num_clauses));
                }
                b'c' => {
                    reader.advance()?;
                    reader.skip_horizontal_ws()?;
                    let word = reader.read_word()?;
                    match word.as_slice() {
                        b"x" => {
                            parse_mapping(&mut reader, &mut mappings, &mut max_var)?;
                        }
                        b"o" => {
                            parse_origin(&mut reader, &mut clause_origins, &mut warned, &options)?;
                        }
                        _ => reader.skip_until(b'\n')?,
                    }
                }
                _ => break,
            }
        }

        let Some((_, declared_num_clauses)) = header else {
            return Err(ExpansionParseError::MissingHeader);
        };

        if clause_origins.is_none() {
            warned.warn_once(
                options.silent,
                Position::default(),
                "missing-origin",
                "no `c o` origin line; falling back to iterative candidate search",
            );
        }

        Ok(Self {
            reader,
            mappings,
            clause_origins,
            max_var,
            declared_num_clauses,
            options,
            warned,
            clauses_yielded: 0,
            finished: false,
        })
    }

    pub fn max_var(&self) -> u32 {
        self.max_var
    }

    pub fn declared_num_clauses(&self) -> u32 {
        self.declared_num_clauses
    }

    pub fn clause_origins(&self) -> Option<&[usize]> {
        self.clause_origins.as_deref()
    }

    /// Drops the origin map, forcing the checker into iterative candidate
    /// search for the remainder of the run.
    pub fn discard_clause_origins(&mut self) {
        self.clause_origins = None;
    }

    /// Looks up the annotation record for `exp_var`, synthesizing an
    /// identity mapping (and warning once) if `exp_var` never appeared in a
    /// `c x` line.
    pub fn mapping(&mut self, exp_var: Var) -> MappingRef<'_> {
        if let Some(Some(record)) = self.mappings.get(exp_var) {
            return MappingRef::Explicit(record);
        }
        self.warned.warn_once(
            self.options.silent,
            self.reader.position(),
            "free-expansion-variable",
            format_args!(
                "expansion variable {} has no `c x` mapping, treated as an identity mapping onto itself",
                exp_var.to_dimacs()
            ),
        );
        MappingRef::Identity(exp_var)
    }

    /// Phase 2: yields the next expansion clause, or `None` at EOF.
    /// Each call discards the previous clause; the stream cannot be
    /// replayed.
    pub fn next_clause(&mut self) -> Result<Option<Clause>, ExpansionParseError> {
        loop {
            match self.reader.skip_all_ws()? {
                None => {
                    self.finish();
                    return Ok(None);
                }
                Some(b'c') => {
                    self.reader.advance()?;
                    self.reader.skip_until(b'\n')?;
                }
                Some(_) => break,
            }
        }
        let pos = self.reader.position();
        let (lits, terminated) = self.reader.read_literal_list()?;
        if !terminated {
            self.warned.warn_once(
                self.options.silent,
                pos,
                "missing-zero",
                "clause is missing its terminating 0",
            );
        }
        self.clauses_yielded += 1;
        Ok(Some(Clause::new(lits.into_iter().map(Lit::from_dimacs).collect())))
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.clauses_yielded != self.declared_num_clauses {
            self.warned.warn_once(
                self.options.silent,
                Position::default(),
                "num-clauses-mismatch",
                format_args!(
                    "preamble declares {} clauses, but {} were yielded",
                    self.declared_num_clauses, self.clauses_yielded
                ),
            );
        }
    }
}

fn parse_header<R: Read>(reader: &mut Reader<R>) -> Result<(u32, u32), ExpansionParseError> {
    reader.advance()?; // 'p'
    reader.skip_horizontal_ws()?;
    reader.expect_literal(b"cnf")?;
    reader.skip_horizontal_ws()?;
    let max_var = reader.read_variable(true)?;
    reader.skip_horizontal_ws()?;
    let num_clauses = reader.read_variable(true)?;
    reader.skip_newline_if_any()?;
    Ok((max_var, num_clauses))
}

fn parse_mapping<R: Read>(
    reader: &mut Reader<R>,
    mappings: &mut VarVec<Option<AnnotationRecord>>,
    max_var: &mut u32,
) -> Result<(), ExpansionParseError> {
    let start = reader.offset();
    let (exp_vars, _) = reader.read_variable_list()?;
    let (qbf_vars, _) = reader.read_variable_list()?;
    if exp_vars.len() != qbf_vars.len() {
        return Err(ExpansionParseError::MappingLengthMismatch {
            exp_vars: exp_vars.len(),
            qbf_vars: qbf_vars.len(),
            err_span: (start..reader.offset()).into(),
        });
    }
    let (annotation_lits, _) = reader.read_literal_list()?;
    let annotation: Vec<Lit> = annotation_lits.into_iter().map(Lit::from_dimacs).collect();
    for lit in &annotation {
        *max_var = (*max_var).max(lit.var().to_dimacs() as u32);
    }
    for (exp_var, qbf_var) in exp_vars.into_iter().zip(qbf_vars) {
        let exp_var = Var::from_dimacs(exp_var);
        let qbf_var = Var::from_dimacs(qbf_var);
        *max_var = (*max_var).max(exp_var.to_dimacs() as u32).max(qbf_var.to_dimacs() as u32);
        mappings.ensure(exp_var);
        mappings[exp_var] = Some(AnnotationRecord { qbf_var, annotation: annotation.clone() });
    }
    Ok(())
}

fn parse_origin<R: Read>(
    reader: &mut Reader<R>,
    clause_origins: &mut Option<Vec<usize>>,
    warned: &mut WarnOnce,
    options: &ParserOptions,
) -> Result<(), ExpansionParseError> {
    let pos = reader.position();
    let (indices, terminated) = reader.read_variable_list()?;
    if !terminated {
        warned.warn_once(options.silent, pos, "missing-zero", "`c o` line is missing its terminating 0");
    }
    if clause_origins.is_some() {
        warned.warn_once(
            options.silent,
            pos,
            "duplicate-origin-line",
            "multiple `c o` lines present; only the first is used",
        );
        return Ok(());
    }
    *clause_origins = Some(indices.into_iter().map(|i| (i as usize) - 1).collect());
    Ok(())
}
