//! The QBF side: prefix + matrix, and the parser that builds it.

use crate::clause::Clause;
use crate::literal::{Lit, Var};
use crate::quantifier::{Prefix, QuantKind};
use crate::reader::{Reader, ReaderError};
use crate::sort::SortStack;
use crate::warn::WarnOnce;
use crate::ParserOptions;
use miette::{Diagnostic, SourceSpan};
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum QbfParseError {
    #[error("The underlying IO has failed")]
    Io(#[from] std::io::Error),

    #[error("Duplicate `p cnf` header")]
    DuplicateHeader {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Missing `p cnf ...` header")]
    MissingHeader,

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

impl From<ReaderError> for QbfParseError {
    fn from(err: ReaderError) -> Self {
        let err_span = err.span();
        match err {
            ReaderError::IO(e) => QbfParseError::Io(e),
            ReaderError::UnexpectedEndOfFile { .. } => QbfParseError::UnexpectedEndOfFile { err_span },
            ReaderError::UnexpectedChar { .. } => QbfParseError::UnexpectedChar { err_span },
            ReaderError::InvalidInt { .. } => QbfParseError::InvalidInt { err_span },
            ReaderError::OutOfBound { val, .. } => QbfParseError::OutOfBound { val, err_span },
        }
    }
}

/// A parsed, matrix-sorted QBF: a quantifier prefix plus a clausal matrix.
#[derive(Debug, Clone, Default)]
pub struct Qbf {
    prefix: Prefix,
    matrix: Vec<Clause>,
    max_var: u32,
}

impl Qbf {
    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn matrix(&self) -> &[Clause] {
        &self.matrix
    }

    pub fn max_var(&self) -> u32 {
        self.max_var
    }

    pub fn num_alternations(&self) -> u32 {
        self.prefix.num_alternations()
    }

    fn bump_max_var(&mut self, var: Var) {
        let dimacs = var.to_dimacs() as u32;
        if dimacs > self.max_var {
            self.max_var = dimacs;
        }
    }
}

/// Parses a complete QDIMACS-format QBF from `source`, then sorts every
/// matrix clause by quantifier ordering, used by the checker's annotation
/// test to assume a left-to-right prefix walk.
pub fn parse<R: Read + 'static>(source: R, options: &ParserOptions) -> Result<Qbf, QbfParseError> {
    let source = crate::reader::detect_and_wrap(source)?;
    let mut reader = Reader::new(source);
    let mut qbf = Qbf::default();
    let mut warned = WarnOnce::default();
    let mut header: Option<(u32, u32)> = None;
    let mut observed_clauses: u32 = 0;

    loop {
        let Some(b) = reader.skip_all_ws()? else { break };
        match b {
            b'p' => {
                let start = reader.offset();
                if header.is_some() {
                    return Err(QbfParseError::DuplicateHeader { err_span: start.into() });
                }
                let (declared_max_var, declared_num_clauses) = parse_header(&mut reader)?;
                if declared_max_var > qbf.max_var {
                    qbf.max_var = declared_max_var;
                }
                header = Some((declared_max_var, declared_num_clauses));
            }
            b'c' => {
                reader.advance()?;
                reader.skip_until(b'\n')?;
            }
            b'e' | b'a' => {
                let kind = if b == b'e' { QuantKind::Existential } else { QuantKind::Universal };
                reader.advance()?;
                let pos = reader.position();
                let (vars, terminated) = reader.read_variable_list()?;
                if !terminated {
                    warned.warn_once(
                        options.silent,
                        pos,
                        "missing-zero",
                        "quantifier block is missing its terminating 0",
                    );
                }
                if qbf.prefix.repeats_last_kind(kind) {
                    warned.warn_once(
                        options.silent,
                        pos,
                        "repeated-quantifier-kind",
                        format_args!("consecutive {kind} blocks in the prefix"),
                    );
                }
                let vars: Vec<Var> = vars.into_iter().map(Var::from_dimacs).collect();
                for &v in &vars {
                    qbf.bump_max_var(v);
                }
                let dropped = qbf.prefix.push_block(kind, &vars);
                if dropped > 0 {
                    warned.warn_once(
                        options.silent,
                        pos,
                        "duplicate-variable",
                        format_args!("{dropped} variable(s) already bound elsewhere in the prefix, dropped"),
                    );
                }
            }
            _ => {
                let pos = reader.position();
                let (lits, terminated) = reader.read_literal_list()?;
                if !terminated {
                    warned.warn_once(
                        options.silent,
                        pos,
                        "missing-zero",
                        "clause is missing its terminating 0",
                    );
                }
                let lits: Vec<Lit> = lits.into_iter().map(Lit::from_dimacs).collect();
                for &l in &lits {
                    qbf.bump_max_var(l.var());
                }
                qbf.matrix.push(Clause::new(lits));
                observed_clauses += 1;
            }
        }
    }

    let Some((_, declared_num_clauses)) = header else {
        return Err(QbfParseError::MissingHeader);
    };

    if declared_num_clauses != observed_clauses {
        warned.warn_once(
            options.silent,
            crate::reader::Position::default(),
            "num-clauses-mismatch",
            format_args!("header declares {declared_num_clauses} clauses, but {observed_clauses} were found"),
        );
    }

    sort_matrix(&mut qbf);
    Ok(qbf)
}

fn parse_header<R: Read>(reader: &mut Reader<R>) -> Result<(u32, u32), QbfParseError> {
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

/// Sorts each matrix clause ascending by `(quantifier_ordering(var), raw
/// literal encoding)`. Free variables project to ordering `0`.
fn sort_matrix(qbf: &mut Qbf) {
    let mut stack = SortStack::new();
    let prefix = qbf.prefix.clone();
    for clause in &mut qbf.matrix {
        stack.sort_by_key(clause.lits_mut(), |&lit| (prefix.ordering_of(lit.var()), lit.as_repr()));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantifier::QuantKind;
    use std::io::Cursor;

    fn parse_str(input: &str) -> Result<Qbf, QbfParseError> {
        parse(Cursor::new(input.as_bytes().to_vec()), &ParserOptions::default())
    }

    #[test]
    fn minimal() {
        let qbf = parse_str("p cnf 0 0\n").unwrap();
        assert_eq!(qbf.matrix().len(), 0);
        assert_eq!(qbf.max_var(), 0);
    }

    #[test]
    fn prefix_and_matrix() {
        let qbf = parse_str("p cnf 3 4\ne 1 0\na 2 0\ne 3 0\n-1 2 -3 0\n2 3 0\n-2 3 0\n1 3 0\n").unwrap();
        assert_eq!(qbf.matrix().len(), 4);
        assert_eq!(qbf.prefix().blocks().len(), 3);
        assert_eq!(qbf.prefix().blocks()[1].kind, QuantKind::Universal);
    }

    #[test]
    fn missing_header_is_fatal() {
        assert!(matches!(parse_str("e 1 0\n1 0\n"), Err(QbfParseError::MissingHeader)));
    }

    #[test]
    fn duplicate_header_is_fatal() {
        assert!(matches!(
            parse_str("p cnf 1 0\np cnf 1 0\n"),
            Err(QbfParseError::DuplicateHeader { .. })
        ));
    }

    #[test]
    fn clause_count_mismatch_is_a_warning_not_fatal() {
        // Declared 2 clauses, only 1 present: recoverable, not fatal.
        let qbf = parse_str("p cnf 2 2\n1 2 0\n").unwrap();
        assert_eq!(qbf.matrix().len(), 1);
    }

    #[test]
    fn observed_max_var_can_exceed_header() {
        let qbf = parse_str("p cnf 1 1\n1 5 0\n").unwrap();
        assert_eq!(qbf.max_var(), 5);
    }

    #[test]
    fn matrix_clauses_sorted_by_quantifier_order() {
        let qbf = parse_str("p cnf 3 1\na 1 0\ne 2 0\na 3 0\n3 1 2 0\n").unwrap();
        let clause = &qbf.matrix()[0];
        let orderings: Vec<_> =
            clause.lits().iter().map(|&l| qbf.prefix().ordering_of(l.var())).collect();
        assert!(orderings.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn duplicate_prefix_variable_is_dropped_with_warning() {
        let qbf = parse_str("p cnf 2 0\ne 1 2 0\na 1 0\n").unwrap();
        assert!(qbf.prefix().is_existential_or_free(Var::from_dimacs(1)));
        assert_eq!(qbf.prefix().blocks().iter().map(|b| b.variables.len()).sum::<usize>(), 2);
    }

    #[test]
    fn empty_prefix_and_matrix_is_accepted() {
        let qbf = parse_str("p cnf 0 0\n").unwrap();
        assert_eq!(qbf.num_alternations(), 0);
        assert!(qbf.matrix().is_empty());
    }
}
