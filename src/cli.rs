//! Command-line surface: two positional input files, `-h/--help`,
//! `-V/--version`, replacing the teacher's hand-rolled
//! `content_from_args`.

use clap::Parser;
use miette::Diagnostic;
use std::{io::Read, path::Path, path::PathBuf};
use thiserror::Error;

/// Verifies a propositional expansion of a QBF against its originating
/// matrix, checking each expansion clause's existential literals and
/// universal annotations.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Path to the QBF (QDIMACS) file, or `-` for stdin.
    pub qbf_file: PathBuf,

    /// Path to the expansion (extended DIMACS) file, or `-` for stdin.
    pub expansion_file: PathBuf,
}

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("cannot read from stdin")]
    Stdin(#[source] std::io::Error),

    #[error("cannot read {}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads the bytes behind one CLI-provided path, treating `-` as stdin — the
/// two-input generalization of the teacher's "no arguments ⇒ read stdin"
/// fallback.
pub fn read_input(path: &Path) -> Result<Vec<u8>, InputError> {
    if path == Path::new("-") {
        tracing::info!("reading from stdin");
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer).map_err(InputError::Stdin)?;
        return Ok(buffer);
    }
    std::fs::read(path).map_err(|source| InputError::File { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_two_positional_paths() {
        let cli = Cli::parse_from(["ferat", "qbf.txt", "exp.txt"]);
        assert_eq!(cli.qbf_file, PathBuf::from("qbf.txt"));
        assert_eq!(cli.expansion_file, PathBuf::from("exp.txt"));
    }

    #[test]
    fn missing_argument_is_a_usage_error() {
        let err = Cli::try_parse_from(["ferat", "qbf.txt"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
