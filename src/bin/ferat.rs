use clap::Parser;
use ferat::{cli, ParserOptions, Verdict, VerificationResult, VerifierError};
use std::io::Cursor;
use std::process::{ExitCode, Termination};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = cli::Cli::parse();

    match run(&args) {
        Ok(result) => {
            print!("{}", result.format_report());
            Verdict::from(&result).report()
        }
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code)
        }
    }
}

fn run(args: &cli::Cli) -> Result<VerificationResult, VerifierError> {
    let qbf_bytes = cli::read_input(&args.qbf_file)?;
    let expansion_bytes = cli::read_input(&args.expansion_file)?;
    ferat::verify(Cursor::new(qbf_bytes), Cursor::new(expansion_bytes), ParserOptions::default())
}
