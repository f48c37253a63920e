//! Binary entrypoint for the `fiberscope` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    match fiberscope::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
