//! agmd - Agent instruction documents from a personal registry

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = agmd::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
