//! todograph - todo.txt task manager with task dependencies

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = todograph::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
