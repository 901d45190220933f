use std::process::ExitCode;

fn main() -> ExitCode {
    match agrimarket_core::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(err.exit_code()),
    }
}
