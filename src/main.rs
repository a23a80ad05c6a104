//! aio binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    aio::cli::run()
}
