//! Terminal client for a phycas backend.
//!
//! The binary delegates to [`phycas_cli::run`], which loads configuration,
//! opens the backend session and relays standard input as commands.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    phycas_cli::run(
        std::env::args_os(),
        io::BufReader::new(io::stdin()),
        io::stdout(),
        io::stderr(),
    )
}
