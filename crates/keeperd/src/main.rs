//! Entry point for the `keeperd` bootstrapper.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked handles: the termination cleanup thread logs to stderr while
    // the main thread blocks on the shutdown listener.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    keeperd::run(
        std::env::args_os(),
        keeperd::builtin_registry(),
        &mut stdout,
        &mut stderr,
    )
}
