//! Helper executable that records scheme associations and forwards activated
//! URLs to a running Hermes host.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    hermes_urls::run(std::env::args_os(), &mut stdout, &mut stderr)
}
