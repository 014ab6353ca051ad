//! Branch view HTTP server.
//! Run with: cargo run --bin branchview-server

use std::process::ExitCode;

use branchview::start_branchview;

fn main() -> ExitCode {
    start_branchview::run()
}
