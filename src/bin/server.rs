//! Calmline server binary.
//! Run with: cargo run --bin calmline-server

use std::process::ExitCode;

use calmline::start_calmline;

fn main() -> ExitCode {
    start_calmline::run()
}
