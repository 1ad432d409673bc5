//! Purpose: `kim-api-simulator-model` CLI: print a simulator model's files for build scripts.
//! Role: Binary crate root; wires process streams and the on-disk loader into `cli::run`.
//! Invariants: Diagnostics go to stderr through `tracing`; stdout carries only requested data.
use std::io;

use tracing_subscriber::EnvFilter;

use kim_collections::api::SimulatorModel;
use kim_collections::cli;

fn main() {
    init_tracing();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let exit_code = match cli::run(
        std::env::args_os(),
        SimulatorModel::create_from_process,
        &mut stdout,
        &mut stderr,
    ) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("failed to write output: {err}");
            cli::FILE_ERROR
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
