#[cfg(not(unix))]
compile_error!("sigproxy relies on unix signals and process groups");

pub mod error;
pub mod relay;
pub mod supervisor;
pub mod util;

// === CLI entrypoint ===
pub mod cli;

/// Entrypoint used by `main.rs` to run the wrapper.
pub async fn run_cli() -> anyhow::Result<i32> {
    cli::cli().await
}
