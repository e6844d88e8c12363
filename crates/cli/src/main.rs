use std::process::ExitCode;

use tracing::Level;

fn init_logging() {
    let level = std::env::var("ADESAO_LOG_LEVEL")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    // stdout carries the command's JSON result.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> ExitCode {
    init_logging();
    adesao_cli::run()
}
