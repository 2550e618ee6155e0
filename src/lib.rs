pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod core;
pub mod engine;
pub mod error;

use clap::Parser;

pub use controller::{
    ControllerOptions, ErrorSink, ExitProcess, HangHandler, HangReport, LifecycleController,
    LifecycleState,
};
pub use error::AppError;

/// Process entry point: install logging, parse arguments, run one command.
pub fn run() -> std::process::ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in shadow-monitor: {info}");
        default_hook(info);
    }));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shadow_monitor_lib=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
