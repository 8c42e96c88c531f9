use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod common;
mod core;
mod platform;

fn main() {
    let timer = tracing_subscriber::fmt::time::UtcTime::new(
        time::format_description::parse("[hour]:[minute]:[second]").unwrap(),
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(timer)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = cli::app::Cli::parse();

    tracing::info!(
        "ecomode v{} started (mode: {})",
        env!("CARGO_PKG_VERSION"),
        cli.mode.to_mode()
    );

    std::process::exit(cli::executor::execute(cli));
}
