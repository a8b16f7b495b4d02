mod cli;

use std::io;
use std::process;

use clap::Parser;
use tracing::Level;

use cli::{Cli, Exit};
use pixel_trend::config::Config;

/// Exit status for a run interrupted with Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };

    match cli::run(cli, &config).await {
        Ok(()) => {}
        Err(Exit::Cancelled) => process::exit(EXIT_CANCELLED),
        Err(Exit::Failed(e)) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
