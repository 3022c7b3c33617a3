//! crashprobe - crash-diagnosis regression runner
//!
//! Drives a debugger over the Debug Adapter Protocol (DAP), runs a program
//! until it crashes, and checks what the debugger reports about the crash.

use clap::Parser;
use crashprobe::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "crashprobe", about = "Crash-diagnosis regression runner for DAP debuggers")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Test { verbose: true, .. });
    // Flushes the log file when dropped
    let log_guard = logging::init(verbose);

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        drop(log_guard);
        std::process::exit(1);
    }
}
