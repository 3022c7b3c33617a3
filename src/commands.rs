//! CLI command definitions
//!
//! Defines the clap commands for the crashprobe CLI.

use clap::Subcommand;
use std::path::PathBuf;

/// Commands run by `exec` and `diagnose` when none are given
pub const DEFAULT_EXEC_COMMANDS: [&str; 3] = ["run", "thread list", "frame diagnose"];

#[derive(Subcommand)]
pub enum Commands {
    /// Run a YAML scenario file, or every scenario in a directory
    Test {
        /// Path to a scenario file or directory
        path: PathBuf,

        /// Print each command's output
        #[arg(long, short)]
        verbose: bool,

        /// Debug adapter to use for every scenario
        #[arg(long)]
        adapter: Option<String>,

        /// Keep the fixture build directory
        #[arg(long)]
        keep_build: bool,
    },

    /// Load a program and run debugger commands against it
    Exec {
        /// Path to the executable to debug
        program: PathBuf,

        /// Command to run after loading; repeatable (default: run, thread list, frame diagnose)
        #[arg(long = "command", short = 'c')]
        commands: Vec<String>,

        /// Arguments to pass to the program
        #[arg(last = true)]
        args: Vec<String>,

        /// Debug adapter to use (default: lldb-dap)
        #[arg(long)]
        adapter: Option<String>,
    },

    /// Run a program until it crashes and print the crash diagnosis
    Diagnose {
        /// Path to the executable to debug
        program: PathBuf,

        /// Arguments to pass to the program
        #[arg(last = true)]
        args: Vec<String>,

        /// Debug adapter to use (default: lldb-dap)
        #[arg(long)]
        adapter: Option<String>,
    },

    /// View the log file
    Logs {
        /// Number of lines to show (default: 50)
        #[arg(long, short = 'n', default_value = "50")]
        lines: usize,

        /// Clear the log file
        #[arg(long)]
        clear: bool,
    },
}
