//! CLI command handling
//!
//! Dispatches CLI commands to the scenario runner or a one-off interpreter
//! session and formats output.

use std::path::Path;
use std::sync::Arc;

use crate::commands::{Commands, DEFAULT_EXEC_COMMANDS};
use crate::common::config::Config;
use crate::common::{logging, Error, Result};
use crate::interpreter::{CommandInterpreter, CommandReturn, DapInterpreter};
use crate::testing::{self, RunOptions};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Test {
            path,
            verbose,
            adapter,
            keep_build,
        } => {
            let config = Arc::new(Config::load()?);
            let options = RunOptions {
                verbose,
                adapter,
                keep_build,
            };

            let summary = testing::run_suite(&path, config, &options).await?;
            if summary.failed() > 0 {
                return Err(Error::TestAssertion(format!(
                    "{} of {} scenarios failed",
                    summary.failed(),
                    summary.results.len()
                )));
            }

            Ok(())
        }

        Commands::Exec {
            program,
            commands,
            args,
            adapter,
        } => {
            let commands = if commands.is_empty() {
                default_commands()
            } else {
                commands
            };
            exec(&program, &commands, args, adapter).await
        }

        Commands::Diagnose {
            program,
            args,
            adapter,
        } => exec(&program, &default_commands(), args, adapter).await,

        Commands::Logs { lines, clear } => {
            if clear {
                logging::truncate_log()?;
                println!("Log file cleared");
                return Ok(());
            }

            match logging::tail_log(lines)? {
                Some(content) if !content.is_empty() => println!("{}", content),
                _ => println!("No log output yet"),
            }

            if let Some(path) = logging::log_path() {
                eprintln!("\n(log file: {})", path.display());
            }

            Ok(())
        }
    }
}

fn default_commands() -> Vec<String> {
    DEFAULT_EXEC_COMMANDS.iter().map(|c| c.to_string()).collect()
}

/// Load `program`, run each command and echo it the way the debugger prompt would
async fn exec(
    program: &Path,
    commands: &[String],
    args: Vec<String>,
    adapter: Option<String>,
) -> Result<()> {
    let config = Arc::new(Config::load()?);
    let mut interpreter = DapInterpreter::new(config, adapter);
    interpreter.set_program_args(args);

    let file_command = format!("file \"{}\"", program.display());
    let mut failures = 0;

    let result = async {
        for line in std::iter::once(&file_command).chain(commands) {
            let ret = interpreter.handle_command(line).await?;
            print_command(line, &ret);
            if !ret.succeeded {
                failures += 1;
            }
        }
        Ok::<_, Error>(())
    }
    .await;

    if let Err(e) = interpreter.shutdown().await {
        tracing::warn!(error = %e, "Failed to shut down debug session");
    }
    result?;

    if failures > 0 {
        return Err(Error::TestAssertion(format!(
            "{} of {} commands failed",
            failures,
            commands.len() + 1
        )));
    }

    Ok(())
}

fn print_command(line: &str, ret: &CommandReturn) {
    println!("(lldb) {}", line);
    let text = ret.text().trim_end_matches('\n');
    if text.is_empty() {
        return;
    }
    if ret.succeeded {
        println!("{}", text);
    } else {
        eprintln!("{}", text);
    }
}
