//! Test runner implementation
//!
//! Executes scenarios: platform gate, setup, fixture build, then the
//! command steps against a fresh interpreter.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use colored::Colorize;
use tokio::process::Command as TokioCommand;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::interpreter::{CommandInterpreter, CommandReturn, DapInterpreter};

use super::build::build_fixture;
use super::config::{expand_command, TestScenario, TestStep};
use super::platform::{host_description, host_platform, platform_matches};

/// Options shared by every scenario in a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Print command output for every step
    pub verbose: bool,
    /// Adapter override, taking precedence over the scenario's own
    pub adapter: Option<String>,
    /// Keep the build directory instead of deleting it
    pub keep_build: bool,
}

/// How a scenario ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

/// Result of a test run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub outcome: Outcome,
    pub steps_run: usize,
    pub steps_total: usize,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    fn failed(name: &str, steps_run: usize, steps_total: usize, message: String) -> Self {
        Self {
            name: name.to_string(),
            outcome: Outcome::Failed(message),
            steps_run,
            steps_total,
        }
    }
}

/// Counts across a suite of scenarios
#[derive(Debug, Default)]
pub struct SuiteSummary {
    pub results: Vec<TestResult>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// How far a step sequence got
#[derive(Debug)]
pub struct StepsReport {
    pub steps_run: usize,
    pub failure: Option<String>,
}

/// Run a scenario file or every `*.yaml`/`*.yml` file in a directory
pub async fn run_suite(path: &Path, config: Arc<Config>, options: &RunOptions) -> Result<SuiteSummary> {
    let files = scenario_files(path)?;
    if files.is_empty() {
        return Err(Error::Config(format!(
            "No scenario files found in '{}'",
            path.display()
        )));
    }

    let mut summary = SuiteSummary::default();
    for file in files {
        let result = match run_scenario(&file, Arc::clone(&config), options).await {
            Ok(result) => result,
            Err(e) => {
                println!("  {} {}", "✗".red(), e);
                TestResult::failed(&file.display().to_string(), 0, 0, e.to_string())
            }
        };
        summary.results.push(result);
    }

    println!(
        "\n{}: {} passed, {} failed, {} skipped",
        "Summary".bold(),
        summary.passed().to_string().green(),
        summary.failed().to_string().red(),
        summary.skipped().to_string().yellow()
    );

    Ok(summary)
}

/// Collect scenario files in sorted order
fn scenario_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let file = entry?.path();
        let is_yaml = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if is_yaml && file.is_file() {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

/// Run a test scenario from a YAML file
///
/// Build sources and setup commands resolve against the scenario's own
/// directory, whatever the current directory is.
pub async fn run_scenario(path: &Path, config: Arc<Config>, options: &RunOptions) -> Result<TestResult> {
    let path = path.canonicalize().map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!(
            "Failed to read test scenario '{}': {}",
            path.display(),
            e
        ))
    })?;

    let scenario = TestScenario::from_yaml(&content)?;
    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    );

    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    if let Some(platforms) = &scenario.platforms {
        if !platform_matches(platforms, host_platform()) {
            let reason = format!(
                "requires {}; host is {}",
                platforms.join(" or "),
                host_description()
            );
            println!("  {} Skipped: {}", "-".yellow(), reason.dimmed());
            return Ok(TestResult {
                name: scenario.name,
                outcome: Outcome::Skipped(reason),
                steps_run: 0,
                steps_total,
            });
        }
    }

    let scenario_dir = path.parent().unwrap_or(Path::new("/"));

    if let Some(setup_steps) = &scenario.setup {
        println!("\n{}", "Setup:".cyan());
        for step in setup_steps {
            if let Err(message) = run_setup_step(&step.shell, scenario_dir, options.verbose).await? {
                return Ok(TestResult::failed(&scenario.name, 0, steps_total, message));
            }
        }
    }

    // The build directory lives until the scenario finishes
    let build_dir = tempfile::Builder::new().prefix("crashprobe-").tempdir()?;
    let exe = match &scenario.build {
        Some(spec) => {
            println!("\n{}", "Build:".cyan());
            match build_fixture(spec, scenario_dir, build_dir.path(), &config.build).await {
                Ok(exe) => {
                    println!("  {} {}", "✓".green(), exe.display().to_string().dimmed());
                    Some(exe)
                }
                Err(e) => {
                    println!("  {} {}", "✗".red(), e);
                    return Ok(TestResult::failed(&scenario.name, 0, steps_total, e.to_string()));
                }
            }
        }
        None => None,
    };

    let adapter = options.adapter.clone().or_else(|| scenario.adapter.clone());
    let mut interpreter = DapInterpreter::new(Arc::clone(&config), adapter);

    println!("\n{}", "Steps:".cyan());
    let report = execute_steps(&mut interpreter, &scenario.steps, exe.as_deref(), options.verbose).await;

    if let Err(e) = interpreter.shutdown().await {
        tracing::warn!(error = %e, "Failed to shut down debug session");
    }

    if options.keep_build {
        let kept = build_dir.keep();
        println!("  Build kept at {}", kept.display().to_string().dimmed());
    }

    let result = match report.failure {
        Some(message) => TestResult::failed(&scenario.name, report.steps_run, steps_total, message),
        None => {
            println!(
                "\n{} {}\n",
                "✓".green().bold(),
                "Test Passed".green().bold()
            );
            TestResult {
                name: scenario.name,
                outcome: Outcome::Passed,
                steps_run: steps_total,
                steps_total,
            }
        }
    };

    Ok(result)
}

/// Run one setup shell command; `Ok(Err(_))` means it ran and failed
async fn run_setup_step(
    shell: &str,
    dir: &Path,
    verbose: bool,
) -> Result<std::result::Result<(), String>> {
    if verbose {
        println!("  $ {}", shell.dimmed());
    }

    let output_mode = || if verbose { Stdio::inherit() } else { Stdio::null() };
    let status = TokioCommand::new("sh")
        .arg("-c")
        .arg(shell)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(output_mode())
        .stderr(output_mode())
        .status()
        .await
        .map_err(|e| Error::Config(format!("Setup command failed to execute: {}", e)))?;

    if !status.success() {
        println!("  {} {}", "✗".red(), shell);
        return Ok(Err(format!(
            "Setup command '{}' failed with exit code {:?}",
            shell,
            status.code()
        )));
    }

    println!("  {} {}", "✓".green(), shell.dimmed());
    Ok(Ok(()))
}

/// Execute steps in order, stopping at the first failure
pub async fn execute_steps<I: CommandInterpreter + ?Sized>(
    interpreter: &mut I,
    steps: &[TestStep],
    exe: Option<&Path>,
    verbose: bool,
) -> StepsReport {
    for (i, step) in steps.iter().enumerate() {
        let step_num = i + 1;
        let command = expand_command(step.command(), exe);

        let outcome = match interpreter.handle_command(&command).await {
            Ok(ret) => {
                if verbose {
                    print_output(&ret);
                }
                check_step(step, &command, &ret)
            }
            Err(e) => Err(format!("'{}': {}", command, e)),
        };

        match outcome {
            Ok(()) => println!("  {} Step {}: {}", "✓".green(), step_num, command.dimmed()),
            Err(message) => {
                println!("  {} Step {}: {}", "✗".red(), step_num, message);
                return StepsReport {
                    steps_run: step_num,
                    failure: Some(format!("Step {}: {}", step_num, message)),
                };
            }
        }
    }

    StepsReport {
        steps_run: steps.len(),
        failure: None,
    }
}

fn check_step(step: &TestStep, command: &str, ret: &CommandReturn) -> std::result::Result<(), String> {
    match step {
        TestStep::RunCmd { message, check, .. } => {
            if *check && !ret.succeeded {
                let message = message
                    .clone()
                    .unwrap_or_else(|| default_run_message(command));
                return Err(format!("{}: '{}' failed:\n{}", message, command, ret.error));
            }
            Ok(())
        }
        TestStep::Expect { expect, .. } => expect.check(command, ret),
    }
}

/// Failure text for well-known commands when the scenario gives none
fn default_run_message(command: &str) -> String {
    match command.split_whitespace().next() {
        Some("file") => "Current executable set successfully".to_string(),
        Some("run") | Some("r") => "Process is launched successfully".to_string(),
        _ => format!("Command '{}' returns successfully", command),
    }
}

fn print_output(ret: &CommandReturn) {
    for line in ret.text().lines() {
        println!("      {}", line.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    use crate::testing::config::Expectation;

    /// Replays canned results and records the commands it was given
    struct ScriptedInterpreter {
        replies: VecDeque<Result<CommandReturn>>,
        seen: Vec<String>,
    }

    impl ScriptedInterpreter {
        fn new(replies: Vec<Result<CommandReturn>>) -> Self {
            Self {
                replies: replies.into(),
                seen: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl CommandInterpreter for ScriptedInterpreter {
        async fn handle_command(&mut self, line: &str) -> Result<CommandReturn> {
            self.seen.push(line.to_string());
            self.replies
                .pop_front()
                .unwrap_or_else(|| Ok(CommandReturn::failure("error: no reply scripted")))
        }

        async fn shutdown(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn bad_reference_steps() -> Vec<TestStep> {
        vec![
            TestStep::RunCmd {
                command: "file $EXE".to_string(),
                message: None,
                check: true,
            },
            TestStep::RunCmd {
                command: "run".to_string(),
                message: None,
                check: true,
            },
            TestStep::Expect {
                command: "thread list".to_string(),
                expect: Expectation {
                    message: Some("Thread should be stopped".to_string()),
                    substrs: Some(vec!["stopped".to_string()]),
                    ..Default::default()
                },
            },
            TestStep::Expect {
                command: "frame diagnose".to_string(),
                expect: Expectation {
                    message: Some("Crash diagnosis was accurate".to_string()),
                    substrs: Some(vec!["f->b".to_string()]),
                    ..Default::default()
                },
            },
        ]
    }

    #[tokio::test]
    async fn test_bad_reference_sequence_passes() {
        let mut interp = ScriptedInterpreter::new(vec![
            Ok(CommandReturn::success("Current executable set to '/tmp/a.out' (x86_64).")),
            Ok(CommandReturn::success("Process 7 launched: '/tmp/a.out' (x86_64)\nProcess 7 stopped\n")),
            Ok(CommandReturn::success("Process 7 stopped\n* thread #1: tid = 1, stop reason = EXC_BAD_ACCESS\n")),
            Ok(CommandReturn::success("Thread 1 crashed with bad access\nf->b was invalid\n")),
        ]);

        let report = execute_steps(
            &mut interp,
            &bad_reference_steps(),
            Some(Path::new("/tmp/a.out")),
            false,
        )
        .await;

        assert!(report.failure.is_none(), "{:?}", report.failure);
        assert_eq!(report.steps_run, 4);
        assert_eq!(interp.seen[0], "file /tmp/a.out");
        assert_eq!(interp.seen[3], "frame diagnose");
    }

    #[tokio::test]
    async fn test_wrong_diagnosis_fails_last_step() {
        let mut interp = ScriptedInterpreter::new(vec![
            Ok(CommandReturn::success("Current executable set")),
            Ok(CommandReturn::success("Process 7 stopped")),
            Ok(CommandReturn::success("Process 7 stopped")),
            Ok(CommandReturn::success("f->a was invalid")),
        ]);

        let report = execute_steps(&mut interp, &bad_reference_steps(), None, false).await;

        assert_eq!(report.steps_run, 4);
        let failure = report.failure.unwrap();
        assert!(failure.starts_with("Step 4: Crash diagnosis was accurate"));
        assert!(failure.contains("'f->b'"));
    }

    #[tokio::test]
    async fn test_failed_run_stops_sequence() {
        let mut interp = ScriptedInterpreter::new(vec![
            Ok(CommandReturn::success("Current executable set")),
            Ok(CommandReturn::failure("error: process launch failed")),
        ]);

        let report = execute_steps(&mut interp, &bad_reference_steps(), None, false).await;

        assert_eq!(report.steps_run, 2);
        assert_eq!(interp.seen.len(), 2);
        let failure = report.failure.unwrap();
        assert!(failure.contains("Process is launched successfully"));
        assert!(failure.contains("process launch failed"));
    }

    #[tokio::test]
    async fn test_infrastructure_error_fails_step() {
        let mut interp = ScriptedInterpreter::new(vec![Err(Error::AdapterCrashed)]);

        let report = execute_steps(&mut interp, &bad_reference_steps(), None, false).await;

        assert_eq!(report.steps_run, 1);
        assert!(report.failure.unwrap().contains("crashed"));
    }

    #[tokio::test]
    async fn test_unchecked_command_may_fail() {
        let steps = vec![TestStep::RunCmd {
            command: "settings set auto-confirm true".to_string(),
            message: None,
            check: false,
        }];
        let mut interp = ScriptedInterpreter::new(vec![Ok(CommandReturn::failure("error: nope"))]);

        let report = execute_steps(&mut interp, &steps, None, false).await;
        assert!(report.failure.is_none());
    }

    #[test]
    fn test_default_run_messages() {
        assert_eq!(default_run_message("file /tmp/a.out"), "Current executable set successfully");
        assert_eq!(default_run_message("run"), "Process is launched successfully");
        assert_eq!(
            default_run_message("process status"),
            "Command 'process status' returns successfully"
        );
    }

    #[test]
    fn test_scenario_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.yaml", "a.yml", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let files = scenario_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.yml", "b.yaml"]);
    }

    #[tokio::test]
    async fn test_skipped_on_other_platform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gated.yaml");
        std::fs::write(
            &path,
            "name: gated\nplatforms: [plan9]\nsteps:\n  - action: run_cmd\n    command: run\n",
        )
        .unwrap();

        let result = run_scenario(&path, Arc::new(Config::default()), &RunOptions::default())
            .await
            .unwrap();

        assert!(matches!(result.outcome, Outcome::Skipped(ref r) if r.contains("plan9")));
        assert_eq!(result.steps_run, 0);
        assert_eq!(result.steps_total, 1);
    }
}
