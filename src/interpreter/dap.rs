//! Command interpreter backed by a DAP debug session

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::common::{config::Config, Error, Result};
use crate::session::{DebugSession, SessionState};

use super::command::DebuggerCommand;
use super::render::{host_arch, process_label, render_thread_list, ThreadLine};
use super::{CommandInterpreter, CommandReturn};

/// Interprets debugger commands by driving a DAP adapter
///
/// `file`, `run`, `thread list`, `process status` and `process kill` are
/// handled here because they map onto DAP requests; every other command is
/// sent to the adapter's REPL.
pub struct DapInterpreter {
    config: Arc<Config>,
    adapter: Option<String>,
    target: Option<PathBuf>,
    args: Vec<String>,
    session: Option<DebugSession>,
}

impl DapInterpreter {
    /// Create an interpreter; `adapter` overrides the configured default
    pub fn new(config: Arc<Config>, adapter: Option<String>) -> Self {
        Self {
            config,
            adapter,
            target: None,
            args: Vec::new(),
            session: None,
        }
    }

    /// Arguments passed to the program on `run`
    pub fn set_program_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    fn set_target(&mut self, path: &Path) -> Result<CommandReturn> {
        let resolved = match path.canonicalize() {
            Ok(p) => p,
            Err(_) => {
                return Ok(CommandReturn::failure(format!(
                    "error: '{}' does not exist",
                    path.display()
                )))
            }
        };

        if !resolved.is_file() {
            return Ok(CommandReturn::failure(format!(
                "error: '{}' is not a file",
                resolved.display()
            )));
        }

        tracing::debug!(target = %resolved.display(), "Target set");
        let output = format!(
            "Current executable set to '{}' ({}).",
            resolved.display(),
            host_arch()
        );
        self.target = Some(resolved);
        Ok(CommandReturn::success(output))
    }

    async fn run(&mut self) -> Result<CommandReturn> {
        let target = self.target.clone().ok_or(Error::NoTarget)?;

        if let Some(mut previous) = self.session.take() {
            tracing::debug!("Killing previous process before relaunch");
            previous.stop().await?;
        }

        let session = DebugSession::launch(
            &self.config,
            &target,
            self.args.clone(),
            self.adapter.clone(),
        )
        .await?;
        let session = self.session.insert(session);

        let state = session.wait_stopped(self.config.timeouts.stop_secs).await?;
        tracing::debug!(
            adapter = session.adapter_name(),
            program = %session.program().display(),
            %state,
            "Process settled after launch"
        );

        let mut output = format!(
            "{} launched: '{}' ({})\n",
            process_label(session.pid()),
            target.display(),
            host_arch()
        );
        output.push_str(&describe_state(session, state).await?);

        Ok(CommandReturn::success(output))
    }

    async fn thread_list(&mut self) -> Result<CommandReturn> {
        let session = self.session.as_mut().ok_or(Error::SessionNotActive)?;
        let state = session.state();
        let threads = session.threads().await?;

        let stop = session.last_stop().cloned();
        let stopped_thread = stop
            .as_ref()
            .and_then(|s| s.thread_id)
            .or_else(|| threads.first().map(|t| t.id));

        let mut lines = Vec::with_capacity(threads.len());
        for thread in threads {
            let is_stopped_thread = state == SessionState::Stopped && Some(thread.id) == stopped_thread;

            let location = if state == SessionState::Stopped {
                match session.thread_top_frame(thread.id).await {
                    Ok(frame) => frame.map(|f| f.location()),
                    Err(e) => {
                        tracing::debug!(thread = thread.id, error = %e, "No frame for thread");
                        None
                    }
                }
            } else {
                None
            };

            lines.push(ThreadLine {
                id: thread.id,
                name: thread.name,
                location,
                stop_reason: if is_stopped_thread {
                    stop.as_ref().map(|s| s.description.clone())
                } else {
                    None
                },
            });
        }

        Ok(CommandReturn::success(render_thread_list(
            session.pid(),
            &state.to_string(),
            &lines,
        )))
    }

    async fn process_status(&mut self) -> Result<CommandReturn> {
        let session = self.session.as_mut().ok_or(Error::SessionNotActive)?;
        let state = session.state();
        Ok(CommandReturn::success(describe_state(session, state).await?))
    }

    async fn kill(&mut self) -> Result<CommandReturn> {
        let mut session = self.session.take().ok_or(Error::SessionNotActive)?;
        let label = process_label(session.pid());
        session.stop().await?;
        Ok(CommandReturn::success(format!("{} killed", label)))
    }

    async fn passthrough(&mut self, text: &str) -> Result<CommandReturn> {
        let Some(session) = self.session.as_mut() else {
            return Ok(CommandReturn::failure(format!(
                "error: '{}' requires a process. Use 'run' first",
                text
            )));
        };

        if !matches!(
            session.state(),
            SessionState::Stopped | SessionState::Running
        ) {
            return Ok(CommandReturn::failure(format!(
                "error: invalid process (process is {})",
                session.state()
            )));
        }

        let expression = format!("{}{}", session.command_prefix(), text);
        match session.evaluate(&expression, "repl").await {
            Ok(body) => Ok(classify_repl_output(body.result)),
            Err(Error::DapRequestFailed { message, .. }) => Ok(CommandReturn::failure(message)),
            Err(Error::Timeout(secs)) => {
                // The adapter stream may be mid-message; the session cannot be reused
                tracing::warn!(command = %text, secs, "Debugger did not answer, dropping session");
                self.session = None;
                Ok(CommandReturn::failure(format!(
                    "error: '{}' timed out after {} seconds; the debug session was killed",
                    text, secs
                )))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CommandInterpreter for DapInterpreter {
    async fn handle_command(&mut self, line: &str) -> Result<CommandReturn> {
        let command = match DebuggerCommand::parse(line) {
            Ok(command) => command,
            Err(e) => return Ok(CommandReturn::failure(format!("error: {}", e))),
        };
        tracing::debug!(%command, "Executing command");

        let result = match &command {
            DebuggerCommand::File(path) => self.set_target(path),
            DebuggerCommand::Run => self.run().await,
            DebuggerCommand::ThreadList => self.thread_list().await,
            DebuggerCommand::ProcessStatus => self.process_status().await,
            DebuggerCommand::Kill => self.kill().await,
            DebuggerCommand::Raw(text) => self.passthrough(text).await,
        };

        match result {
            Err(e) if e.is_command_failure() => {
                Ok(CommandReturn::failure(format!("error: {}", e)))
            }
            other => other,
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            session.stop().await?;
        }
        Ok(())
    }
}

/// Summarise the process the way LLDB does after `run` or `process status`
async fn describe_state(session: &mut DebugSession, state: SessionState) -> Result<String> {
    let label = process_label(session.pid());

    let text = match state {
        SessionState::Stopped => {
            let stop = session.last_stop().cloned();
            let thread_id = session.stopped_thread_id().await?;
            let location = session.top_frame().await?.map(|f| f.location());
            let line = ThreadLine {
                id: thread_id,
                name: String::new(),
                location,
                stop_reason: Some(
                    stop.map(|s| s.description)
                        .unwrap_or_else(|| "unknown".to_string()),
                ),
            };
            render_thread_list(session.pid(), "stopped", &[line])
        }
        SessionState::Exited => {
            let code = session.exit_code().unwrap_or_default();
            format!("{} exited with status = {} ({:#010x})\n", label, code, code)
        }
        other => format!("{} {}\n", label, other),
    };

    Ok(text)
}

/// lldb-dap reports command errors inside a successful evaluate response,
/// so the text decides whether the command failed
fn classify_repl_output(result: String) -> CommandReturn {
    let failed = result
        .lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim_start().starts_with("error:"));

    if failed {
        CommandReturn::failure(result)
    } else {
        CommandReturn::success(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_error_output_is_failure() {
        let ret = classify_repl_output("\nerror: 'frame diagnose' requires a process\n".to_string());
        assert!(!ret.succeeded);
        assert!(ret.error.contains("requires a process"));

        let ret = classify_repl_output(
            "Thread 1 crashed with bad access\nf->b is invalid\n".to_string(),
        );
        assert!(ret.succeeded);
        assert!(ret.output.contains("f->b"));
    }

    #[tokio::test]
    async fn test_run_without_target_fails() {
        let mut interp = DapInterpreter::new(Arc::new(Config::default()), None);
        let ret = interp.handle_command("run").await.unwrap();
        assert!(!ret.succeeded);
        assert!(ret.error.contains("file <path>"));
    }

    #[tokio::test]
    async fn test_file_missing_path_fails() {
        let mut interp = DapInterpreter::new(Arc::new(Config::default()), None);
        let ret = interp
            .handle_command("file /definitely/not/here/a.out")
            .await
            .unwrap();
        assert!(!ret.succeeded);
        assert!(ret.error.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_file_sets_target() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("a.out");
        std::fs::write(&exe, b"").unwrap();

        let mut interp = DapInterpreter::new(Arc::new(Config::default()), None);
        let ret = interp
            .handle_command(&format!("file {}", exe.display()))
            .await
            .unwrap();
        assert!(ret.succeeded, "{:?}", ret);
        assert!(ret.output.starts_with("Current executable set to '"));
        assert!(ret.output.contains("a.out"));
    }

    #[tokio::test]
    async fn test_commands_without_process() {
        let mut interp = DapInterpreter::new(Arc::new(Config::default()), None);

        let ret = interp.handle_command("thread list").await.unwrap();
        assert!(!ret.succeeded);

        let ret = interp.handle_command("frame diagnose").await.unwrap();
        assert!(!ret.succeeded);
        assert!(ret.error.contains("requires a process"));

        interp.shutdown().await.unwrap();
    }
}
