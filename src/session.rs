//! Debug session state machine
//!
//! Owns one adapter connection for one launched process and tracks how
//! that process last stopped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::{
    config::{AdapterType, Config},
    Error, Result,
};
use crate::dap::{self, DapClient, Event, LaunchArguments, StackFrame, Thread};

/// Debug session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No process launched yet
    Idle,
    /// DAP handshake in progress
    Launching,
    /// Process is running
    Running,
    /// Process has stopped (crash, signal, breakpoint)
    Stopped,
    /// Process has exited
    Exited,
    /// Adapter ended the session
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Launching => write!(f, "launching"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Exited => write!(f, "exited"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Details of the most recent stop
#[derive(Debug, Clone)]
pub struct StopInfo {
    /// DAP stop reason ("exception", "signal", "breakpoint", ...)
    pub reason: String,
    /// Adapter's description, e.g. `EXC_BAD_ACCESS (code=1, address=0x0)`
    pub description: String,
    /// Thread that triggered the stop
    pub thread_id: Option<i64>,
}

/// Debug session managing a DAP connection
pub struct DebugSession {
    client: DapClient,
    state: SessionState,
    program: PathBuf,
    adapter_name: String,
    pid: Option<u32>,
    last_stop: Option<StopInfo>,
    exit_code: Option<i32>,
    /// Top frame of the stopped thread, fetched lazily
    cached_frame: Option<StackFrame>,
    /// Prepended to REPL input so the adapter treats it as a debugger command
    command_prefix: String,
    request_timeout: Duration,
}

impl DebugSession {
    /// Launch a program under the configured adapter
    ///
    /// Performs the DAP handshake (initialize, launch, initialized,
    /// configurationDone); the process is running when this returns.
    #[tracing::instrument(skip(config), fields(adapter = %adapter_name.as_deref().unwrap_or("default")))]
    pub async fn launch(
        config: &Config,
        program: &Path,
        args: Vec<String>,
        adapter_name: Option<String>,
    ) -> Result<Self> {
        let adapter_name = adapter_name.unwrap_or_else(|| config.defaults.adapter.clone());

        let adapter_config = config
            .get_adapter(&adapter_name)
            .ok_or_else(|| Error::adapter_not_found(&adapter_name, &["config", "PATH"]))?;

        tracing::info!(
            program = %program.display(),
            adapter_path = %adapter_config.path.display(),
            "Launching debug session"
        );

        let mut client = DapClient::spawn(&adapter_config.path, &adapter_config.args).await?;

        let init_timeout = Duration::from_secs(config.timeouts.dap_initialize_secs);
        let request_timeout = Duration::from_secs(config.timeouts.dap_request_secs);

        let capabilities = client
            .initialize_with_timeout(&adapter_name, init_timeout)
            .await?;
        tracing::debug!(?capabilities, "DAP adapter initialized");

        let is_lldb = adapter_config.adapter_type == AdapterType::LldbDap;
        let command_prefix = if is_lldb {
            config.defaults.command_escape_prefix.clone()
        } else {
            String::new()
        };
        let launch_args = LaunchArguments {
            program: program.to_string_lossy().into_owned(),
            args,
            cwd: program
                .parent()
                .map(|p| p.to_string_lossy().into_owned()),
            stop_on_entry: false,
            init_commands: None,
            command_escape_prefix: is_lldb.then(|| command_prefix.clone()),
        };

        // DAP: launch must come before the initialized event
        client.launch(launch_args, request_timeout).await?;
        client.wait_initialized_with_timeout(request_timeout).await?;
        client.configuration_done(request_timeout).await?;
        tracing::debug!("DAP configuration complete, program starting");

        Ok(Self {
            client,
            state: SessionState::Running,
            program: program.to_path_buf(),
            adapter_name,
            pid: None,
            last_stop: None,
            exit_code: None,
            cached_frame: None,
            command_prefix,
            request_timeout,
        })
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get program path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Get adapter name
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Debuggee process id, once the adapter has reported it
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Details of the most recent stop
    pub fn last_stop(&self) -> Option<&StopInfo> {
        self.last_stop.as_ref()
    }

    /// Prefix marking REPL input as a debugger command
    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Exit code if the process exited
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Stopped(body) => {
                self.state = SessionState::Stopped;
                self.cached_frame = None;
                self.last_stop = Some(StopInfo {
                    reason: body.reason.clone(),
                    description: body.summary(),
                    thread_id: body.thread_id,
                });
                tracing::debug!(reason = %body.reason, thread = ?body.thread_id, "Process stopped");
            }
            Event::Continued { thread_id } => {
                self.state = SessionState::Running;
                self.cached_frame = None;
                tracing::debug!("Continued: thread {}", thread_id);
            }
            Event::Exited(body) => {
                self.state = SessionState::Exited;
                self.exit_code = Some(body.exit_code);
                tracing::info!("Program exited with code {}", body.exit_code);
            }
            Event::Terminated => {
                if self.state != SessionState::Exited {
                    self.state = SessionState::Terminated;
                }
                tracing::debug!("Session terminated");
            }
            Event::Process(body) => {
                self.pid = body.system_process_id;
                tracing::debug!(pid = ?body.system_process_id, name = %body.name, "Process started");
            }
            Event::Output(body) => {
                tracing::debug!(
                    category = body.category.as_deref().unwrap_or("console"),
                    "{}",
                    body.output.trim_end()
                );
            }
            Event::Thread(body) => {
                tracing::trace!("Thread {}: {}", body.thread_id, body.reason);
            }
            Event::Initialized => {}
            Event::Unknown { event, .. } => {
                tracing::trace!("Unhandled event: {}", event);
            }
        }
    }

    /// Apply events that arrived during earlier requests
    fn drain_queued_events(&mut self) {
        while let Some(event) = self.client.try_queued_event() {
            self.handle_event(&event);
        }
    }

    /// Wait for the process to stop, exit or terminate
    pub async fn wait_stopped(&mut self, timeout_secs: u64) -> Result<SessionState> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(Error::StopTimeout(timeout_secs));
            }

            let event = match self.client.next_event_with_timeout(remaining).await {
                Ok(event) => event,
                Err(Error::Timeout(_)) => return Err(Error::StopTimeout(timeout_secs)),
                Err(e) => return Err(e),
            };
            self.handle_event(&event);

            if matches!(
                event,
                Event::Stopped(_) | Event::Exited(_) | Event::Terminated
            ) {
                // Exited is normally followed by terminated; either ends the wait
                return Ok(self.state);
            }
        }
    }

    /// Get threads
    pub async fn threads(&mut self) -> Result<Vec<Thread>> {
        self.drain_queued_events();
        self.ensure_live("list threads")?;
        self.client.threads(self.request_timeout).await
    }

    /// Top frame of the thread that stopped, if the process is stopped
    pub async fn top_frame(&mut self) -> Result<Option<StackFrame>> {
        self.drain_queued_events();
        self.ensure_stopped("inspect frames")?;

        if self.cached_frame.is_none() {
            let thread_id = self.stopped_thread_id().await?;
            let frames = self
                .client
                .stack_trace(thread_id, 1, self.request_timeout)
                .await?;
            self.cached_frame = frames.into_iter().next();
        }

        Ok(self.cached_frame.clone())
    }

    /// Top frame of an arbitrary thread
    pub async fn thread_top_frame(&mut self, thread_id: i64) -> Result<Option<StackFrame>> {
        self.ensure_stopped("inspect frames")?;
        let frames = self
            .client
            .stack_trace(thread_id, 1, self.request_timeout)
            .await?;
        Ok(frames.into_iter().next())
    }

    /// Evaluate an expression or REPL command
    ///
    /// Runs against the top frame of the stopped thread when the process is
    /// stopped, and without a frame while it is running.
    pub async fn evaluate(
        &mut self,
        expression: &str,
        context: &str,
    ) -> Result<dap::EvaluateResponseBody> {
        self.drain_queued_events();
        self.ensure_live("evaluate")?;

        let frame_id = if self.state == SessionState::Stopped {
            self.top_frame().await?.map(|f| f.id)
        } else {
            None
        };
        self.client
            .evaluate(expression, frame_id, context, self.request_timeout)
            .await
    }

    /// Terminate the debuggee and the adapter
    pub async fn stop(&mut self) -> Result<()> {
        tracing::debug!(state = %self.state, "Stopping debug session");
        self.client.terminate().await?;
        self.state = SessionState::Terminated;
        Ok(())
    }

    /// Check the process exists and has not exited
    fn ensure_live(&self, action: &str) -> Result<()> {
        match self.state {
            SessionState::Stopped | SessionState::Running => Ok(()),
            SessionState::Exited => Err(Error::ProgramExited(self.exit_code.unwrap_or(0))),
            _ => Err(Error::invalid_state(action, &self.state.to_string())),
        }
    }

    /// Ensure we're in stopped state for inspection commands
    fn ensure_stopped(&self, action: &str) -> Result<()> {
        match self.state {
            SessionState::Stopped => Ok(()),
            SessionState::Exited => Err(Error::ProgramExited(self.exit_code.unwrap_or(0))),
            _ => Err(Error::invalid_state(action, &self.state.to_string())),
        }
    }

    /// Thread that stopped, falling back to the first thread
    pub async fn stopped_thread_id(&mut self) -> Result<i64> {
        if let Some(id) = self.last_stop.as_ref().and_then(|s| s.thread_id) {
            return Ok(id);
        }

        self.client
            .threads(self.request_timeout)
            .await?
            .first()
            .map(|t| t.id)
            .ok_or_else(|| Error::DapProtocol("Adapter reported no threads".to_string()))
    }
}
