//! DAP client for communicating with debug adapters
//!
//! Handles the adapter subprocess, request/response correlation and the
//! queueing of events that arrive while a request is outstanding.
//!
//! Reads are not cancel-safe: once a `*_with_timeout` call has timed out
//! the stream may be mid-message and the client should be terminated.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::common::{Error, Result};

use super::codec;
use super::types::*;

/// DAP client for communicating with a debug adapter
pub struct DapClient {
    /// Adapter subprocess
    adapter: Child,
    /// Buffered reader for adapter stdout
    reader: BufReader<ChildStdout>,
    /// Buffered writer for adapter stdin
    writer: BufWriter<ChildStdin>,
    /// Sequence number for the next request
    seq: i64,
    /// Events received while waiting for responses
    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: mpsc::UnboundedReceiver<Event>,
}

impl DapClient {
    /// Spawn a new DAP adapter speaking over stdio
    pub async fn spawn(adapter_path: &Path, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(adapter_path);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut adapter = cmd.spawn().map_err(|e| {
            Error::AdapterStartFailed(format!(
                "Failed to start {}: {}",
                adapter_path.display(),
                e
            ))
        })?;

        let stdin = adapter
            .stdin
            .take()
            .ok_or_else(|| Error::AdapterStartFailed("Failed to get adapter stdin".to_string()))?;
        let stdout = adapter.stdout.take().ok_or_else(|| {
            Error::AdapterStartFailed("Failed to get adapter stdout".to_string())
        })?;

        tracing::debug!(adapter = %adapter_path.display(), ?args, "Spawned DAP adapter");

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Self {
            adapter,
            reader: BufReader::new(stdout),
            writer: BufWriter::new(stdin),
            seq: 1,
            event_tx,
            event_rx,
        })
    }

    /// Pop an event that was queued while a request was in flight
    pub fn try_queued_event(&mut self) -> Option<Event> {
        self.event_rx.try_recv().ok()
    }

    /// Send a request and return its sequence number
    async fn send_request(&mut self, command: &str, arguments: Option<Value>) -> Result<i64> {
        let seq = self.seq;
        self.seq += 1;

        let mut request = serde_json::json!({
            "seq": seq,
            "type": "request",
            "command": command,
        });
        if let Some(args) = arguments {
            request["arguments"] = args;
        }

        let json = serde_json::to_string(&request)?;
        tracing::trace!("DAP >>> {}", json);

        codec::write_message(&mut self.writer, &json).await?;

        Ok(seq)
    }

    /// Read the next message from the adapter
    async fn read_message(&mut self) -> Result<Value> {
        let json = codec::read_message(&mut self.reader).await?;
        tracing::trace!("DAP <<< {}", json);
        serde_json::from_str(&json).map_err(|e| Error::DapProtocol(format!("Invalid JSON: {}", e)))
    }

    /// Send a request and wait for the response
    ///
    /// Events that arrive first are queued for `try_queued_event`
    pub async fn request<T: serde::de::DeserializeOwned>(
        &mut self,
        command: &str,
        arguments: Option<Value>,
    ) -> Result<T> {
        let seq = self.send_request(command, arguments).await?;

        loop {
            let msg = self.read_message().await?;

            match msg.get("type").and_then(|v| v.as_str()).unwrap_or("unknown") {
                "response" => {
                    let response: ResponseMessage = serde_json::from_value(msg)?;

                    if response.request_seq != seq {
                        tracing::warn!(
                            request_seq = response.request_seq,
                            command = %response.command,
                            "Discarding response to an abandoned request"
                        );
                        continue;
                    }

                    if !response.success {
                        return Err(Error::dap_request_failed(
                            command,
                            &response
                                .message
                                .unwrap_or_else(|| "Unknown error".to_string()),
                        ));
                    }

                    let body = response.body.unwrap_or(Value::Null);
                    return serde_json::from_value(body).map_err(|e| {
                        Error::DapProtocol(format!("Failed to parse {} response: {}", command, e))
                    });
                }
                "event" => {
                    let event_msg: EventMessage = serde_json::from_value(msg)?;
                    let _ = self.event_tx.send(Event::from_message(&event_msg));
                }
                other => {
                    tracing::warn!("Unknown message type: {}", other);
                }
            }
        }
    }

    /// Send a request, failing with `Error::Timeout` if no response arrives in time
    pub async fn request_with_timeout<T: serde::de::DeserializeOwned>(
        &mut self,
        command: &str,
        arguments: Option<Value>,
        timeout: Duration,
    ) -> Result<T> {
        tokio::time::timeout(timeout, self.request(command, arguments))
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))?
    }

    /// Read from the adapter until the next event arrives
    pub async fn next_event(&mut self) -> Result<Event> {
        if let Some(event) = self.try_queued_event() {
            return Ok(event);
        }

        loop {
            let msg = self.read_message().await?;
            match msg.get("type").and_then(|v| v.as_str()) {
                Some("event") => {
                    let event_msg: EventMessage = serde_json::from_value(msg)?;
                    return Ok(Event::from_message(&event_msg));
                }
                Some("response") => {
                    tracing::debug!("Ignoring unsolicited response while waiting for events");
                }
                _ => tracing::warn!("Unknown message while waiting for events"),
            }
        }
    }

    /// Like `next_event`, with a deadline
    pub async fn next_event_with_timeout(&mut self, timeout: Duration) -> Result<Event> {
        tokio::time::timeout(timeout, self.next_event())
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))?
    }

    /// Initialize the debug adapter
    pub async fn initialize_with_timeout(
        &mut self,
        adapter_id: &str,
        timeout: Duration,
    ) -> Result<Capabilities> {
        let args = InitializeArguments {
            adapter_id: adapter_id.to_string(),
            ..Default::default()
        };

        self.request_with_timeout("initialize", Some(serde_json::to_value(&args)?), timeout)
            .await
    }

    /// Wait for the initialized event, queueing any other events
    pub async fn wait_initialized_with_timeout(&mut self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut deferred = Vec::new();

        let result = loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match self.next_event_with_timeout(remaining).await {
                Ok(Event::Initialized) => break Ok(()),
                Ok(event) => deferred.push(event),
                Err(e) => break Err(e),
            }
        };

        for event in deferred {
            let _ = self.event_tx.send(event);
        }
        result
    }

    /// Launch a program for debugging
    pub async fn launch(&mut self, args: LaunchArguments, timeout: Duration) -> Result<()> {
        self.request_with_timeout::<Value>("launch", Some(serde_json::to_value(&args)?), timeout)
            .await?;
        Ok(())
    }

    /// Signal that configuration is done
    pub async fn configuration_done(&mut self, timeout: Duration) -> Result<()> {
        self.request_with_timeout::<Value>("configurationDone", None, timeout)
            .await?;
        Ok(())
    }

    /// Get threads
    pub async fn threads(&mut self, timeout: Duration) -> Result<Vec<Thread>> {
        let response: ThreadsResponseBody =
            self.request_with_timeout("threads", None, timeout).await?;
        Ok(response.threads)
    }

    /// Get stack trace
    pub async fn stack_trace(
        &mut self,
        thread_id: i64,
        levels: i64,
        timeout: Duration,
    ) -> Result<Vec<StackFrame>> {
        let args = StackTraceArguments {
            thread_id,
            start_frame: Some(0),
            levels: Some(levels),
        };

        let response: StackTraceResponseBody = self
            .request_with_timeout("stackTrace", Some(serde_json::to_value(&args)?), timeout)
            .await?;

        Ok(response.stack_frames)
    }

    /// Evaluate an expression or REPL command
    pub async fn evaluate(
        &mut self,
        expression: &str,
        frame_id: Option<i64>,
        context: &str,
        timeout: Duration,
    ) -> Result<EvaluateResponseBody> {
        let args = EvaluateArguments {
            expression: expression.to_string(),
            frame_id,
            context: Some(context.to_string()),
        };

        self.request_with_timeout("evaluate", Some(serde_json::to_value(&args)?), timeout)
            .await
    }

    /// Disconnect from the debug adapter
    pub async fn disconnect(&mut self, terminate_debuggee: bool) -> Result<()> {
        let args = DisconnectArguments {
            restart: false,
            terminate_debuggee: Some(terminate_debuggee),
        };

        // Don't wait for response - adapter might exit immediately
        self.send_request("disconnect", Some(serde_json::to_value(&args)?))
            .await?;

        Ok(())
    }

    /// Terminate the debuggee and the adapter process
    pub async fn terminate(&mut self) -> Result<()> {
        if let Err(e) = self.disconnect(true).await {
            tracing::debug!(error = %e, "Disconnect failed, killing adapter");
        }

        // Give the adapter a moment to tear down the debuggee
        if tokio::time::timeout(Duration::from_millis(500), self.adapter.wait())
            .await
            .is_err()
        {
            let _ = self.adapter.kill().await;
        }

        Ok(())
    }
}

impl Drop for DapClient {
    fn drop(&mut self) {
        // Best-effort since we can't await in drop
        let _ = self.adapter.start_kill();
    }
}
