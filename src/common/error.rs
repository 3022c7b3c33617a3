//! Error types for crashprobe
//!
//! Messages name the command, path or adapter involved so a failing
//! scenario can be diagnosed from the report alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for crashprobe
#[derive(Error, Debug)]
pub enum Error {
    // === Adapter Errors ===
    #[error("Debug adapter '{name}' not found. Searched: {searched}")]
    AdapterNotFound { name: String, searched: String },

    #[error("Debug adapter failed to start: {0}")]
    AdapterStartFailed(String),

    #[error("Debug adapter crashed unexpectedly")]
    AdapterCrashed,

    // === DAP Protocol Errors ===
    #[error("DAP protocol error: {0}")]
    DapProtocol(String),

    #[error("DAP request '{command}' failed: {message}")]
    DapRequestFailed { command: String, message: String },

    // === Session Errors ===
    #[error("No executable set. Use 'file <path>' before 'run'")]
    NoTarget,

    #[error("No process is being debugged. Use 'run' first")]
    SessionNotActive,

    #[error("Program has exited with code {0}")]
    ProgramExited(i32),

    #[error("Cannot {action} while process is {state}")]
    InvalidState { action: String, state: String },

    // === Command Errors ===
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // === Timeout Errors ===
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Process did not stop or exit within {0} seconds")]
    StopTimeout(u64),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Build Errors ===
    #[error("Build command '{command}' failed ({status}):\n{stderr}")]
    BuildFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Compiler '{0}' not found on PATH")]
    CompilerNotFound(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scenario file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),
}

impl Error {
    /// Create an adapter not found error with search paths
    pub fn adapter_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::AdapterNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a DAP request failed error
    pub fn dap_request_failed(command: &str, message: &str) -> Self {
        Self::DapRequestFailed {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(action: &str, state: &str) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Whether this error came from the debugger rejecting a request,
    /// as opposed to the connection itself failing
    pub fn is_command_failure(&self) -> bool {
        matches!(
            self,
            Error::DapRequestFailed { .. }
                | Error::NoTarget
                | Error::SessionNotActive
                | Error::ProgramExited(_)
                | Error::InvalidState { .. }
                | Error::InvalidCommand(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failures_are_command_failures() {
        assert!(Error::dap_request_failed("evaluate", "bad").is_command_failure());
        assert!(Error::NoTarget.is_command_failure());
        assert!(Error::InvalidCommand("frob".to_string()).is_command_failure());
        assert!(!Error::AdapterCrashed.is_command_failure());
        assert!(!Error::StopTimeout(5).is_command_failure());
    }

    #[test]
    fn test_build_failed_message_includes_stderr() {
        let err = Error::BuildFailed {
            command: "c++ -g main.cpp".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "main.cpp:3: error: expected ';'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("c++ -g main.cpp"));
        assert!(msg.contains("expected ';'"));
    }
}
