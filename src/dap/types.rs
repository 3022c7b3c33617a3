//! DAP message types
//!
//! The subset of the Debug Adapter Protocol needed to launch a program,
//! observe how it stops and issue REPL commands against the stopped frame.
//! See: https://microsoft.github.io/debug-adapter-protocol/specification

use serde::{Deserialize, Serialize};
use serde_json::Value;

// === Base Protocol Messages ===

/// DAP response message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub seq: i64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// DAP event message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub seq: i64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

// === Request Arguments ===

/// Initialize request arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    pub lines_start_at1: bool,
    pub columns_start_at1: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_format: Option<String>,
    pub supports_variable_type: bool,
    pub supports_run_in_terminal_request: bool,
}

impl Default for InitializeArguments {
    fn default() -> Self {
        Self {
            client_id: Some("crashprobe".to_string()),
            client_name: Some("crashprobe".to_string()),
            adapter_id: "lldb-dap".to_string(),
            lines_start_at1: true,
            columns_start_at1: true,
            path_format: Some("path".to_string()),
            supports_variable_type: true,
            supports_run_in_terminal_request: false,
        }
    }
}

/// Launch request arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArguments {
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default)]
    pub stop_on_entry: bool,

    // === lldb-dap specific ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_commands: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_escape_prefix: Option<String>,
}

/// StackTrace request arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    pub thread_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<i64>,
}

/// Evaluate request arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Disconnect request arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    #[serde(default)]
    pub restart: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
}

// === Response Bodies ===

/// Capabilities returned by initialize response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub supports_configuration_done_request: bool,
    #[serde(default)]
    pub supports_evaluate_for_hovers: bool,
    #[serde(default)]
    pub supports_terminate_request: bool,
    #[serde(default)]
    pub supports_exception_info_request: bool,
}

/// StackTrace response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceResponseBody {
    pub stack_frames: Vec<StackFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<i64>,
}

/// Threads response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsResponseBody {
    pub threads: Vec<Thread>,
}

/// Evaluate response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponseBody {
    pub result: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub variables_reference: i64,
}

// === Common Types ===

/// Source location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Stack frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_pointer_reference: Option<String>,
}

impl StackFrame {
    /// Short `function at file:line` rendering, omitting the location when unknown
    pub fn location(&self) -> String {
        let file = self
            .source
            .as_ref()
            .and_then(|s| s.name.clone().or_else(|| s.path.clone()));
        match file {
            Some(file) if self.line > 0 => format!("{} at {}:{}", self.name, file, self.line),
            _ => self.name.clone(),
        }
    }
}

/// Thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub name: String,
}

// === Event Bodies ===

/// Stopped event body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    #[serde(default)]
    pub all_threads_stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl StoppedEventBody {
    /// The most specific human-readable stop reason the adapter gave
    pub fn summary(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.text.clone())
            .unwrap_or_else(|| self.reason.clone())
    }
}

/// Output event body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEventBody {
    pub category: Option<String>,
    pub output: String,
}

/// Thread event body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadEventBody {
    pub reason: String,
    pub thread_id: i64,
}

/// Exited event body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitedEventBody {
    pub exit_code: i32,
}

/// Process event body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEventBody {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_process_id: Option<u32>,
}

// === Parsed Events ===

/// Parsed DAP event
#[derive(Debug, Clone)]
pub enum Event {
    Initialized,
    Stopped(StoppedEventBody),
    Continued { thread_id: i64 },
    Exited(ExitedEventBody),
    Terminated,
    Thread(ThreadEventBody),
    Output(OutputEventBody),
    Process(ProcessEventBody),
    Unknown { event: String, body: Option<Value> },
}

impl Event {
    /// Parse an event from an EventMessage
    ///
    /// Bodies that fail to deserialize produce `Event::Unknown` rather than an error
    pub fn from_message(msg: &EventMessage) -> Self {
        fn parse<T: serde::de::DeserializeOwned>(msg: &EventMessage) -> Option<T> {
            msg.body
                .as_ref()
                .and_then(|b| serde_json::from_value(b.clone()).ok())
        }

        let parsed = match msg.event.as_str() {
            "initialized" => Some(Event::Initialized),
            "stopped" => parse(msg).map(Event::Stopped),
            "continued" => Some(Event::Continued {
                thread_id: msg
                    .body
                    .as_ref()
                    .and_then(|b| b.get("threadId"))
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0),
            }),
            "exited" => Some(Event::Exited(
                parse(msg).unwrap_or(ExitedEventBody { exit_code: 0 }),
            )),
            "terminated" => Some(Event::Terminated),
            "thread" => parse(msg).map(Event::Thread),
            "output" => parse(msg).map(Event::Output),
            "process" => parse(msg).map(Event::Process),
            _ => None,
        };

        parsed.unwrap_or_else(|| Event::Unknown {
            event: msg.event.clone(),
            body: msg.body.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str, body: Option<Value>) -> EventMessage {
        EventMessage {
            seq: 1,
            message_type: "event".to_string(),
            event: name.to_string(),
            body,
        }
    }

    #[test]
    fn test_parse_exception_stop() {
        let msg = event(
            "stopped",
            Some(json!({
                "reason": "exception",
                "description": "EXC_BAD_ACCESS (code=1, address=0x4)",
                "threadId": 7,
                "allThreadsStopped": true
            })),
        );

        match Event::from_message(&msg) {
            Event::Stopped(body) => {
                assert_eq!(body.reason, "exception");
                assert_eq!(body.thread_id, Some(7));
                assert_eq!(body.summary(), "EXC_BAD_ACCESS (code=1, address=0x4)");
            }
            other => panic!("Expected Stopped, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_summary_falls_back_to_reason() {
        let body = StoppedEventBody {
            reason: "signal".to_string(),
            description: None,
            thread_id: None,
            all_threads_stopped: false,
            text: None,
        };
        assert_eq!(body.summary(), "signal");
    }

    #[test]
    fn test_parse_process_event() {
        let msg = event(
            "process",
            Some(json!({"name": "/tmp/a.out", "systemProcessId": 4242, "startMethod": "launch"})),
        );

        match Event::from_message(&msg) {
            Event::Process(body) => {
                assert_eq!(body.name, "/tmp/a.out");
                assert_eq!(body.system_process_id, Some(4242));
            }
            other => panic!("Expected Process, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_body_is_unknown() {
        let msg = event("stopped", Some(json!({"threadId": 1})));
        assert!(matches!(Event::from_message(&msg), Event::Unknown { .. }));
    }

    #[test]
    fn test_exited_without_body_defaults_to_zero() {
        match Event::from_message(&event("exited", None)) {
            Event::Exited(body) => assert_eq!(body.exit_code, 0),
            other => panic!("Expected Exited, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_location() {
        let frame = StackFrame {
            id: 1,
            name: "GetSum(Foo*)".to_string(),
            source: Some(Source {
                name: Some("main.cpp".to_string()),
                path: Some("/src/main.cpp".to_string()),
            }),
            line: 25,
            column: 3,
            instruction_pointer_reference: None,
        };
        assert_eq!(frame.location(), "GetSum(Foo*) at main.cpp:25");

        let bare = StackFrame {
            source: None,
            ..frame
        };
        assert_eq!(bare.location(), "GetSum(Foo*)");
    }
}
