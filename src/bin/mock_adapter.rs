//! Mock DAP adapter binary for integration testing
//!
//! This binary implements a minimal Debug Adapter Protocol server that
//! simulates a program crashing with a bad access in `GetSum` at
//! `main.cpp:25`, so crash diagnosis can be tested without a real debugger.
//!
//! Environment switches:
//! - `MOCK_ADAPTER_EXIT_CODE`: exit normally with that code instead of crashing
//! - `MOCK_ADAPTER_HANG_EVALUATE`: never answer `evaluate`
//! - `MOCK_ADAPTER_OMIT_THREAD_ID`: leave `threadId` out of the stop event

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};

const MOCK_PID: u32 = 4242;
const CRASH_THREAD: i64 = 1;
const CRASH_DESCRIPTION: &str = "EXC_BAD_ACCESS (code=1, address=0x4)";

const DIAGNOSIS: &str = "\
Thread 1 crashed with bad access at 0x4
frame #0: GetSum(f=0x0000000100008000) at main.cpp:25:21
   24   int GetSum(struct Foo *f) {
-> 25     return f->a + f->b.d;
                        ^
note: this address is not backed by valid memory
f->b is a reference to an object at address 0x0
";

const BACKTRACE: &str = "\
* thread #1, queue = 'com.apple.main-thread', stop reason = EXC_BAD_ACCESS (code=1, address=0x4)
  * frame #0: 0x0000000100003f50 a.out`GetSum(f=0x0000000100008000) at main.cpp:25:21
    frame #1: 0x0000000100003f88 a.out`main at main.cpp:30:10
";

fn main() {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let exit_code = std::env::var("MOCK_ADAPTER_EXIT_CODE")
        .ok()
        .and_then(|v| v.trim().parse().ok());
    let mut state = MockState::new(exit_code);
    state.hang_evaluate = std::env::var_os("MOCK_ADAPTER_HANG_EVALUATE").is_some();
    state.omit_thread_id = std::env::var_os("MOCK_ADAPTER_OMIT_THREAD_ID").is_some();

    loop {
        // Read Content-Length header
        let mut header_line = String::new();
        if reader.read_line(&mut header_line).unwrap_or(0) == 0 {
            break; // EOF
        }

        if !header_line.starts_with("Content-Length:") {
            continue;
        }

        let content_length: usize = header_line
            .trim_start_matches("Content-Length:")
            .trim()
            .parse()
            .unwrap_or(0);

        // Read empty line
        let mut empty_line = String::new();
        reader.read_line(&mut empty_line).ok();

        // Read JSON body
        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).is_err() {
            break;
        }

        let message: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => continue,
        };

        if let Some(messages) = state.process_message(&message) {
            for outgoing in messages {
                send_message(&mut writer, &outgoing);
            }
        }

        if state.disconnected {
            break;
        }
    }
}

fn send_message<W: Write>(writer: &mut W, message: &Value) {
    let Ok(body) = serde_json::to_string(message) else {
        return;
    };
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).ok();
    writer.write_all(body.as_bytes()).ok();
    writer.flush().ok();
}

/// Where the simulated debuggee is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Debuggee {
    NotLaunched,
    Launched,
    Crashed,
    Exited,
}

struct MockState {
    seq: i64,
    debuggee: Debuggee,
    program: String,
    /// Prefix marking repl input as a debugger command; `None` treats all
    /// repl input as commands
    command_prefix: Option<String>,
    exit_code: Option<i32>,
    hang_evaluate: bool,
    omit_thread_id: bool,
    disconnected: bool,
}

impl MockState {
    fn new(exit_code: Option<i32>) -> Self {
        Self {
            seq: 1,
            debuggee: Debuggee::NotLaunched,
            program: String::new(),
            command_prefix: None,
            exit_code,
            hang_evaluate: false,
            omit_thread_id: false,
            disconnected: false,
        }
    }

    fn next_seq(&mut self) -> i64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn event(&mut self, event: &str, body: Value) -> Value {
        json!({
            "seq": self.next_seq(),
            "type": "event",
            "event": event,
            "body": body
        })
    }

    fn process_message(&mut self, message: &Value) -> Option<Vec<Value>> {
        let msg_type = message.get("type")?.as_str()?;

        if msg_type != "request" {
            return None;
        }

        let command = message.get("command")?.as_str()?;
        let request_seq = message.get("seq")?.as_i64()?;
        let arguments = message.get("arguments").cloned().unwrap_or(json!({}));

        if command == "evaluate" && self.hang_evaluate {
            return None;
        }

        let seq = self.next_seq();
        // Events that follow the response
        let mut events = Vec::new();

        let result: Result<Value, String> = match command {
            "initialize" => Ok(json!({
                "supportsConfigurationDoneRequest": true,
                "supportsEvaluateForHovers": true,
                "supportsTerminateRequest": true
            })),
            "launch" => {
                self.program = arguments
                    .get("program")
                    .and_then(|v| v.as_str())
                    .unwrap_or("a.out")
                    .to_string();
                self.command_prefix = arguments
                    .get("commandEscapePrefix")
                    .and_then(|v| v.as_str())
                    .filter(|p| !p.is_empty())
                    .map(String::from);
                self.debuggee = Debuggee::Launched;

                let process_body = json!({
                    "name": &self.program,
                    "systemProcessId": MOCK_PID,
                    "isLocalProcess": true,
                    "startMethod": "launch"
                });
                let process = self.event("process", process_body);
                events.push(process);
                let initialized = self.event("initialized", Value::Null);
                events.push(initialized);
                Ok(Value::Null)
            }
            "configurationDone" => {
                if self.debuggee != Debuggee::Launched {
                    Err("configurationDone before launch".to_string())
                } else {
                    events.extend(self.run_debuggee());
                    Ok(Value::Null)
                }
            }
            "threads" => {
                if self.debuggee == Debuggee::Crashed {
                    Ok(json!({
                        "threads": [
                            { "id": CRASH_THREAD, "name": "main" }
                        ]
                    }))
                } else {
                    Ok(json!({ "threads": [] }))
                }
            }
            "stackTrace" => {
                if self.debuggee == Debuggee::Crashed {
                    Ok(json!({
                        "stackFrames": [
                            {
                                "id": 1000,
                                "name": "GetSum",
                                "source": { "name": "main.cpp", "path": "/test/main.cpp" },
                                "line": 25,
                                "column": 21,
                                "instructionPointerReference": "0x0000000100003f50"
                            },
                            {
                                "id": 1001,
                                "name": "main",
                                "source": { "name": "main.cpp", "path": "/test/main.cpp" },
                                "line": 30,
                                "column": 10,
                                "instructionPointerReference": "0x0000000100003f88"
                            }
                        ],
                        "totalFrames": 2
                    }))
                } else {
                    Err("invalid thread".to_string())
                }
            }
            "evaluate" => {
                let expression = arguments
                    .get("expression")
                    .and_then(|e| e.as_str())
                    .unwrap_or("");
                let context = arguments
                    .get("context")
                    .and_then(|c| c.as_str())
                    .unwrap_or("");
                self.evaluate(expression, context)
            }
            "disconnect" | "terminate" => {
                if self.debuggee == Debuggee::Crashed || self.debuggee == Debuggee::Launched {
                    self.debuggee = Debuggee::Exited;
                }
                self.disconnected = command == "disconnect";
                Ok(Value::Null)
            }
            _ => Err(format!("Unknown command: {}", command)),
        };

        let response = match result {
            Ok(body) => json!({
                "seq": seq,
                "type": "response",
                "request_seq": request_seq,
                "success": true,
                "command": command,
                "body": body
            }),
            Err(message) => json!({
                "seq": seq,
                "type": "response",
                "request_seq": request_seq,
                "success": false,
                "command": command,
                "message": message
            }),
        };

        let mut messages = vec![response];
        messages.extend(events);
        Some(messages)
    }

    /// Let the debuggee run to its crash, or to its exit
    fn run_debuggee(&mut self) -> Vec<Value> {
        if let Some(code) = self.exit_code {
            self.debuggee = Debuggee::Exited;
            return vec![
                self.event("exited", json!({ "exitCode": code })),
                self.event("terminated", Value::Null),
            ];
        }

        self.debuggee = Debuggee::Crashed;
        let output_body = json!({
            "category": "console",
            "output": format!("Launching: {}\n", self.program)
        });
        let mut stopped_body = json!({
            "reason": "exception",
            "description": CRASH_DESCRIPTION,
            "threadId": CRASH_THREAD,
            "allThreadsStopped": true
        });
        if self.omit_thread_id {
            if let Some(body) = stopped_body.as_object_mut() {
                body.remove("threadId");
            }
        }
        vec![
            self.event("output", output_body),
            self.event("stopped", stopped_body),
        ]
    }

    fn evaluate(&self, expression: &str, context: &str) -> Result<Value, String> {
        if context != "repl" {
            return Err(format!("error: use of undeclared identifier '{}'", expression));
        }

        let command = match &self.command_prefix {
            Some(prefix) => match expression.strip_prefix(prefix.as_str()) {
                Some(command) => command,
                None => {
                    return Err(format!(
                        "error: use of undeclared identifier '{}'",
                        expression
                    ))
                }
            },
            None => expression,
        };
        let command = command.trim();

        if self.debuggee != Debuggee::Crashed {
            return Err(format!(
                "error: '{}' requires a stopped process",
                command
            ));
        }

        let output = match command {
            "frame diagnose" => DIAGNOSIS,
            "thread backtrace" | "bt" => BACKTRACE,
            _ => return Err(format!("error: '{}' is not a valid command.", command)),
        };

        Ok(json!({
            "result": output,
            "variablesReference": 0
        }))
    }
}
