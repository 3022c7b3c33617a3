//! Text command interpreter
//!
//! Scenarios talk to the debugger the way a person at the `(lldb)` prompt
//! would: one command line in, a success flag plus output text back. The
//! [`CommandInterpreter`] trait is that seam; [`DapInterpreter`] implements
//! it over a DAP session.

mod command;
mod dap;
mod render;

pub use command::DebuggerCommand;
pub use dap::DapInterpreter;
pub use render::{render_thread_list, ThreadLine};

use async_trait::async_trait;

use crate::common::Result;

/// Outcome of one command, mirroring what the debugger prints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReturn {
    /// Whether the debugger accepted and completed the command
    pub succeeded: bool,
    /// Regular output
    pub output: String,
    /// Error output
    pub error: String,
}

impl CommandReturn {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: String::new(),
            error: error.into(),
        }
    }

    /// The text an expectation is matched against
    pub fn text(&self) -> &str {
        if self.succeeded {
            &self.output
        } else {
            &self.error
        }
    }
}

/// Something that executes debugger command lines
///
/// `Err` is reserved for infrastructure failures (adapter crash, protocol
/// error, timeout). A command the debugger rejects is an `Ok` with
/// `succeeded == false`.
#[async_trait]
pub trait CommandInterpreter: Send {
    /// Execute one command line
    async fn handle_command(&mut self, line: &str) -> Result<CommandReturn>;

    /// Tear down any debuggee and adapter
    async fn shutdown(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_follows_success() {
        let ok = CommandReturn::success("Process 1 stopped");
        assert_eq!(ok.text(), "Process 1 stopped");

        let failed = CommandReturn::failure("error: invalid target");
        assert_eq!(failed.text(), "error: invalid target");
        assert!(failed.output.is_empty());
    }
}
