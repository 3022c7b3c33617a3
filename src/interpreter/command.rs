//! Debugger command parsing

use std::path::PathBuf;

use crate::common::{Error, Result};

/// A debugger command as typed at the `(lldb)` prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand {
    /// `file <path>`: select the executable to debug
    File(PathBuf),
    /// `run`: launch the selected executable
    Run,
    /// `thread list`
    ThreadList,
    /// `process status`
    ProcessStatus,
    /// `process kill`
    Kill,
    /// Anything else, passed through to the debugger's own interpreter
    Raw(String),
}

impl DebuggerCommand {
    /// Parse one command line
    ///
    /// Whitespace between words is not significant, so `thread   list`
    /// parses the same as `thread list`.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Err(Error::InvalidCommand("empty command".to_string()));
        };
        let rest: Vec<&str> = words.collect();

        let cmd = match (first, rest.as_slice()) {
            ("file" | "target", _) => {
                let arg = if first == "target" {
                    match rest.as_slice() {
                        ["create", ..] => line["target".len()..].trim_start()["create".len()..].trim(),
                        _ => return Ok(Self::Raw(line.to_string())),
                    }
                } else {
                    line["file".len()..].trim()
                };
                let path = unquote(arg);
                if path.is_empty() {
                    return Err(Error::InvalidCommand(format!(
                        "'{}' requires an executable path",
                        first
                    )));
                }
                Self::File(PathBuf::from(path))
            }
            ("run" | "r", []) => Self::Run,
            ("process", ["launch"]) => Self::Run,
            ("thread", ["list"]) => Self::ThreadList,
            ("process", ["status"]) => Self::ProcessStatus,
            ("process", ["kill"]) | ("kill", []) => Self::Kill,
            _ => Self::Raw(line.to_string()),
        };

        Ok(cmd)
    }
}

impl std::fmt::Display for DebuggerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Run => write!(f, "run"),
            Self::ThreadList => write!(f, "thread list"),
            Self::ProcessStatus => write!(f, "process status"),
            Self::Kill => write!(f, "process kill"),
            Self::Raw(text) => write!(f, "{}", text),
        }
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file() {
        assert_eq!(
            DebuggerCommand::parse("file /tmp/build/a.out").unwrap(),
            DebuggerCommand::File(PathBuf::from("/tmp/build/a.out"))
        );
        assert_eq!(
            DebuggerCommand::parse("file \"/tmp/my build/a.out\"").unwrap(),
            DebuggerCommand::File(PathBuf::from("/tmp/my build/a.out"))
        );
        assert_eq!(
            DebuggerCommand::parse("target create ./a.out").unwrap(),
            DebuggerCommand::File(PathBuf::from("./a.out"))
        );
    }

    #[test]
    fn test_parse_file_without_path() {
        assert!(matches!(
            DebuggerCommand::parse("file"),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_parse_builtin_commands() {
        assert_eq!(DebuggerCommand::parse("run").unwrap(), DebuggerCommand::Run);
        assert_eq!(DebuggerCommand::parse("r").unwrap(), DebuggerCommand::Run);
        assert_eq!(
            DebuggerCommand::parse("process launch").unwrap(),
            DebuggerCommand::Run
        );
        assert_eq!(
            DebuggerCommand::parse("  thread   list ").unwrap(),
            DebuggerCommand::ThreadList
        );
        assert_eq!(
            DebuggerCommand::parse("process status").unwrap(),
            DebuggerCommand::ProcessStatus
        );
        assert_eq!(DebuggerCommand::parse("kill").unwrap(), DebuggerCommand::Kill);
    }

    #[test]
    fn test_parse_passthrough() {
        assert_eq!(
            DebuggerCommand::parse("frame diagnose").unwrap(),
            DebuggerCommand::Raw("frame diagnose".to_string())
        );
        // Extra arguments fall through to the debugger
        assert_eq!(
            DebuggerCommand::parse("run --arg").unwrap(),
            DebuggerCommand::Raw("run --arg".to_string())
        );
        assert_eq!(
            DebuggerCommand::parse("target list").unwrap(),
            DebuggerCommand::Raw("target list".to_string())
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(DebuggerCommand::parse("   ").is_err());
    }
}
