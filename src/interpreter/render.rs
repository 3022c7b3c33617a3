//! LLDB-style text rendering of process and thread state

/// One row of `thread list` output
#[derive(Debug, Clone)]
pub struct ThreadLine {
    pub id: i64,
    pub name: String,
    /// `function at file:line` of the top frame, when known
    pub location: Option<String>,
    /// Set for the thread that caused the stop
    pub stop_reason: Option<String>,
}

/// `Process 4242` or just `Process` before the adapter reports a pid
pub fn process_label(pid: Option<u32>) -> String {
    match pid {
        Some(pid) => format!("Process {}", pid),
        None => "Process".to_string(),
    }
}

/// Render `thread list` output
///
/// ```text
/// Process 4242 stopped
/// * thread #1: tid = 1, GetSum(Foo*) at main.cpp:25, name = 'main', stop reason = EXC_BAD_ACCESS (code=1, address=0x4)
///   thread #2: tid = 2, name = 'worker'
/// ```
pub fn render_thread_list(pid: Option<u32>, state: &str, threads: &[ThreadLine]) -> String {
    let mut out = format!("{} {}\n", process_label(pid), state);

    for (index, thread) in threads.iter().enumerate() {
        let marker = if thread.stop_reason.is_some() { '*' } else { ' ' };
        out.push_str(&format!("{} thread #{}: tid = {}", marker, index + 1, thread.id));
        if let Some(location) = &thread.location {
            out.push_str(&format!(", {}", location));
        }
        if !thread.name.is_empty() {
            out.push_str(&format!(", name = '{}'", thread.name));
        }
        if let Some(reason) = &thread.stop_reason {
            out.push_str(&format!(", stop reason = {}", reason));
        }
        out.push('\n');
    }

    out
}

/// Architecture name as LLDB prints it for the host
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" if cfg!(target_os = "macos") => "arm64",
        arch => arch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stopped_thread_list() {
        let threads = vec![
            ThreadLine {
                id: 1,
                name: "main".to_string(),
                location: Some("GetSum(Foo*) at main.cpp:25".to_string()),
                stop_reason: Some("EXC_BAD_ACCESS (code=1, address=0x4)".to_string()),
            },
            ThreadLine {
                id: 2,
                name: String::new(),
                location: None,
                stop_reason: None,
            },
        ];

        let out = render_thread_list(Some(4242), "stopped", &threads);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "Process 4242 stopped");
        assert_eq!(
            lines[1],
            "* thread #1: tid = 1, GetSum(Foo*) at main.cpp:25, name = 'main', stop reason = EXC_BAD_ACCESS (code=1, address=0x4)"
        );
        assert_eq!(lines[2], "  thread #2: tid = 2");
    }

    #[test]
    fn test_render_without_pid() {
        let out = render_thread_list(None, "running", &[]);
        assert_eq!(out, "Process running\n");
    }
}
