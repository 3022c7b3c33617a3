//! Logging and tracing configuration
//!
//! Compact logs go to stderr; when a log directory is available a
//! full-detail copy is written to `crashprobe.log` through a non-blocking
//! appender so DAP traffic can be inspected after a failed run.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

const LOG_FILE_NAME: &str = "crashprobe.log";

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies. The returned guard flushes the file writer on drop and
/// must be held for the life of the process.
pub fn init(verbose: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("crashprobe=debug,warn")
        } else {
            EnvFilter::new("crashprobe=info,warn")
        }
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_writer = paths::log_dir().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(LOG_FILE_NAME)
            .build(dir)
            .ok()?;
        Some(tracing_appender::non_blocking(appender))
    });

    match file_writer {
        Some((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

/// Get the path to the log file
pub fn log_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join(LOG_FILE_NAME))
}

/// Truncate the log file
pub fn truncate_log() -> std::io::Result<()> {
    if let Some(path) = log_path() {
        if path.exists() {
            std::fs::write(&path, "")?;
        }
    }
    Ok(())
}

/// Return the last `lines` lines of the log file, or `None` if there is no log yet
pub fn tail_log(lines: usize) -> std::io::Result<Option<String>> {
    let Some(path) = log_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)?;
    Ok(Some(tail_lines(&content, lines)))
}

fn tail_lines(content: &str, lines: usize) -> String {
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_lines() {
        let content = "one\ntwo\nthree\nfour\n";
        assert_eq!(tail_lines(content, 2), "three\nfour");
        assert_eq!(tail_lines(content, 10), "one\ntwo\nthree\nfour");
        assert_eq!(tail_lines(content, 0), "");
    }
}
