//! Process execution utilities with timeout support
//!
//! Runs external tools (yt-dlp, ffmpeg, the python helper) with bounded
//! timeouts so a hung process can never block a job indefinitely. A timed
//! out child is killed rather than orphaned.

use std::time::Duration;

use tokio::process::Command;

use crate::core::config::limits;
use crate::core::error::AppError;

/// Run an external tool and wait for it to exit, bounded by `timeout`.
///
/// Resolves with trimmed stdout on exit code 0. On a non-zero exit the
/// error carries the captured stderr, falling back to stdout, falling back
/// to the exit status. On timeout the child is killed and the error kind
/// is `Timeout`.
pub async fn run_tool(program: &str, args: &[String], timeout: Duration) -> Result<String, AppError> {
    log::debug!("[run] {} {}", program, args.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(AppError::ToolExecution(format!("failed to spawn {}: {}", program, e)));
        }
        Err(_) => {
            log::warn!("[run] {} timed out after {}s, killing", program, timeout.as_secs());
            return Err(AppError::Timeout(timeout.as_secs()));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if output.status.success() {
        if !stderr.trim().is_empty() {
            log::debug!("[run] {} stderr: {}", program, stderr.trim());
        }
        return Ok(stdout.trim().to_string());
    }

    log::debug!("[run] {} exited with {}", program, output.status);

    let detail = if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else if !stdout.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    };

    Err(AppError::ToolExecution(detail))
}

/// Bound diagnostic text to its last lines so error responses stay small.
///
/// Keeps at most `STDERR_TAIL_LINES` lines and `STDERR_TAIL_CHARS`
/// characters, from the end of the text.
pub fn stderr_tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(limits::STDERR_TAIL_LINES);
    let mut tail = lines[start..].join("\n");

    if tail.len() > limits::STDERR_TAIL_CHARS {
        // Cut from the front, keeping the end of the output
        let cut = tail.len() - limits::STDERR_TAIL_CHARS;
        let mut boundary = cut;
        while !tail.is_char_boundary(boundary) {
            boundary += 1;
        }
        tail = tail[boundary..].to_string();
    }

    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_tool_captures_stdout() {
        let out = run_tool("echo", &["hello".to_string()], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_run_tool_nonzero_exit() {
        let err = run_tool(
            "sh",
            &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            AppError::ToolExecution(msg) => assert_eq!(msg, "oops"),
            other => panic!("expected ToolExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_tool_exit_code_fallback() {
        // No stderr and no stdout: the exit code itself is the diagnostic
        let err = run_tool(
            "sh",
            &["-c".to_string(), "exit 7".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            AppError::ToolExecution(msg) => assert_eq!(msg, "exit code 7"),
            other => panic!("expected ToolExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_tool_spawn_failure() {
        let err = run_tool("definitely-not-a-real-binary-xyz", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ToolExecution(_)));
    }

    #[tokio::test]
    async fn test_run_tool_timeout() {
        let err = run_tool(
            "sh",
            &["-c".to_string(), "sleep 10".to_string()],
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let text: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&text);
        assert!(tail.ends_with("line 99"));
        assert_eq!(tail.lines().count(), limits::STDERR_TAIL_LINES);
        assert!(!tail.contains("line 0\n"));
    }

    #[test]
    fn test_stderr_tail_short_input_unchanged() {
        assert_eq!(stderr_tail("just one line"), "just one line");
    }

    #[test]
    fn test_stderr_tail_char_cap() {
        let long_line = "x".repeat(5000);
        let tail = stderr_tail(&long_line);
        assert!(tail.len() <= limits::STDERR_TAIL_CHARS);
    }
}
