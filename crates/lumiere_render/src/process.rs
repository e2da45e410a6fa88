//! Child process execution with a deadline.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Why a child process produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// The program could not be started
    Spawn(String),
    /// The deadline elapsed and the child was killed
    Timeout(u64),
}

/// Runs `command` to completion, killing it if `timeout_secs` elapses.
pub async fn run_with_timeout(mut command: Command, timeout_secs: u64) -> Result<Output, RunFailure> {
    command.kill_on_drop(true);
    match tokio::time::timeout(Duration::from_secs(timeout_secs), command.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(RunFailure::Spawn(e.to_string())),
        Err(_) => Err(RunFailure::Timeout(timeout_secs)),
    }
}

/// Last `max_lines` lines of a diagnostic stream.
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_lines() {
        let text = (1..=50).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let tail = tail_lines(&text, 40);
        assert_eq!(tail.lines().count(), 40);
        assert!(tail.starts_with("line 11"));
        assert!(tail.ends_with("line 50"));
        assert_eq!(tail_lines("short", 40), "short");
    }
}
