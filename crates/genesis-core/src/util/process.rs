//! Process execution utilities.
//!
//! All invocations take argv arrays; nothing here runs a shell over
//! metadata-derived strings.

use genesis_types::Result;
use std::io::Write;
use std::process::{Command, Stdio};

/// Captured output of a finished command.
pub type Captured = (String, i32, String);

fn capture(output: std::process::Output) -> Captured {
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Execute a command synchronously.
pub fn run(command: &str, args: &[&str]) -> Result<Captured> {
    let output = Command::new(command).args(args).output()?;
    Ok(capture(output))
}

/// Execute a command feeding `input` on stdin.
///
/// Used for the TLS toolchain (`openssl x509 -text`, `openssl dhparam
/// -check`): the PEM flows over the pipe, never through an argument or a
/// shell.
pub fn run_with_stdin(command: &str, args: &[&str], input: &str) -> Result<Captured> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    Ok(capture(output))
}

/// Run a prepared async command, capturing stdout, exit code, and stderr.
///
/// The caller owns the command's argv and environment (set and cleared
/// variables alike), which is how the store client pins its target.
pub async fn capture_async(cmd: &mut tokio::process::Command) -> Result<Captured> {
    let output = cmd.output().await?;
    Ok(capture(output))
}

/// Run a prepared async command feeding `input` on stdin.
pub async fn capture_async_with_stdin(
    cmd: &mut tokio::process::Command,
    input: &str,
) -> Result<Captured> {
    use tokio::io::AsyncWriteExt;

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).await?;
    }

    let output = child.wait_with_output().await?;
    Ok(capture(output))
}

/// Redact secrets from loggable command text.
pub fn redact_secrets(output: &str, secrets: &[&str]) -> String {
    let mut redacted = output.to_string();
    for secret in secrets {
        if !secret.is_empty() {
            redacted = redacted.replace(secret, "***REDACTED***");
        }
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_secrets() {
        let out = redact_secrets("token=hunter2 ok", &["hunter2"]);
        assert_eq!(out, "token=***REDACTED*** ok");
    }

    #[test]
    fn test_run_captures_exit_code() {
        let (_, rc, _) = run("false", &[]).unwrap();
        assert_eq!(rc, 1);
    }

    #[test]
    fn test_run_with_stdin_round_trips() {
        let (stdout, rc, _) = run_with_stdin("cat", &[], "fed on stdin").unwrap();
        assert_eq!(rc, 0);
        assert_eq!(stdout, "fed on stdin");
    }

    #[tokio::test]
    async fn test_capture_async_sees_prepared_env() {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.args(["-c", "printf '%s' \"$PINNED_TARGET\""])
            .env("PINNED_TARGET", "https://vault:8200");

        let (stdout, rc, _) = capture_async(&mut cmd).await.unwrap();
        assert_eq!(rc, 0);
        assert_eq!(stdout, "https://vault:8200");
    }

    #[tokio::test]
    async fn test_capture_async_with_stdin_round_trips() {
        let mut cmd = tokio::process::Command::new("cat");
        let (stdout, rc, _) = capture_async_with_stdin(&mut cmd, "piped").await.unwrap();
        assert_eq!(rc, 0);
        assert_eq!(stdout, "piped");
    }
}
