// src/exec/shell.rs

//! Persistent shell session.
//!
//! Commands are written to the shell's stdin one at a time. After each
//! command the shell prints a marker line, so everything read before the
//! marker is the command's output. The exit status is then asked for in a
//! second round trip under a short timeout.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use super::backend::{CommandOutput, CommandRunner};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct ShellSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    end_marker: String,
    rc_marker: String,
    rc_pattern: Regex,
    exit_probe_timeout: Duration,
}

impl ShellSession {
    /// Start `shell` and make `args` its positional parameters.
    pub async fn spawn(shell: &str, args: &[String], exit_probe_timeout: Duration) -> Result<Self> {
        let mut child = Command::new(shell)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning shell '{shell}'"))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("shell '{shell}' has no stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("shell '{shell}' has no stdout"))?;

        let nonce = session_nonce();
        let end_marker = format!("__EXECTR_END_{nonce}__");
        let rc_marker = format!("__EXECTR_RC_{nonce}__");
        let rc_pattern = Regex::new(&format!(r"^{} (-?\d+)$", regex::escape(&rc_marker)))
            .context("building exit status pattern")?;

        let positional = shlex::try_join(args.iter().map(String::as_str))
            .context("quoting script arguments")?;

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            end_marker,
            rc_marker,
            rc_pattern,
            exit_probe_timeout,
        };

        session.send(&format!("exec 2>&1\nset -- {positional}\n")).await?;

        info!(shell, pid = ?session.child.id(), args = args.len(), "shell session started");
        Ok(session)
    }

    /// Ask the shell to exit and wait briefly for it.
    pub async fn close(mut self) -> Result<()> {
        if self.send("exit\n").await.is_err() {
            debug!("shell already gone at close");
        }
        match tokio::time::timeout(self.exit_probe_timeout, self.child.wait()).await {
            Ok(status) => {
                let status = status.context("waiting for shell to exit")?;
                debug!(exit_code = ?status.code(), "shell session closed");
            }
            Err(_) => {
                warn!("shell did not exit in time; killing it");
                self.child.kill().await.context("killing shell")?;
            }
        }
        Ok(())
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        self.stdin
            .write_all(text.as_bytes())
            .await
            .context("writing to shell")?;
        self.stdin.flush().await.context("flushing shell stdin")?;
        Ok(())
    }

    async fn execute(&mut self, command: &str) -> Result<CommandOutput> {
        debug!(command, "sending command to shell");
        // Stdin is detached so the command cannot read the lines that follow it.
        let script = format!(
            "{{ {command}\n}} </dev/null\n__exectr_rc=$?\nprintf '\\n%s\\n' '{}'\n",
            self.end_marker
        );
        self.send(&script).await?;

        let output = self.read_until_marker().await?;
        let exit_code = self.probe_exit_code().await?;

        debug!(exit_code, bytes = output.len(), "command finished");
        Ok(CommandOutput { exit_code, output })
    }

    /// Collect raw output up to the end marker. Invalid UTF-8 is replaced,
    /// never treated as a read error, so the marker is always consumed.
    async fn read_until_marker(&mut self) -> Result<String> {
        let marker = self.end_marker.as_bytes();
        let mut output: Vec<u8> = Vec::new();
        let mut line: Vec<u8> = Vec::new();
        loop {
            line.clear();
            let n = self
                .stdout
                .read_until(b'\n', &mut line)
                .await
                .context("reading command output")?;
            if n == 0 {
                bail!("shell exited while a command was running");
            }
            if trim_line_end(&line) == marker {
                break;
            }
            output.extend_from_slice(&line);
        }
        // The marker is printed after a newline of its own.
        if output.last() == Some(&b'\n') {
            output.pop();
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    async fn probe_exit_code(&mut self) -> Result<i32> {
        let probe = format!("printf '%s %s\\n' '{}' \"$__exectr_rc\"\n", self.rc_marker);
        self.send(&probe).await?;

        let mut raw: Vec<u8> = Vec::new();
        let read = tokio::time::timeout(
            self.exit_probe_timeout,
            self.stdout.read_until(b'\n', &mut raw),
        );
        let n = read
            .await
            .map_err(|_| anyhow!("no exit status within {:?}", self.exit_probe_timeout))?
            .context("reading exit status")?;
        if n == 0 {
            bail!("shell exited before reporting the exit status");
        }

        let line = String::from_utf8_lossy(trim_line_end(&raw));
        let caps = self
            .rc_pattern
            .captures(&line)
            .ok_or_else(|| anyhow!("unexpected exit status line {line:?}"))?;
        caps[1]
            .parse::<i32>()
            .with_context(|| format!("parsing exit status {:?}", &caps[1]))
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl CommandRunner for ShellSession {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>> {
        Box::pin(self.execute(command))
    }
}

fn session_nonce() -> String {
    let count = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}_{count}_{nanos}", std::process::id())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    async fn bash(args: &[&str]) -> ShellSession {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        ShellSession::spawn("/bin/bash", &args, Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn captures_output_and_exit_status() {
        let mut shell = bash(&[]).await;

        let out = shell.run("echo hello").await.unwrap();
        assert_eq!(out, CommandOutput { exit_code: 0, output: "hello\n".into() });

        let out = shell.run("echo oops >&2; false").await.unwrap();
        assert_eq!(out.exit_code, 1);
        assert_eq!(out.output, "oops\n");

        let out = shell.run("printf 'no newline'").await.unwrap();
        assert_eq!(out.output, "no newline");

        shell.close().await.unwrap();
    }

    #[tokio::test]
    async fn session_state_carries_over() {
        let mut shell = bash(&["first arg", "two"]).await;

        shell.run("cd /tmp && export GREETING=hi").await.unwrap();
        let out = shell.run("echo \"$PWD $GREETING $1|$2\"").await.unwrap();
        assert_eq!(out.output, "/tmp hi first arg|two\n");

        let out = shell.run("(exit 42)").await.unwrap();
        assert_eq!(out.exit_code, 42);
        shell.close().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_utf8_output_keeps_the_session_in_sync() {
        let mut shell = bash(&[]).await;

        let out = shell.run(r"printf 'ok\n\xff\xfe\n'").await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.output.starts_with("ok\n"));
        assert!(out.output.contains('\u{FFFD}'));

        let out = shell.run("echo after").await.unwrap();
        assert_eq!(out, CommandOutput { exit_code: 0, output: "after\n".into() });
        shell.close().await.unwrap();
    }

    #[tokio::test]
    async fn commands_reading_stdin_get_eof() {
        let mut shell = bash(&[]).await;

        shell.run("(exit 7)").await.unwrap();
        // `read` hits EOF and reports its own status, not the previous one.
        let out = shell.run("read x").await.unwrap();
        assert_eq!(out.exit_code, 1);

        let out = tokio::time::timeout(Duration::from_secs(5), shell.run("cat"))
            .await
            .expect("cat must not wait on the session's stdin")
            .unwrap();
        assert_eq!(out, CommandOutput { exit_code: 0, output: String::new() });

        let out = shell.run("echo still here; (exit 4)").await.unwrap();
        assert_eq!(out, CommandOutput { exit_code: 4, output: "still here\n".into() });
        shell.close().await.unwrap();
    }

    #[tokio::test]
    async fn exiting_the_shell_is_a_runner_error() {
        let mut shell = bash(&[]).await;
        assert!(shell.run("exit 3").await.is_err());
    }
}
