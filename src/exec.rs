//! Process execution: one-shot probes and streamed installer commands.
//!
//! Everything that spawns a process goes through the [`Executor`] trait so
//! the engine and detectors can be exercised against scripted executors.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::io::{BufRead as _, BufReader, Read};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

/// How often a streaming run re-checks exit, timeout and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for trailing output after the process has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// One line of streamed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Source pipe.
    pub stream: OutputStream,
    /// Line text without the trailing newline.
    pub text: String,
}

/// A long-running command with its limits.
#[derive(Debug)]
pub struct StreamRequest<'a> {
    /// Program to run.
    pub program: &'a str,
    /// Arguments.
    pub args: &'a [String],
    /// Extra environment variables.
    pub env: &'a [(String, String)],
    /// Wall-clock limit.
    pub timeout: Duration,
    /// Time allowed between terminate and kill.
    pub grace: Duration,
    /// Run-wide cancellation flag.
    pub cancel: &'a CancelToken,
}

/// How a streamed command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamExit {
    /// The process exited on its own; `None` when killed by a signal.
    Exited(Option<i32>),
    /// The timeout elapsed and the process was terminated.
    TimedOut,
    /// Cancellation was requested and the process exited within the grace period.
    Cancelled,
    /// Cancellation was requested and the process had to be killed.
    Unresponsive,
}

/// Process execution facility.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command to completion, capturing output. Non-zero exit is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Return `true` if `program` is on `PATH`.
    fn which(&self, program: &str) -> bool;

    /// Run a command, passing every output line to `on_line` as it arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    fn stream(
        &self,
        request: &StreamRequest<'_>,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> Result<StreamExit>;
}

/// [`Executor`] backed by real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn stream(
        &self,
        request: &StreamRequest<'_>,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> Result<StreamExit> {
        let mut cmd = Command::new(request.program);
        cmd.args(request.args)
            .envs(request.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so terminate reaches the whole pipeline and the
        // terminal's Ctrl-C does not.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn: {}", request.program))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        if let Some(out) = child.stdout.take() {
            forward_lines(out, OutputStream::Stdout, tx.clone());
        }
        if let Some(err) = child.stderr.take() {
            forward_lines(err, OutputStream::Stderr, tx.clone());
        }
        drop(tx);

        let deadline = Instant::now() + request.timeout;
        let mut pipes_open = true;
        loop {
            if pipes_open {
                match rx.recv_timeout(POLL_INTERVAL) {
                    Ok(line) => {
                        on_line(line);
                        while let Ok(more) = rx.try_recv() {
                            on_line(more);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => pipes_open = false,
                }
            } else {
                thread::sleep(POLL_INTERVAL);
            }

            if let Some(status) = child.try_wait().context("waiting for child process")? {
                drain(&rx, on_line);
                return Ok(StreamExit::Exited(status.code()));
            }
            if request.cancel.is_cancelled() {
                let graceful = terminate(&mut child, request.grace);
                drain(&rx, on_line);
                return Ok(if graceful {
                    StreamExit::Cancelled
                } else {
                    StreamExit::Unresponsive
                });
            }
            if Instant::now() >= deadline {
                terminate(&mut child, request.grace);
                drain(&rx, on_line);
                return Ok(StreamExit::TimedOut);
            }
        }
    }
}

/// Read `pipe` line by line on a background thread, forwarding each line.
///
/// Invalid UTF-8 is replaced rather than ending the stream.
fn forward_lines<R: Read + Send + 'static>(pipe: R, stream: OutputStream, tx: Sender<OutputLine>) {
    thread::spawn(move || {
        for chunk in BufReader::new(pipe).split(b'\n') {
            let Ok(bytes) = chunk else { break };
            let text = String::from_utf8_lossy(&bytes)
                .trim_end_matches('\r')
                .to_string();
            if tx.send(OutputLine { stream, text }).is_err() {
                break;
            }
        }
    });
}

fn drain(rx: &Receiver<OutputLine>, on_line: &mut dyn FnMut(OutputLine)) {
    while let Ok(line) = rx.recv_timeout(DRAIN_TIMEOUT) {
        on_line(line);
    }
}

/// Ask the process to stop, then kill it after `grace`.
///
/// Returns `true` if it exited within the grace period.
fn terminate(child: &mut Child, grace: Duration) -> bool {
    signal_terminate(child);
    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    tracing::warn!(pid = child.id(), "process ignored termination, killing");
    signal_kill(child);
    child.kill().ok();
    child.wait().ok();
    false
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) {
    use nix::unistd::Pid;
    if let Ok(pid) = i32::try_from(child.id()) {
        nix::sys::signal::kill(Pid::from_raw(-pid), signal).ok();
    }
}

#[cfg(unix)]
fn signal_terminate(child: &Child) {
    signal_group(child, nix::sys::signal::Signal::SIGTERM);
}

#[cfg(unix)]
fn signal_kill(child: &Child) {
    signal_group(child, nix::sys::signal::Signal::SIGKILL);
}

#[cfg(not(unix))]
fn signal_terminate(child: &mut Child) {
    child.kill().ok();
}

#[cfg(not(unix))]
fn signal_kill(_child: &Child) {}

#[cfg(all(test, unix))]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    fn stream_sh(
        script: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> (StreamExit, Vec<OutputLine>) {
        let args = sh(script);
        let request = StreamRequest {
            program: "sh",
            args: &args,
            env: &[],
            timeout,
            grace: Duration::from_millis(300),
            cancel,
        };
        let mut lines = Vec::new();
        let exit = SystemExecutor
            .stream(&request, &mut |line| lines.push(line))
            .unwrap();
        (exit, lines)
    }

    #[test]
    fn run_unchecked_captures_output() {
        let result = SystemExecutor.run_unchecked("echo", &["hello"]).unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_unchecked_reports_failure() {
        let result = SystemExecutor.run_unchecked("false", &[]).unwrap();
        assert!(!result.success, "non-zero exit should set success=false");
    }

    #[test]
    fn run_unchecked_missing_program_errors() {
        assert!(
            SystemExecutor
                .run_unchecked("this-program-does-not-exist-12345", &[])
                .is_err()
        );
    }

    #[test]
    fn which_finds_sh() {
        assert!(SystemExecutor.which("sh"));
        assert!(!SystemExecutor.which("this-program-does-not-exist-12345"));
    }

    #[test]
    fn stream_forwards_both_pipes_and_exit_code() {
        let cancel = CancelToken::new();
        let (exit, lines) = stream_sh(
            "echo out; echo err >&2; exit 3",
            Duration::from_secs(10),
            &cancel,
        );
        assert_eq!(exit, StreamExit::Exited(Some(3)));
        assert!(lines.contains(&OutputLine {
            stream: OutputStream::Stdout,
            text: "out".to_string()
        }));
        assert!(lines.contains(&OutputLine {
            stream: OutputStream::Stderr,
            text: "err".to_string()
        }));
    }

    #[test]
    fn stream_passes_environment() {
        let cancel = CancelToken::new();
        let args = sh("echo \"$MAZIQ_TEST_VALUE\"");
        let env = [("MAZIQ_TEST_VALUE".to_string(), "forty-two".to_string())];
        let request = StreamRequest {
            program: "sh",
            args: &args,
            env: &env,
            timeout: Duration::from_secs(10),
            grace: Duration::from_millis(300),
            cancel: &cancel,
        };
        let mut lines = Vec::new();
        SystemExecutor
            .stream(&request, &mut |l| lines.push(l.text))
            .unwrap();
        assert_eq!(lines, ["forty-two"]);
    }

    #[test]
    fn stream_times_out() {
        let cancel = CancelToken::new();
        let started = Instant::now();
        let (exit, _) = stream_sh("sleep 30", Duration::from_millis(200), &cancel);
        assert_eq!(exit, StreamExit::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn stream_honours_cancellation() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (exit, _) = stream_sh("sleep 30", Duration::from_secs(60), &cancel);
        assert_eq!(exit, StreamExit::Cancelled);
    }

    #[test]
    fn stream_kills_process_ignoring_termination() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (exit, _) = stream_sh("trap '' TERM; sleep 30", Duration::from_secs(60), &cancel);
        assert_eq!(exit, StreamExit::Unresponsive);
    }
}
