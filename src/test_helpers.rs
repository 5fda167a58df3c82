//! Shared unit-test fixtures.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::exec::{ExecResult, Executor, OutputLine, OutputStream, StreamExit, StreamRequest};

/// Scripted behaviour for a streamed command.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    /// Lines emitted on stdout.
    pub lines: Vec<String>,
    /// Returned exit.
    pub exit: StreamExit,
    /// Simulated run time; cancellation during it yields `Cancelled`.
    pub delay: Duration,
}

impl ScriptedRun {
    /// Exit 0 with no output.
    pub const fn ok() -> Self {
        Self {
            lines: Vec::new(),
            exit: StreamExit::Exited(Some(0)),
            delay: Duration::ZERO,
        }
    }

    /// Exit with `code`.
    pub const fn exit(code: i32) -> Self {
        Self {
            lines: Vec::new(),
            exit: StreamExit::Exited(Some(code)),
            delay: Duration::ZERO,
        }
    }

    /// End with an arbitrary [`StreamExit`].
    pub const fn ending(exit: StreamExit) -> Self {
        Self {
            lines: Vec::new(),
            exit,
            delay: Duration::ZERO,
        }
    }

    /// Emit `lines` before exiting.
    pub fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(ToString::to_string).collect();
        self
    }

    /// Take `delay` to finish.
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One recorded [`Executor::stream`] call.
#[derive(Debug, Clone)]
pub struct StreamCall {
    /// Program.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Extra environment.
    pub env: Vec<(String, String)>,
    /// Requested timeout.
    pub timeout: Duration,
}

/// [`Executor`] answering from canned responses keyed by command line.
///
/// `run_unchecked` looks up `"program arg arg"`; the last queued response
/// repeats. `stream` picks the first script whose needle occurs in the
/// joined arguments and defaults to a silent exit 0.
#[derive(Debug, Default)]
pub struct MockExecutor {
    on_path: HashSet<String>,
    responses: Mutex<HashMap<String, VecDeque<ExecResult>>>,
    scripts: Vec<(String, ScriptedRun)>,
    calls: Mutex<Vec<String>>,
    streams: Mutex<Vec<StreamCall>>,
}

impl MockExecutor {
    /// Empty mock: nothing on `PATH`, no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `program` as present on `PATH`.
    pub fn with_program(mut self, program: &str) -> Self {
        self.on_path.insert(program.to_string());
        self
    }

    /// Queue a response for `cmdline`.
    pub fn respond(self, cmdline: &str, success: bool, stdout: &str) -> Self {
        self.respond_result(
            cmdline,
            ExecResult {
                stdout: stdout.to_string(),
                stderr: String::new(),
                success,
                code: Some(i32::from(!success)),
            },
        )
    }

    /// Queue a full [`ExecResult`] for `cmdline`.
    pub fn respond_result(self, cmdline: &str, result: ExecResult) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(cmdline.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Script streamed commands whose arguments contain `needle`.
    pub fn script(mut self, needle: &str, run: ScriptedRun) -> Self {
        self.scripts.push((needle.to_string(), run));
        self
    }

    /// Command lines passed to `run_unchecked`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded `stream` calls, in call order.
    pub fn streamed(&self) -> Vec<StreamCall> {
        self.streams.lock().unwrap().clone()
    }
}

impl Executor for MockExecutor {
    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let cmdline = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(cmdline.clone());
        let mut responses = self.responses.lock().unwrap();
        let Some(queue) = responses.get_mut(&cmdline) else {
            anyhow::bail!("unexpected command: {cmdline}");
        };
        let result = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        result.ok_or_else(|| anyhow::anyhow!("no response for: {cmdline}"))
    }

    fn which(&self, program: &str) -> bool {
        self.on_path.contains(program)
    }

    fn stream(
        &self,
        request: &StreamRequest<'_>,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> anyhow::Result<StreamExit> {
        self.streams.lock().unwrap().push(StreamCall {
            program: request.program.to_string(),
            args: request.args.to_vec(),
            env: request.env.to_vec(),
            timeout: request.timeout,
        });
        let joined = request.args.join(" ");
        let run = self
            .scripts
            .iter()
            .find(|(needle, _)| joined.contains(needle.as_str()))
            .map_or_else(ScriptedRun::ok, |(_, run)| run.clone());

        for text in run.lines {
            on_line(OutputLine {
                stream: OutputStream::Stdout,
                text,
            });
        }
        let deadline = Instant::now() + run.delay;
        while Instant::now() < deadline {
            if request.cancel.is_cancelled() {
                return Ok(StreamExit::Cancelled);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(run.exit)
    }
}
