// Shared helpers for integration tests.
//
// Provides a simulated machine implementing the public `Executor` trait:
// probes answer from an in-memory set of installed tools and recipes of the
// form `fake <action> <id>` change that set. Each test builds its own
// catalog from a compact dependency table.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use maziq::cancel::CancelToken;
use maziq::catalog::{Action, Catalog, SoftwareId};
use maziq::config::RunConfig;
use maziq::config::manifest::LatestVersions;
use maziq::engine::ExecutionEngine;
use maziq::exec::{ExecResult, Executor, OutputLine, OutputStream, StreamExit, StreamRequest};
use maziq::orchestrator::{EventBus, Orchestrator, RunReport};
use maziq::status::StatusDetector;

/// Build a catalog of script entries from `(id, "dep dep ...")` pairs.
///
/// Every entry is probed with `<id> --version` and uses `fake <action> <id>`
/// recipes.
pub fn catalog(spec: &[(&str, &str)]) -> Catalog {
    let mut toml = String::new();
    for (id, deps) in spec {
        let deps: Vec<String> = deps.split_whitespace().map(|d| format!("\"{d}\"")).collect();
        write!(
            toml,
            "[[software]]\n\
             id = \"{id}\"\n\
             name = \"{id}\"\n\
             category = \"Test\"\n\
             installer = \"script\"\n\
             probe = {{ kind = \"command\", program = \"{id}\", args = [\"--version\"] }}\n\
             dependencies = [{}]\n\
             install = {{ shell = \"fake install {id}\" }}\n\
             update = {{ shell = \"fake update {id}\" }}\n\
             uninstall = {{ shell = \"fake uninstall {id}\" }}\n\n",
            deps.join(", ")
        )
        .unwrap();
    }
    maziq::config::catalog::parse(&toml, Path::new("test-catalog.toml")).expect("valid catalog")
}

/// Convert string ids.
pub fn ids(list: &[&str]) -> Vec<SoftwareId> {
    list.iter().map(|s| SoftwareId::from(*s)).collect()
}

/// An in-memory machine.
#[derive(Debug, Default)]
pub struct FakeMachine {
    installed: Mutex<BTreeMap<String, String>>,
    failing: Mutex<BTreeSet<String>>,
    delay: Mutex<Duration>,
    running: AtomicUsize,
    peak: AtomicUsize,
    ran: Mutex<Vec<String>>,
    touched: AtomicUsize,
}

impl FakeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as installed at `version`.
    pub fn with_installed(self, id: &str, version: &str) -> Self {
        self.installed
            .lock()
            .unwrap()
            .insert(id.to_string(), version.to_string());
        self
    }

    /// Make every recipe for `id` exit 1.
    pub fn failing(self, id: &str) -> Self {
        self.failing.lock().unwrap().insert(id.to_string());
        self
    }

    /// Make every recipe take `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn is_installed(&self, id: &str) -> bool {
        self.installed.lock().unwrap().contains_key(id)
    }

    /// Recipes run so far, as `"<action> <id>"`, in start order.
    pub fn ran(&self) -> Vec<String> {
        self.ran.lock().unwrap().clone()
    }

    /// Number of executor calls of any kind.
    pub fn touched(&self) -> usize {
        self.touched.load(Ordering::SeqCst)
    }

    /// Highest number of recipes running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Executor for FakeMachine {
    fn run_unchecked(&self, program: &str, _args: &[&str]) -> anyhow::Result<ExecResult> {
        self.touched.fetch_add(1, Ordering::SeqCst);
        Ok(match self.installed.lock().unwrap().get(program) {
            Some(version) => ExecResult {
                stdout: format!("{program} {version}\n"),
                success: true,
                code: Some(0),
                ..ExecResult::default()
            },
            None => ExecResult {
                success: false,
                code: Some(127),
                ..ExecResult::default()
            },
        })
    }

    fn which(&self, program: &str) -> bool {
        self.touched.fetch_add(1, Ordering::SeqCst);
        self.is_installed(program)
    }

    fn stream(
        &self,
        request: &StreamRequest<'_>,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> anyhow::Result<StreamExit> {
        self.touched.fetch_add(1, Ordering::SeqCst);
        let script = request.args.last().cloned().unwrap_or_default();
        let words: Vec<&str> = script.split_whitespace().collect();
        let [_, action, id] = words.as_slice() else {
            anyhow::bail!("unexpected script: {script}");
        };
        let (action, id) = (action.to_string(), id.to_string());
        self.ran.lock().unwrap().push(format!("{action} {id}"));

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let deadline = Instant::now() + *self.delay.lock().unwrap();
        let mut cancelled = false;
        while Instant::now() < deadline {
            if request.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        self.running.fetch_sub(1, Ordering::SeqCst);
        if cancelled {
            return Ok(StreamExit::Cancelled);
        }

        on_line(OutputLine {
            stream: OutputStream::Stdout,
            text: format!("==> {action} {id}"),
        });
        if self.failing.lock().unwrap().contains(&id) {
            on_line(OutputLine {
                stream: OutputStream::Stderr,
                text: format!("error: {id} exploded"),
            });
            return Ok(StreamExit::Exited(Some(1)));
        }
        let mut installed = self.installed.lock().unwrap();
        match action.as_str() {
            "install" => {
                installed.insert(id, "1.0.0".to_string());
            }
            "update" => {
                installed.insert(id, "2.0.0".to_string());
            }
            _ => {
                installed.remove(&id);
            }
        }
        Ok(StreamExit::Exited(Some(0)))
    }
}

/// An orchestrator over `machine` with the given latest versions.
pub fn orchestrator(catalog: Catalog, machine: &Arc<FakeMachine>, latest: LatestVersions) -> Orchestrator {
    let executor: Arc<dyn Executor> = Arc::clone(machine) as Arc<dyn Executor>;
    let detector =
        StatusDetector::new(Arc::clone(&executor), Arc::new(latest)).with_app_dirs(Vec::new());
    Orchestrator::new(Arc::new(catalog), ExecutionEngine::new(executor, detector))
}

/// Run with a fresh token and bus.
pub fn run(orch: &Orchestrator, order: &[SoftwareId], action: Action, config: &RunConfig) -> RunReport {
    orch.run(order, action, config, &CancelToken::new(), &EventBus::new())
        .expect("order accepted")
}
