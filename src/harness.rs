//! Query harness (spec §4.10): presents the C7 surface to in-process
//! callers, routing each call to a local per-call graph load or to a
//! persistent daemon connection, falling back to local transparently
//! on daemon failure.
//!
//! Modeled per spec §9 as a tagged variant (`Mode::Local` /
//! `Mode::Daemon`), not a trait object — "transitions are explicit
//! state changes, not polymorphism."

use std::fs;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use serde_json::{json, Value};
use tracing::warn;

use crate::codec;
use crate::config::EngineConfig;
use crate::daemon;
use crate::domain::graph::Graph;
use crate::error::{CodegraphError, ErrorKind, Result};
use crate::ipc::{self, Request};
use crate::ppr::PprParams;

enum Mode {
    Local,
    Daemon { stream: UnixStream },
}

/// Routes C7-shaped queries either to a live daemon connection or to a
/// fresh local load of the on-disk graph.
pub struct QueryHarness {
    mode: Mode,
    graph_path: PathBuf,
    socket_path: PathBuf,
    ppr_params: PprParams,
}

impl QueryHarness {
    /// Detects mode at construction: if `socket_path` is reachable and
    /// a connection succeeds, mode is `Daemon` with the stream
    /// retained; otherwise `Local`. Uses the spec-default `PprParams`;
    /// see [`QueryHarness::with_config`] to inject overrides.
    pub fn new(graph_path: impl Into<PathBuf>, socket_path: impl Into<PathBuf>) -> Self {
        Self::with_config(graph_path, socket_path, &EngineConfig::default())
    }

    /// Same as [`QueryHarness::new`], taking `ppr_alpha`/`ppr_epsilon`
    /// from `config` (spec §6, §9: injected at construction). Only
    /// affects the local-mode path — a connected daemon applies its
    /// own config for requests it serves.
    pub fn with_config(
        graph_path: impl Into<PathBuf>,
        socket_path: impl Into<PathBuf>,
        config: &EngineConfig,
    ) -> Self {
        let graph_path = graph_path.into();
        let socket_path = socket_path.into();
        let mode = match UnixStream::connect(&socket_path) {
            Ok(stream) => Mode::Daemon { stream },
            Err(_) => Mode::Local,
        };
        Self {
            mode,
            graph_path,
            socket_path,
            ppr_params: config.ppr_params(),
        }
    }

    pub fn is_daemon_mode(&self) -> bool {
        matches!(self.mode, Mode::Daemon { .. })
    }

    fn load_local_graph(&self) -> Result<Graph> {
        if !self.graph_path.exists() {
            return Err(CodegraphError::graph_not_found(format!(
                "no graph file at {}",
                self.graph_path.display()
            )));
        }
        let mut file = fs::File::open(&self.graph_path)?;
        codec::deserialize(&mut file)
    }

    fn run_local(&self, request: &Request) -> Result<Value> {
        let graph = self.load_local_graph()?;
        daemon::dispatch(&graph, request, "local", self.ppr_params)
    }

    fn run_daemon(&mut self, request: &Request) -> Result<Value> {
        let Mode::Daemon { stream } = &mut self.mode else {
            unreachable!("run_daemon called while not in daemon mode");
        };

        let body = serde_json::to_vec(request)
            .map_err(|e| CodegraphError::invalid_request(e.to_string()))?;

        if let Err(e) = ipc::write_frame(stream, &body) {
            let err = CodegraphError::daemon_write_failed(e.to_string());
            warn!(error = %err, "daemon write failed, falling back to local");
            self.mode = Mode::Local;
            return self.run_local(request);
        }

        match ipc::read_frame(stream) {
            Ok(response_bytes) => serde_json::from_slice(&response_bytes)
                .map_err(|e| CodegraphError::invalid_request(e.to_string())),
            Err(e) => {
                let err = CodegraphError::daemon_read_failed(e.to_string());
                warn!(error = %err, "daemon read failed, falling back to local");
                self.mode = Mode::Local;
                self.run_local(request)
            }
        }
    }

    /// Dispatches `request`, routing per current mode. A daemon I/O
    /// failure (including connection loss on re-entry) falls back to
    /// local, and subsequent calls stay local until the harness is
    /// reconstructed.
    pub fn call(&mut self, method: &str, params: Value) -> Result<Value> {
        let request = Request {
            method: method.to_string(),
            params,
        };
        match self.mode {
            Mode::Local => self.run_local(&request),
            Mode::Daemon { .. } => self.run_daemon(&request),
        }
    }

    pub fn symbol_at(&mut self, path: &str, line: u32) -> Result<Value> {
        self.call("symbol_at", json!({"file": path, "line": line}))
    }

    pub fn find_callers(&mut self, symbol_id: u64) -> Result<Value> {
        self.call("find_callers", json!({"symbol_id": symbol_id}))
    }

    pub fn find_callees(&mut self, symbol_id: u64) -> Result<Value> {
        self.call("find_callees", json!({"symbol_id": symbol_id}))
    }

    pub fn find_dependents(&mut self, symbol_id: u64, max_results: u64) -> Result<Value> {
        self.call(
            "find_dependents",
            json!({"symbol_id": symbol_id, "max_results": max_results}),
        )
    }

    pub fn ping(&mut self) -> Result<Value> {
        self.call("ping", Value::Null)
    }
}
