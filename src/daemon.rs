//! Unix-socket query daemon server (spec §4.9/§6): accepts one request
//! per connection, dispatches through the C7 query surface, replies,
//! and closes. `shutdown` terminates the loop after replying.
//!
//! Grounded on spec §5's "accepts one request per accepted connection,
//! processes it, and closes" contract and §6's socket lifecycle
//! ("deletes a stale socket file at start and deletes its socket file
//! at teardown").

use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::domain::graph::Graph;
use crate::error::Result;
use crate::ipc::{self, Request};
use crate::ppr::PprParams;
use crate::query;

/// Dispatches a parsed request against `graph`, returning the raw JSON
/// body to frame back to the client, or an error to surface. `mode` is
/// reported verbatim in the `ping` reply (spec §4.9: `"local"|"daemon"`).
/// `ppr_params` is the injected `PPR_ALPHA`/`PPR_EPSILON` override
/// (spec §6) used by `find_dependents`.
pub fn dispatch(
    graph: &Graph,
    request: &Request,
    mode: &str,
    ppr_params: PprParams,
) -> Result<Value> {
    match request.method.as_str() {
        "ping" => Ok(json!({"status": "ok", "mode": mode})),
        "shutdown" => Err(crate::error::CodegraphError::shutdown_requested("shutdown requested")),
        "symbol_at" => {
            let file = ipc::required_string(&request.params, "file")?;
            let line = ipc::required_u64(&request.params, "line")? as u32;
            let results = query::symbol_at(graph, file.as_bytes(), line);
            let symbols: Vec<Value> = results
                .into_iter()
                .map(|r| {
                    json!({
                        "id": r.symbol.id,
                        "name": String::from_utf8_lossy(&r.symbol.name),
                        "line": r.symbol.line,
                        "file_path": String::from_utf8_lossy(&r.file_path),
                    })
                })
                .collect();
            Ok(json!({"symbols": symbols}))
        }
        "find_callers" | "find_callees" => {
            let id = ipc::required_u64(&request.params, "symbol_id")?;
            let results = if request.method == "find_callers" {
                query::find_callers(graph, id)
            } else {
                query::find_callees(graph, id)
            };
            let encoded: Vec<Value> = results
                .into_iter()
                .map(|r| {
                    json!({
                        "id": r.symbol.id,
                        "name": String::from_utf8_lossy(&r.symbol.name),
                        "edge_kind": r.edge_kind as u8,
                        "weight": r.weight,
                        "file_path": String::from_utf8_lossy(&r.file_path),
                    })
                })
                .collect();
            Ok(json!({"results": encoded}))
        }
        "find_dependents" => {
            let id = ipc::required_u64(&request.params, "symbol_id")?;
            let max_results = ipc::optional_u64(&request.params, "max_results", 10) as usize;
            let results = query::find_dependents(graph, id, max_results, ppr_params);
            let encoded: Vec<Value> = results
                .into_iter()
                .map(|r| {
                    json!({
                        "symbol_id": r.symbol_id,
                        "score": r.score,
                        "file_path": String::from_utf8_lossy(&r.file_path),
                    })
                })
                .collect();
            Ok(json!({"dependents": encoded}))
        }
        other => Err(crate::error::CodegraphError::unknown_method(format!(
            "unknown method `{other}`"
        ))),
    }
}

/// Handles one accepted connection end-to-end: read one frame, dispatch,
/// write one frame, return. Returns `Ok(true)` if shutdown was requested.
fn handle_connection(mut stream: UnixStream, graph: &Graph, ppr_params: PprParams) -> Result<bool> {
    let frame = ipc::read_frame(&mut stream)?;
    let request = match ipc::parse_request(&frame) {
        Ok(r) => r,
        Err(e) => {
            let body = json!({"error": e.kind.as_str(), "message": e.message});
            ipc::write_frame(&mut stream, &serde_json::to_vec(&body).unwrap_or_default())?;
            return Ok(false);
        }
    };

    match dispatch(graph, &request, "daemon", ppr_params) {
        Ok(body) => {
            ipc::write_frame(&mut stream, &serde_json::to_vec(&body).unwrap_or_default())?;
            Ok(false)
        }
        Err(e) if e.is(crate::error::ErrorKind::ShutdownRequested) => {
            let body = json!({"status": "shutdown"});
            ipc::write_frame(&mut stream, &serde_json::to_vec(&body).unwrap_or_default())?;
            Ok(true)
        }
        Err(e) => {
            let body = json!({"error": e.kind.as_str(), "message": e.message});
            ipc::write_frame(&mut stream, &serde_json::to_vec(&body).unwrap_or_default())?;
            Ok(false)
        }
    }
}

/// Removes a stale socket file left over from an unclean prior exit.
fn remove_stale_socket(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

pub struct DaemonServer {
    listener: UnixListener,
    socket_path: PathBuf,
    ppr_params: PprParams,
}

impl DaemonServer {
    /// Binds the listener with the default `PprParams` (spec-default
    /// `PPR_ALPHA`/`PPR_EPSILON`). Use [`DaemonServer::bind_with_config`]
    /// to inject a host-supplied override.
    pub fn bind(socket_path: impl Into<PathBuf>) -> Result<Self> {
        Self::bind_with_config(socket_path, &EngineConfig::default())
    }

    /// Binds the listener, taking `ppr_alpha`/`ppr_epsilon` from
    /// `config` (spec §6: recognized by the core; §9: injected at
    /// construction, not read from global state).
    pub fn bind_with_config(socket_path: impl Into<PathBuf>, config: &EngineConfig) -> Result<Self> {
        let socket_path = socket_path.into();
        remove_stale_socket(&socket_path)?;
        let listener = UnixListener::bind(&socket_path)?;
        info!(path = %socket_path.display(), "daemon listening");
        Ok(Self {
            listener,
            socket_path,
            ppr_params: config.ppr_params(),
        })
    }

    /// Accepts and serves a single connection; returns `true` if the
    /// client requested shutdown.
    pub fn serve_once(&self, graph: &Graph) -> Result<bool> {
        let (stream, _addr) = self.listener.accept()?;
        handle_connection(stream, graph, self.ppr_params)
    }

    /// Runs the accept loop until a client requests shutdown or a
    /// fatal I/O error occurs. Always deletes the socket file on exit,
    /// leaving on-disk state untouched (spec §6).
    pub fn run(&self, graph: &Graph) -> Result<()> {
        loop {
            match self.serve_once(graph) {
                Ok(true) => break,
                Ok(false) => continue,
                Err(e) => {
                    warn!(error = %e, "daemon connection error, continuing");
                    continue;
                }
            }
        }
        self.teardown()
    }

    pub fn teardown(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        Ok(())
    }
}

impl Drop for DaemonServer {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}
