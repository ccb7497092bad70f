//! codegraph-engine: an embeddable storage and query engine for a
//! directed, typed, weighted graph of source-code entities (symbols,
//! files, commits).
//!
//! ## Layout
//!
//! - [`domain`] — entity model and the in-memory graph (C1/C2)
//! - [`codec`] — versioned binary on-disk format (C3)
//! - [`wal`] — write-ahead log with crash-safe replay (C4)
//! - [`weights`] — edge-weight model (C5)
//! - [`ppr`] — push-based Personalized PageRank, full and incremental (C6)
//! - [`query`] — symbol/caller/callee/dependent lookups (C7)
//! - [`cache`] — LRU over query results (C8)
//! - [`ipc`] — length-prefixed JSON frame protocol (C9)
//! - [`daemon`] — Unix-socket query server (C9)
//! - [`harness`] — local/daemon query routing (C10)
//! - [`tenant`] — multi-tenant MRSW repo registry (C11)
//! - [`tier`] — HOT/WARM/COLD residency manager (C12)
//! - [`monorepo`] — cross-package edges and BFS (C13)
//! - [`watcher`] — stat-based polling file watcher (C14)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use codegraph_engine::config::EngineConfig;
//! use codegraph_engine::domain::Graph;
//!
//! let config = EngineConfig::default();
//! let mut graph = Graph::new();
//! // ingest symbols/files/edges, then:
//! // codec::serialize(&graph, &mut file)?;
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod error;
pub mod harness;
pub mod ipc;
pub mod monorepo;
pub mod ppr;
pub mod query;
pub mod tenant;
pub mod tier;
pub mod wal;
pub mod watcher;
pub mod weights;

pub use config::EngineConfig;
pub use domain::Graph;
pub use error::{CodegraphError, ErrorKind, Result};
