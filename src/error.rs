//! Error taxonomy for the code graph engine.
//!
//! Mirrors `codegraph-storage::error`: a stable `ErrorKind` enum for
//! programmatic matching, wrapped in a single `thiserror`-derived type
//! that carries a human message and an optional source error.

use std::fmt;
use thiserror::Error;

/// Stable error kinds, matching spec §7's taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidFormat,
    UnsupportedVersion,
    StringTooLarge,
    Truncated,
    GraphNotFound,
    InvalidRequest,
    MissingParams,
    UnknownMethod,
    FrameTooLarge,
    DaemonReadFailed,
    DaemonWriteFailed,
    TooManyRepos,
    DuplicateRepo,
    RepoBusy,
    RepoNotFound,
    ReadLocked,
    WriteLocked,
    TooManyWatches,
    ShutdownRequested,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::UnsupportedVersion => "unsupported_version",
            ErrorKind::StringTooLarge => "string_too_large",
            ErrorKind::Truncated => "truncated",
            ErrorKind::GraphNotFound => "graph_not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::MissingParams => "missing_params",
            ErrorKind::UnknownMethod => "unknown_method",
            ErrorKind::FrameTooLarge => "frame_too_large",
            ErrorKind::DaemonReadFailed => "daemon_read_failed",
            ErrorKind::DaemonWriteFailed => "daemon_write_failed",
            ErrorKind::TooManyRepos => "too_many_repos",
            ErrorKind::DuplicateRepo => "duplicate_repo",
            ErrorKind::RepoBusy => "repo_busy",
            ErrorKind::RepoNotFound => "repo_not_found",
            ErrorKind::ReadLocked => "read_locked",
            ErrorKind::WriteLocked => "write_locked",
            ErrorKind::TooManyWatches => "too_many_watches",
            ErrorKind::ShutdownRequested => "shutdown_requested",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The crate-wide error type.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct CodegraphError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CodegraphError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

macro_rules! ctor {
    ($name:ident, $kind:ident) => {
        impl CodegraphError {
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        }
    };
}

ctor!(invalid_format, InvalidFormat);
ctor!(unsupported_version, UnsupportedVersion);
ctor!(string_too_large, StringTooLarge);
ctor!(truncated, Truncated);
ctor!(graph_not_found, GraphNotFound);
ctor!(invalid_request, InvalidRequest);
ctor!(missing_params, MissingParams);
ctor!(unknown_method, UnknownMethod);
ctor!(frame_too_large, FrameTooLarge);
ctor!(daemon_read_failed, DaemonReadFailed);
ctor!(daemon_write_failed, DaemonWriteFailed);
ctor!(too_many_repos, TooManyRepos);
ctor!(duplicate_repo, DuplicateRepo);
ctor!(repo_busy, RepoBusy);
ctor!(repo_not_found, RepoNotFound);
ctor!(read_locked, ReadLocked);
ctor!(write_locked, WriteLocked);
ctor!(too_many_watches, TooManyWatches);
ctor!(shutdown_requested, ShutdownRequested);

impl From<std::io::Error> for CodegraphError {
    /// An `UnexpectedEof` is always an end-of-stream truncation (spec
    /// §7's `Truncated`/end-of-stream kind) whether it comes from a
    /// short graph file (§4.3) or a torn WAL/IPC frame (§4.4/§4.9);
    /// every other I/O failure stays `Io`.
    fn from(e: std::io::Error) -> Self {
        let kind = if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ErrorKind::Truncated
        } else {
            ErrorKind::Io
        };
        let message = e.to_string();
        CodegraphError::new(kind, message).with_source(e)
    }
}

pub type Result<T> = std::result::Result<T, CodegraphError>;
