//! Engine-wide configuration.
//!
//! Spec §6/§9: "Global state: None. All parameters... are injected into
//! component constructors." `EngineConfig` is that injection point; a
//! host may load it from files/env, the core only consumes the struct.

use std::path::PathBuf;

use crate::ppr::PprParams;
use crate::weights;

/// Tuning knobs and paths recognized by the core (spec §6).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Host-supplied repository root. Taken as given, never normalized.
    pub repo_path: PathBuf,

    pub hot_capacity: usize,
    pub warm_capacity: usize,
    pub promote_threshold: u32,
    pub demote_idle_ms: i64,

    pub ppr_alpha: f32,
    pub ppr_epsilon: f32,

    pub recency_half_life_days: f64,

    /// `.codegraph` root directory. Graph/WAL/socket paths derive from
    /// this unless overridden individually.
    pub codegraph_dir: PathBuf,
    pub socket_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            hot_capacity: 4,
            warm_capacity: 16,
            promote_threshold: 3,
            demote_idle_ms: 600_000,
            ppr_alpha: 0.15,
            ppr_epsilon: 1e-4,
            recency_half_life_days: 90.0,
            codegraph_dir: PathBuf::from(".codegraph"),
            socket_path: None,
        }
    }
}

impl EngineConfig {
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| self.codegraph_dir.join("daemon.sock"))
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.codegraph_dir.join("repos")
    }

    /// Bridges the `ppr_alpha`/`ppr_epsilon` knobs into the push-PPR
    /// engine's own parameter struct (spec §6: "recognized by the
    /// core"; §9: injected, never read from global state).
    pub fn ppr_params(&self) -> PprParams {
        PprParams {
            alpha: self.ppr_alpha,
            epsilon: self.ppr_epsilon,
        }
    }

    /// Applies `recency_half_life_days` to a single edge-weight decay
    /// computation, so the config knob has a live internal consumer
    /// rather than sitting as a value only a host could read back out.
    pub fn recency_decay(&self, last_modified_ms: i64, now_ms: i64) -> f32 {
        weights::recency_decay(last_modified_ms, now_ms, self.recency_half_life_days)
    }
}
