//! Tier manager (spec §4.12): HOT/WARM/COLD residency over a
//! repository's graph, with idle demotion.
//!
//! Grounded on the teacher's RFC-CONFIG-SYSTEM tiered-cache idea
//! (`codegraph-ir/Cargo.toml`'s `blake3` + `probabilistic-collections`
//! entry for a multi-level cache), reimplemented here as the exact
//! hot/warm/cold state machine spec §4.12 defines rather than a
//! probabilistic L0 filter (out of scope for this spec).

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::codec;
use crate::domain::graph::Graph;
use crate::error::Result;

pub const HOT_CAPACITY: usize = 4;
pub const WARM_CAPACITY: usize = 16;
pub const PROMOTE_THRESHOLD: u32 = 3;
pub const DEMOTE_IDLE_MS: i64 = 600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

struct TierEntry {
    graph_path: PathBuf,
    tier: Tier,
    graph: Option<Graph>,
    access_count: u32,
    last_access_ms: i64,
    loaded_at_ms: i64,
    symbol_count: usize,
    edge_count: usize,
}

pub struct TierManager {
    hot_capacity: usize,
    warm_capacity: usize,
    promote_threshold: u32,
    entries: RwLock<HashMap<u32, TierEntry>>,
}

impl TierManager {
    pub fn new(hot_capacity: usize, warm_capacity: usize, promote_threshold: u32) -> Self {
        Self {
            hot_capacity,
            warm_capacity,
            promote_threshold,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or overwrites) a repo as `cold`, releasing any
    /// previously owned graph.
    pub fn register_cold(&self, repo_id: u32, graph_path: PathBuf) {
        let mut entries = self.entries.write();
        entries.insert(
            repo_id,
            TierEntry {
                graph_path,
                tier: Tier::Cold,
                graph: None,
                access_count: 0,
                last_access_ms: 0,
                loaded_at_ms: 0,
                symbol_count: 0,
                edge_count: 0,
            },
        );
    }

    pub fn tier_of(&self, repo_id: u32) -> Option<Tier> {
        self.entries.read().get(&repo_id).map(|e| e.tier)
    }

    pub fn counts(&self, repo_id: u32) -> Option<(usize, usize)> {
        self.entries
            .read()
            .get(&repo_id)
            .map(|e| (e.symbol_count, e.edge_count))
    }

    fn evict_lru_warm(&self, entries: &mut HashMap<u32, TierEntry>) {
        let lru = entries
            .iter()
            .filter(|(_, e)| e.tier == Tier::Warm)
            .min_by_key(|(_, e)| e.last_access_ms)
            .map(|(&id, _)| id);
        if let Some(id) = lru {
            if let Some(e) = entries.get_mut(&id) {
                e.tier = Tier::Cold;
                e.symbol_count = 0;
                e.edge_count = 0;
            }
        }
    }

    fn evict_lru_hot(&self, entries: &mut HashMap<u32, TierEntry>) {
        let lru = entries
            .iter()
            .filter(|(_, e)| e.tier == Tier::Hot)
            .min_by_key(|(_, e)| e.last_access_ms)
            .map(|(&id, _)| id);
        if let Some(id) = lru {
            self.demote_to_warm_locked(entries, id);
        }
    }

    /// Increments access count, refreshes `last_access_ms`, and
    /// promotes cold → warm once `access_count >= promote_threshold`.
    pub fn record_access(&self, repo_id: u32, now_ms: i64) {
        let mut entries = self.entries.write();

        let should_promote = {
            let entry = match entries.get_mut(&repo_id) {
                Some(e) => e,
                None => return,
            };
            entry.access_count += 1;
            entry.last_access_ms = now_ms;
            entry.tier == Tier::Cold && entry.access_count >= self.promote_threshold
        };

        if should_promote {
            let warm_count = entries.values().filter(|e| e.tier == Tier::Warm).count();
            if warm_count >= self.warm_capacity {
                self.evict_lru_warm(&mut entries);
            }
            if let Some(e) = entries.get_mut(&repo_id) {
                e.tier = Tier::Warm;
            }
        }
    }

    /// Deserializes the graph via the binary codec, caching symbol/edge
    /// counts and setting tier hot. Evicts LRU-hot at capacity. On load
    /// failure, leaves the entry at its prior tier and returns `Ok(None)`.
    pub fn promote_to_hot(&self, repo_id: u32) -> Result<Option<()>> {
        let graph_path = {
            let entries = self.entries.read();
            match entries.get(&repo_id) {
                Some(e) => e.graph_path.clone(),
                None => return Ok(None),
            }
        };

        let loaded = std::fs::File::open(&graph_path).ok().and_then(|mut f| codec::deserialize(&mut f).ok());

        let mut entries = self.entries.write();
        let graph = match loaded {
            Some(g) => g,
            None => return Ok(None),
        };

        let hot_count = entries.values().filter(|e| e.tier == Tier::Hot).count();
        if hot_count >= self.hot_capacity {
            self.evict_lru_hot(&mut entries);
        }

        if let Some(e) = entries.get_mut(&repo_id) {
            e.symbol_count = graph.symbol_count();
            e.edge_count = graph.edge_count();
            e.graph = Some(graph);
            e.tier = Tier::Hot;
            Ok(Some(()))
        } else {
            Ok(None)
        }
    }

    fn demote_to_warm_locked(&self, entries: &mut HashMap<u32, TierEntry>, repo_id: u32) {
        if let Some(e) = entries.get_mut(&repo_id) {
            if let Some(g) = &e.graph {
                e.symbol_count = g.symbol_count();
                e.edge_count = g.edge_count();
            }
            e.graph = None;
            e.tier = Tier::Warm;
        }
    }

    /// Persists counts, releases the graph, flips to warm.
    pub fn demote_to_warm(&self, repo_id: u32) {
        let mut entries = self.entries.write();
        self.demote_to_warm_locked(&mut entries, repo_id);
    }

    /// From warm, clears counts. From hot, first demotes to warm then
    /// to cold.
    pub fn demote_to_cold(&self, repo_id: u32) {
        let mut entries = self.entries.write();
        if let Some(e) = entries.get(&repo_id) {
            if e.tier == Tier::Hot {
                self.demote_to_warm_locked(&mut entries, repo_id);
            }
        }
        if let Some(e) = entries.get_mut(&repo_id) {
            e.tier = Tier::Cold;
            e.symbol_count = 0;
            e.edge_count = 0;
        }
    }

    /// Demotes any entry whose `last_access_ms > 0` and idle beyond
    /// `idle_ms` one tier toward cold.
    pub fn evict_idle(&self, idle_ms: i64, now_ms: i64) {
        let idle_ids: Vec<u32> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(_, e)| e.last_access_ms > 0 && now_ms - e.last_access_ms > idle_ms)
                .map(|(&id, _)| id)
                .collect()
        };

        for id in idle_ids {
            let tier = self.tier_of(id);
            match tier {
                Some(Tier::Hot) => self.demote_to_warm(id),
                Some(Tier::Warm) => self.demote_to_cold(id),
                _ => {}
            }
        }
    }

    pub fn hot_count(&self) -> usize {
        self.entries.read().values().filter(|e| e.tier == Tier::Hot).count()
    }

    pub fn warm_count(&self) -> usize {
        self.entries.read().values().filter(|e| e.tier == Tier::Warm).count()
    }

    pub fn total_count(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for TierManager {
    fn default() -> Self {
        Self::new(HOT_CAPACITY, WARM_CAPACITY, PROMOTE_THRESHOLD)
    }
}
