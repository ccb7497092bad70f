//! Personalized PageRank engine (spec §4.6): Andersen-Chung-Lang push
//! approximation, plus an incremental variant that tolerates graph
//! mutation without a full recompute.
//!
//! Grounded structurally on `codegraph-ir`'s
//! `features/repomap/infrastructure/pagerank.rs` (settings-style
//! parameters, `HashMap<_, f32>` score maps) but implementing the push
//! algorithm spec §4.6 specifies rather than that module's iterative
//! power-method PageRank.

use std::collections::HashMap;

use crate::domain::graph::Graph;

pub const DEFAULT_ALPHA: f32 = 0.15;
pub const DEFAULT_EPSILON: f32 = 1e-4;

/// Parameters for a push-PPR run.
#[derive(Debug, Clone, Copy)]
pub struct PprParams {
    pub alpha: f32,
    pub epsilon: f32,
}

impl Default for PprParams {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Result of a full push-PPR run: sparse, non-normalized scores.
#[derive(Debug, Clone, Default)]
pub struct PprScores {
    pub scores: HashMap<u64, f32>,
}

impl PprScores {
    /// Collects `(id, score)` pairs with score > 0, sorted descending by
    /// score, optionally excluding one id, truncated to `k`.
    pub fn top_k(&self, k: usize, exclude: Option<u64>) -> Vec<(u64, f32)> {
        if k == 0 {
            return Vec::new();
        }
        let mut entries: Vec<(u64, f32)> = self
            .scores
            .iter()
            .filter(|(id, &score)| score > 0.0 && Some(**id) != exclude)
            .map(|(&id, &score)| (id, score))
            .collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        entries.truncate(k);
        entries
    }
}

/// Runs one eligible-node push pass; returns true if any node pushed.
fn push_pass(graph: &Graph, params: &PprParams, p: &mut HashMap<u64, f32>, r: &mut HashMap<u64, f32>) -> bool {
    let eligible: Vec<u64> = r
        .iter()
        .filter(|(&u, &residual)| {
            let deg = graph.out_degree(u).max(1) as f32;
            residual > params.epsilon * deg
        })
        .map(|(&u, _)| u)
        .collect();

    if eligible.is_empty() {
        return false;
    }

    for u in eligible {
        let residual_u = *r.get(&u).unwrap_or(&0.0);
        if residual_u <= 0.0 {
            continue;
        }
        *p.entry(u).or_insert(0.0) += params.alpha * residual_u;

        let out_edges = graph.out_edges(u);
        let total_weight: f32 = out_edges.iter().map(|e| e.weight).sum();
        if !out_edges.is_empty() && total_weight > 0.0 {
            for edge in out_edges {
                let share = (1.0 - params.alpha) * residual_u * edge.weight / total_weight;
                *r.entry(edge.dst).or_insert(0.0) += share;
            }
        }
        r.insert(u, 0.0);
    }

    true
}

/// Runs full push-PPR from `query`, seeding `r[query] = 1.0` and
/// iterating until no node is eligible to push (spec §4.6).
pub fn ppr_push(graph: &Graph, query: u64, params: PprParams) -> PprScores {
    let mut p: HashMap<u64, f32> = HashMap::new();
    let mut r: HashMap<u64, f32> = HashMap::new();
    r.insert(query, 1.0);

    while push_pass(graph, &params, &mut p, &mut r) {}

    PprScores { scores: p }
}

/// Incremental PPR state (C6-delta): a warm `(scores, residuals,
/// dirty_nodes)` triple, initialized from a prior full result.
#[derive(Debug, Clone)]
pub struct IncrementalPpr {
    params: PprParams,
    scores: HashMap<u64, f32>,
    residuals: HashMap<u64, f32>,
    dirty: std::collections::HashSet<u64>,
}

impl IncrementalPpr {
    pub fn from_full_result(result: &PprScores, params: PprParams) -> Self {
        Self {
            params,
            scores: result.scores.clone(),
            residuals: HashMap::new(),
            dirty: std::collections::HashSet::new(),
        }
    }

    pub fn scores(&self) -> &HashMap<u64, f32> {
        &self.scores
    }

    /// `edge_added(src, dst, w)`: injects `(1-α)·scores[src]·w` into
    /// `r[src]` and marks `src` dirty.
    pub fn edge_added(&mut self, src: u64, _dst: u64, w: f32) {
        let score_src = *self.scores.get(&src).unwrap_or(&0.0);
        let injected = (1.0 - self.params.alpha) * score_src * w;
        *self.residuals.entry(src).or_insert(0.0) += injected;
        self.dirty.insert(src);
    }

    /// `edge_removed(src, dst)`: injects `(1-α)·scores[src]` into
    /// `r[src]`; deducts a conservative half of `scores[dst]`,
    /// converting that deduction into residual at `dst`. This is an
    /// admitted approximation, not an exact update (spec §4.6, §9).
    pub fn edge_removed(&mut self, src: u64, dst: u64) {
        let score_src = *self.scores.get(&src).unwrap_or(&0.0);
        let injected_src = (1.0 - self.params.alpha) * score_src;
        *self.residuals.entry(src).or_insert(0.0) += injected_src;

        let score_dst = *self.scores.get(&dst).unwrap_or(&0.0);
        let deduction = score_dst * 0.5;
        if let Some(s) = self.scores.get_mut(&dst) {
            *s -= deduction;
        }
        *self.residuals.entry(dst).or_insert(0.0) += deduction;

        self.dirty.insert(src);
        self.dirty.insert(dst);
    }

    /// `file_invalidated(ids)`: for each id, marks it dirty and, if its
    /// score is positive, injects that score as residual.
    pub fn file_invalidated(&mut self, ids: &[u64]) {
        for &id in ids {
            self.dirty.insert(id);
            let score = *self.scores.get(&id).unwrap_or(&0.0);
            if score > 0.0 {
                *self.residuals.entry(id).or_insert(0.0) += score;
            }
        }
    }

    /// Seeds residual `α·score[u]` into any dirty node lacking residual,
    /// then runs the push loop until no eligible node remains, then
    /// clears the dirty set.
    pub fn delta_update(&mut self, graph: &Graph) {
        for &u in &self.dirty {
            if !self.residuals.contains_key(&u) {
                let score_u = *self.scores.get(&u).unwrap_or(&0.0);
                self.residuals.insert(u, self.params.alpha * score_u);
            }
        }

        while push_pass(graph, &self.params, &mut self.scores, &mut self.residuals) {}

        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::EdgeKind;
    use crate::domain::entity::Edge;

    fn star_graph() -> Graph {
        let mut g = Graph::new();
        g.add_edge(Edge::new(1, 2, EdgeKind::Calls));
        g.add_edge(Edge::new(1, 3, EdgeKind::Calls));
        g.add_edge(Edge::new(1, 4, EdgeKind::Calls));
        g
    }

    #[test]
    fn query_node_score_is_at_least_alpha() {
        let g = star_graph();
        let params = PprParams::default();
        let result = ppr_push(&g, 1, params);
        assert!(*result.scores.get(&1).unwrap() >= params.alpha - 1e-6);
    }

    #[test]
    fn push_star_query_dominates_and_leaves_symmetric_children() {
        let g = star_graph();
        let result = ppr_push(&g, 1, PprParams::default());
        let s1 = *result.scores.get(&1).unwrap();
        let s2 = *result.scores.get(&2).unwrap();
        let s3 = *result.scores.get(&3).unwrap();
        let s4 = *result.scores.get(&4).unwrap();
        assert!(s1 > s2 && s1 > s3 && s1 > s4);
        assert!((s2 - s3).abs() < 1e-4);
        assert!((s3 - s4).abs() < 1e-4);
        assert!(s2 > 0.0);
    }

    #[test]
    fn disconnected_nodes_receive_no_score() {
        let mut g = star_graph();
        g.add_edge(Edge::new(99, 100, EdgeKind::Calls));
        let result = ppr_push(&g, 1, PprParams::default());
        assert!(result.scores.get(&99).copied().unwrap_or(0.0) == 0.0);
        assert!(result.scores.get(&100).copied().unwrap_or(0.0) == 0.0);
    }

    #[test]
    fn cycle_including_query_keeps_query_highest() {
        let mut g = Graph::new();
        g.add_edge(Edge::new(1, 2, EdgeKind::Calls));
        g.add_edge(Edge::new(2, 1, EdgeKind::Calls));
        let result = ppr_push(&g, 1, PprParams::default());
        let s1 = *result.scores.get(&1).unwrap();
        let s2 = *result.scores.get(&2).unwrap_or(&0.0);
        assert!(s1 > s2);
    }

    #[test]
    fn top_k_respects_exclusion_and_limit() {
        let g = star_graph();
        let result = ppr_push(&g, 1, PprParams::default());
        let top = result.top_k(2, Some(1));
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|(id, _)| *id != 1));
    }

    #[test]
    fn top_k_zero_yields_empty() {
        let g = star_graph();
        let result = ppr_push(&g, 1, PprParams::default());
        assert!(result.top_k(0, None).is_empty());
    }

    #[test]
    fn incremental_edge_added_injects_residual() {
        let g = star_graph();
        let full = ppr_push(&g, 1, PprParams::default());
        let mut inc = IncrementalPpr::from_full_result(&full, PprParams::default());
        inc.edge_added(1, 5, 1.0);
        inc.delta_update(&g);
        // score[1] should have grown since it just re-pushed its own residual
        assert!(*inc.scores().get(&1).unwrap() >= *full.scores.get(&1).unwrap());
    }

    #[test]
    fn incremental_edge_removed_deducts_half_of_destination_score() {
        let g = star_graph();
        let full = ppr_push(&g, 1, PprParams::default());
        let dst_before = *full.scores.get(&2).unwrap();
        let mut inc = IncrementalPpr::from_full_result(&full, PprParams::default());
        inc.edge_removed(1, 2);
        let dst_after_deduction = *inc.scores.get(&2).unwrap();
        assert!((dst_after_deduction - dst_before * 0.5).abs() < 1e-6);
    }
}
