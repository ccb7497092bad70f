//! In-memory graph (spec §4.2): arena-backed storage with bidirectional
//! adjacency.
//!
//! All owned byte/string fields conceptually live in one arena tied to
//! the graph's lifetime; in safe Rust that arena is simply "owned by the
//! entity maps themselves" — teardown is `Graph::drop`, which releases
//! everything in one step because nothing outlives `Graph`. Re-ingestion
//! of a file is "drop and rebuild the affected records": callers remove
//! and re-insert, they do not get a more granular API.

use std::collections::HashMap;

use super::entity::{Commit, Edge, File, Symbol};

/// The in-memory code graph.
#[derive(Debug, Default)]
pub struct Graph {
    symbols: HashMap<u64, Symbol>,
    files: HashMap<u32, File>,
    commits: HashMap<u32, Commit>,
    out_adjacency: HashMap<u64, Vec<Edge>>,
    in_adjacency: HashMap<u64, Vec<Edge>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Node insertion: last-writer-wins, per spec §3 lifecycle ───

    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.id, symbol);
    }

    pub fn add_file(&mut self, file: File) {
        self.files.insert(file.id, file);
    }

    pub fn add_commit(&mut self, commit: Commit) {
        self.commits.insert(commit.id, commit);
    }

    /// Drops the symbol record for `file_id`'s invalidation target.
    /// Re-ingestion of a file is expressed by the caller removing the
    /// old symbols for that file and inserting fresh ones.
    pub fn remove_symbols_for_file(&mut self, file_id: u32) {
        self.symbols.retain(|_, s| s.file_id != file_id);
    }

    // ─── Edges: appended unconditionally to both adjacency lists ───

    pub fn add_edge(&mut self, edge: Edge) {
        self.out_adjacency.entry(edge.src).or_default().push(edge);
        self.in_adjacency.entry(edge.dst).or_default().push(edge);
    }

    // ─── Lookups ───

    pub fn symbol(&self, id: u64) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    pub fn file(&self, id: u32) -> Option<&File> {
        self.files.get(&id)
    }

    pub fn commit(&self, id: u32) -> Option<&Commit> {
        self.commits.get(&id)
    }

    pub fn file_by_path(&self, path: &[u8]) -> Option<&File> {
        self.files.values().find(|f| f.path == path)
    }

    pub fn symbols_in_file(&self, file_id: u32) -> impl Iterator<Item = &Symbol> {
        self.symbols.values().filter(move |s| s.file_id == file_id)
    }

    /// Borrowed view of out-adjacency; empty slice for unknown ids.
    pub fn out_edges(&self, id: u64) -> &[Edge] {
        self.out_adjacency.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Borrowed view of in-adjacency; empty slice for unknown ids.
    pub fn in_edges(&self, id: u64) -> &[Edge] {
        self.in_adjacency.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn out_degree(&self, id: u64) -> usize {
        self.out_adjacency.get(&id).map(|v| v.len()).unwrap_or(0)
    }

    // ─── Counts ───

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_adjacency.values().map(|v| v.len()).sum()
    }

    // ─── Iteration (for the binary codec) ───

    pub fn iter_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn iter_files(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub fn iter_commits(&self) -> impl Iterator<Item = &Commit> {
        self.commits.values()
    }

    pub fn iter_edges(&self) -> impl Iterator<Item = &Edge> {
        self.out_adjacency.values().flatten()
    }
}
