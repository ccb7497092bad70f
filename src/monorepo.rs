//! Monorepo manager (spec §4.13): packages and cross-repo edges layered
//! atop per-repository graphs, with path-to-package resolution and a
//! cross-package dependents BFS.
//!
//! Grounded on the teacher's `codegraph-ir` workspace-member-resolution
//! idea (locating which crate/package owns a path) and its BFS-based
//! `repomap` traversal, reimplemented here over the composite
//! `(package, symbol)` keys spec §4.13 requires.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::entity::{EdgeKind, ManifestKind};

/// A monorepo package: a named root directory with a manifest kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: u32,
    pub name: String,
    pub root_path: String,
    pub manifest_kind: ManifestKind,
}

/// A directed edge crossing package boundaries. Orphaned (left dangling)
/// when a referenced package is removed; not auto-collected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossRepoEdge {
    pub src_package: u32,
    pub src_symbol: u64,
    pub dst_package: u32,
    pub dst_symbol: u64,
    pub kind: EdgeKind,
}

/// A `(package, symbol)` composite key, packed into a 128-bit id for
/// visited-set membership during BFS.
pub fn pack_key(package: u32, symbol: u64) -> u128 {
    ((package as u128) << 64) | (symbol as u128)
}

#[derive(Debug, Clone)]
pub struct CrossDependent {
    pub package: u32,
    pub symbol: u64,
    pub kind: EdgeKind,
    pub depth: u32,
}

#[derive(Default)]
pub struct MonorepoManager {
    packages: HashMap<u32, Package>,
    next_package_id: u32,
    /// Indexed by destination `(package, symbol)` to drive the reverse
    /// BFS in `find_cross_dependents`.
    edges_by_dst: HashMap<(u32, u64), Vec<CrossRepoEdge>>,
}

impl MonorepoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package(&mut self, name: impl Into<String>, root_path: impl Into<String>, manifest_kind: ManifestKind) -> u32 {
        let id = self.next_package_id;
        self.next_package_id += 1;
        self.packages.insert(
            id,
            Package {
                id,
                name: name.into(),
                root_path: root_path.into(),
                manifest_kind,
            },
        );
        id
    }

    pub fn remove_package(&mut self, id: u32) {
        self.packages.remove(&id);
    }

    pub fn package(&self, id: u32) -> Option<&Package> {
        self.packages.get(&id)
    }

    pub fn add_cross_repo_edge(&mut self, edge: CrossRepoEdge) {
        self.edges_by_dst
            .entry((edge.dst_package, edge.dst_symbol))
            .or_default()
            .push(edge);
    }

    /// Selects the package whose `root_path` is a prefix of `path` ending
    /// at a directory boundary (`root.len == path.len` or
    /// `path[root.len] == '/'`), preferring the longest such root. An
    /// empty `root_path` never matches, even against an empty `path` —
    /// it would otherwise be a universal catch-all root.
    pub fn find_package_by_path(&self, path: &str) -> Option<&Package> {
        self.packages
            .values()
            .filter(|p| {
                let root = p.root_path.as_str();
                if root.is_empty() {
                    return false;
                }
                if root.len() > path.len() {
                    return false;
                }
                if !path.starts_with(root) {
                    return false;
                }
                root.len() == path.len() || path.as_bytes()[root.len()] == b'/'
            })
            .max_by_key(|p| p.root_path.len())
    }

    /// BFS on the reverse of cross-repo edges from `(src_pkg, src_sym)`,
    /// bounded by `max_depth`. `max_depth == 0` yields no results;
    /// cycles terminate via the composite-key visited set.
    pub fn find_cross_dependents(&self, src_pkg: u32, src_sym: u64, max_depth: u32) -> Vec<CrossDependent> {
        if max_depth == 0 {
            return Vec::new();
        }

        let mut visited: HashSet<u128> = HashSet::new();
        visited.insert(pack_key(src_pkg, src_sym));

        let mut queue: VecDeque<(u32, u64, u32)> = VecDeque::new();
        queue.push_back((src_pkg, src_sym, 0));

        let mut out = Vec::new();

        while let Some((pkg, sym, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            if let Some(edges) = self.edges_by_dst.get(&(pkg, sym)) {
                for edge in edges {
                    let key = pack_key(edge.src_package, edge.src_symbol);
                    if visited.insert(key) {
                        let next_depth = depth + 1;
                        out.push(CrossDependent {
                            package: edge.src_package,
                            symbol: edge.src_symbol,
                            kind: edge.kind,
                            depth: next_depth,
                        });
                        queue.push_back((edge.src_package, edge.src_symbol, next_depth));
                    }
                }
            }
        }

        out
    }
}
