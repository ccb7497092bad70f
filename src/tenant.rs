//! Tenant manager (spec §4.11): per-repository registry with MRSW
//! locking and path-to-directory hashing.
//!
//! Grounded on the teacher's `ahash`/`rustc-hash` dependency choice
//! (`codegraph-ir/Cargo.toml`'s "Fast hash map for SOTA algorithms" /
//! "FxHashMap for SOTA points-to analysis") repurposed here as two
//! independent seeded 64-bit hashers for the directory-hash contract in
//! spec §3. `parking_lot::RwLock` matches the teacher's interior-
//! mutability idiom (`codegraph-ir`'s `TransactionWAL`).

use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{CodegraphError, Result};

pub const MAX_REPOS: u32 = 256;

const SEED_A: u64 = 0x9E37_79B9_7F4A_7C15;
const SEED_B: u64 = 0xC2B2_AE3D_27D4_EB4F;

/// Per-repo directory hash: two independent seeded 64-bit
/// non-cryptographic hashes of the path, concatenated into 16 bytes.
pub fn directory_hash(path: &str) -> [u8; 16] {
    let a = ahash::RandomState::with_seeds(SEED_A, SEED_A, SEED_A, SEED_A).hash_one(path);
    let mut fx = rustc_hash::FxHasher::default();
    fx.write_u64(SEED_B);
    fx.write(path.as_bytes());
    let b = fx.finish();

    let mut out = [0u8; 16];
    out[0..8].copy_from_slice(&a.to_le_bytes());
    out[8..16].copy_from_slice(&b.to_le_bytes());
    out
}

/// Hex-encodes a directory hash for use as a filesystem path component.
pub fn directory_hash_hex(path: &str) -> String {
    directory_hash(path).iter().map(|b| format!("{b:02x}")).collect()
}

/// A registered repository handle.
#[derive(Debug, Clone)]
pub struct RepoHandle {
    pub id: u32,
    pub name: String,
    pub path: PathBuf,
    pub dir_hash: [u8; 16],
    readers: u32,
    writer: bool,
    pub last_sync_ms: i64,
}

impl RepoHandle {
    pub fn reader_count(&self) -> u32 {
        self.readers
    }

    pub fn writer_active(&self) -> bool {
        self.writer
    }
}

#[derive(Default)]
struct Registry {
    next_id: u32,
    by_id: HashMap<u32, RepoHandle>,
    by_path: HashMap<PathBuf, u32>,
}

/// Registry of repositories with MRSW locking, capped at `MAX_REPOS`.
pub struct TenantManager {
    inner: RwLock<Registry>,
}

impl TenantManager {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
        }
    }

    pub fn register(&self, name: impl Into<String>, path: impl Into<PathBuf>) -> Result<u32> {
        let path = path.into();
        let mut reg = self.inner.write();

        if reg.by_path.contains_key(&path) {
            return Err(CodegraphError::duplicate_repo(format!(
                "repo already registered at {}",
                path.display()
            )));
        }
        if reg.by_id.len() as u32 >= MAX_REPOS {
            return Err(CodegraphError::too_many_repos(format!(
                "cannot register more than {MAX_REPOS} repos"
            )));
        }

        let id = reg.next_id;
        reg.next_id += 1;

        let dir_hash = directory_hash(&path.to_string_lossy());
        let handle = RepoHandle {
            id,
            name: name.into(),
            path: path.clone(),
            dir_hash,
            readers: 0,
            writer: false,
            last_sync_ms: 0,
        };
        reg.by_id.insert(id, handle);
        reg.by_path.insert(path, id);
        Ok(id)
    }

    pub fn unregister(&self, id: u32) -> Result<()> {
        let mut reg = self.inner.write();
        let busy = reg
            .by_id
            .get(&id)
            .map(|h| h.readers > 0 || h.writer)
            .unwrap_or(false);
        if busy {
            return Err(CodegraphError::repo_busy(format!("repo {id} is in use")));
        }
        if let Some(handle) = reg.by_id.remove(&id) {
            reg.by_path.remove(&handle.path);
            Ok(())
        } else {
            Err(CodegraphError::repo_not_found(format!("repo {id} not found")))
        }
    }

    pub fn get(&self, id: u32) -> Option<RepoHandle> {
        self.inner.read().by_id.get(&id).cloned()
    }

    /// Acquires a read lock: fails with `WriteLocked` if a writer is
    /// active.
    pub fn acquire_read(&self, id: u32) -> Result<()> {
        let mut reg = self.inner.write();
        let handle = reg
            .by_id
            .get_mut(&id)
            .ok_or_else(|| CodegraphError::repo_not_found(format!("repo {id} not found")))?;
        if handle.writer {
            return Err(CodegraphError::write_locked("a writer is active"));
        }
        handle.readers += 1;
        Ok(())
    }

    /// Releases a read lock; a no-op if no reader was held (floor-clamped
    /// at zero).
    pub fn release_read(&self, id: u32) {
        let mut reg = self.inner.write();
        if let Some(handle) = reg.by_id.get_mut(&id) {
            handle.readers = handle.readers.saturating_sub(1);
        }
    }

    /// Acquires the write lock: fails with `ReadLocked` if readers > 0,
    /// `WriteLocked` if a writer is already active.
    pub fn acquire_write(&self, id: u32) -> Result<()> {
        let mut reg = self.inner.write();
        let handle = reg
            .by_id
            .get_mut(&id)
            .ok_or_else(|| CodegraphError::repo_not_found(format!("repo {id} not found")))?;
        if handle.writer {
            return Err(CodegraphError::write_locked("writer already active"));
        }
        if handle.readers > 0 {
            return Err(CodegraphError::read_locked("readers currently active"));
        }
        handle.writer = true;
        Ok(())
    }

    /// Releases the write lock; a no-op if not held (idempotently
    /// cleared).
    pub fn release_write(&self, id: u32) {
        let mut reg = self.inner.write();
        if let Some(handle) = reg.by_id.get_mut(&id) {
            handle.writer = false;
        }
    }

    pub fn repo_dir(&self, codegraph_dir: &Path, id: u32) -> Option<PathBuf> {
        let reg = self.inner.read();
        let handle = reg.by_id.get(&id)?;
        let hex: String = handle.dir_hash.iter().map(|b| format!("{b:02x}")).collect();
        Some(codegraph_dir.join("repos").join(hex))
    }
}

impl Default for TenantManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_hash_is_16_bytes_and_deterministic() {
        let h1 = directory_hash("/repo/a");
        let h2 = directory_hash("/repo/a");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 16);
        assert_ne!(directory_hash("/repo/a"), directory_hash("/repo/b"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let tm = TenantManager::new();
        tm.register("r1", "/repo/a").unwrap();
        let err = tm.register("r1-again", "/repo/a").unwrap_err();
        assert!(err.is(crate::error::ErrorKind::DuplicateRepo));
    }

    #[test]
    fn registering_past_cap_is_rejected() {
        let tm = TenantManager::new();
        for i in 0..MAX_REPOS {
            tm.register(format!("r{i}"), format!("/repo/{i}")).unwrap();
        }
        let err = tm.register("overflow", "/repo/overflow").unwrap_err();
        assert!(err.is(crate::error::ErrorKind::TooManyRepos));
    }

    #[test]
    fn mrsw_scenario_s5() {
        let tm = TenantManager::new();
        let id = tm.register("r", "/repo/a").unwrap();

        tm.acquire_read(id).unwrap();
        tm.acquire_read(id).unwrap();
        let err = tm.acquire_write(id).unwrap_err();
        assert!(err.is(crate::error::ErrorKind::ReadLocked));

        tm.release_read(id);
        tm.release_read(id);
        tm.acquire_write(id).unwrap();

        let err = tm.acquire_write(id).unwrap_err();
        assert!(err.is(crate::error::ErrorKind::WriteLocked));
    }

    #[test]
    fn releasing_unheld_lock_is_a_no_op() {
        let tm = TenantManager::new();
        let id = tm.register("r", "/repo/a").unwrap();
        tm.release_read(id); // no-op, readers floor-clamped at zero
        tm.release_write(id); // no-op
        assert_eq!(tm.get(id).unwrap().reader_count(), 0);
        assert!(!tm.get(id).unwrap().writer_active());
    }

    #[test]
    fn unregistering_busy_repo_fails() {
        let tm = TenantManager::new();
        let id = tm.register("r", "/repo/a").unwrap();
        tm.acquire_read(id).unwrap();
        let err = tm.unregister(id).unwrap_err();
        assert!(err.is(crate::error::ErrorKind::RepoBusy));
        tm.release_read(id);
        tm.unregister(id).unwrap();
    }
}
