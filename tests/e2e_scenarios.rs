//! End-to-end scenarios (spec §8, S1-S7), driven entirely through the
//! crate's public API rather than colocated unit tests, mirroring the
//! teacher's `tests/e2e/` convention of exercising full request paths.

use codegraph_engine::codec;
use codegraph_engine::domain::entity::{Commit, Edge, EdgeKind, File, Language, Symbol, SymbolKind};
use codegraph_engine::domain::Graph;
use codegraph_engine::ppr::{ppr_push, PprParams};
use codegraph_engine::query;
use codegraph_engine::tenant::TenantManager;
use codegraph_engine::tier::TierManager;
use codegraph_engine::wal::{self, WalRecord, WalWriter};
use codegraph_engine::watcher::{ChangeKind, FileWatcher};

fn build_s1_graph() -> Graph {
    let mut g = Graph::new();
    g.add_symbol(Symbol {
        id: 1,
        name: b"main".to_vec(),
        kind: SymbolKind::Function,
        file_id: 1,
        line: 1,
        col: 0,
        scope: vec![],
    });
    g.add_symbol(Symbol {
        id: 2,
        name: b"helper".to_vec(),
        kind: SymbolKind::Function,
        file_id: 1,
        line: 20,
        col: 0,
        scope: vec![],
    });
    g.add_file(File {
        id: 1,
        path: b"src/main.zig".to_vec(),
        language: Language::Zig,
        last_modified: 1_700_000_000,
        hash: [0u8; 32],
    });
    g.add_commit(Commit {
        id: 1,
        hash: [b'a'; 40],
        timestamp: 1_700_000_000,
        author: b"dev".to_vec(),
        message: b"init".to_vec(),
    });
    g.add_edge(Edge::with_weight(1, 2, EdgeKind::Calls, 2.5));
    g
}

#[test]
fn s1_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.bin");

    let g = build_s1_graph();
    let mut file = std::fs::File::create(&path).unwrap();
    codec::serialize(&g, &mut file).unwrap();
    drop(file);

    let mut file = std::fs::File::open(&path).unwrap();
    let g2 = codec::deserialize(&mut file).unwrap();

    assert_eq!(g2.symbol_count(), 2);
    assert_eq!(g2.file_count(), 1);
    assert_eq!(g2.commit_count(), 1);
    assert_eq!(g2.edge_count(), 1);
    assert!((g2.out_edges(1)[0].weight - 2.5).abs() < 1e-6);
    assert_eq!(g2.in_edges(2).len(), 1);
}

#[test]
fn s2_crash_replay_stops_at_torn_crc() {
    let mut w = WalWriter::new();
    w.append(&WalRecord::AddSymbol(Symbol {
        id: 1,
        name: b"a".to_vec(),
        kind: SymbolKind::Function,
        file_id: 1,
        line: 1,
        col: 0,
        scope: vec![],
    }))
    .unwrap();
    w.append(&WalRecord::AddSymbol(Symbol {
        id: 2,
        name: b"b".to_vec(),
        kind: SymbolKind::Function,
        file_id: 1,
        line: 2,
        col: 0,
        scope: vec![],
    }))
    .unwrap();

    let mut bytes = w.bytes().to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF; // flip a byte of the second record's CRC

    let mut graph = Graph::new();
    let result = wal::replay(&bytes, &mut graph);

    assert_eq!(result.records_applied, 1);
    assert_eq!(graph.symbol_count(), 1);
    assert!(graph.symbol(1).is_some());
    assert!(graph.symbol(2).is_none());
}

#[test]
fn s3_push_star_dominance_and_symmetry() {
    let mut g = Graph::new();
    g.add_edge(Edge::new(1, 2, EdgeKind::Calls));
    g.add_edge(Edge::new(1, 3, EdgeKind::Calls));
    g.add_edge(Edge::new(1, 4, EdgeKind::Calls));

    let result = ppr_push(&g, 1, PprParams::default());
    let s1 = *result.scores.get(&1).unwrap();
    let s2 = *result.scores.get(&2).unwrap();
    let s3 = *result.scores.get(&3).unwrap();
    let s4 = *result.scores.get(&4).unwrap();

    assert!(s1 > s2 && s1 > s3 && s1 > s4);
    assert!(s2 > 0.0 && s3 > 0.0 && s4 > 0.0);
    assert!((s2 - s3).abs() < 1e-4);
}

#[test]
fn s4_symbol_at_closest_preceding() {
    let mut g = Graph::new();
    g.add_file(File {
        id: 1,
        path: b"f.ts".to_vec(),
        language: Language::TypeScript,
        last_modified: 0,
        hash: [0; 32],
    });
    for (id, line) in [(1u64, 1u32), (2, 50), (3, 100)] {
        g.add_symbol(Symbol {
            id,
            name: format!("sym{id}").into_bytes(),
            kind: SymbolKind::Function,
            file_id: 1,
            line,
            col: 0,
            scope: vec![],
        });
    }

    let at_55 = query::symbol_at(&g, b"f.ts", 55);
    assert_eq!(at_55.len(), 1);
    assert_eq!(at_55[0].symbol.id, 2);

    let at_1 = query::symbol_at(&g, b"f.ts", 1);
    assert_eq!(at_1.len(), 1);
    assert_eq!(at_1[0].symbol.id, 1);

    let at_0 = query::symbol_at(&g, b"f.ts", 0);
    assert!(at_0.is_empty());
}

#[test]
fn s5_mrsw_read_write_contention() {
    let tm = TenantManager::new();
    let id = tm.register("demo", "/repo/demo").unwrap();

    tm.acquire_read(id).unwrap();
    tm.acquire_read(id).unwrap();
    let err = tm.acquire_write(id).unwrap_err();
    assert!(err.is(codegraph_engine::error::ErrorKind::ReadLocked));

    tm.release_read(id);
    tm.release_read(id);
    tm.acquire_write(id).unwrap();

    let err = tm.acquire_write(id).unwrap_err();
    assert!(err.is(codegraph_engine::error::ErrorKind::WriteLocked));
}

#[test]
fn s6_tier_promotion_then_idle_demotion() {
    let tm = TierManager::new(4, 16, 3);
    tm.register_cold(1, std::path::PathBuf::from("/tmp/graph.bin"));

    tm.record_access(1, 1000);
    assert_eq!(tm.tier_of(1), Some(codegraph_engine::tier::Tier::Cold));
    tm.record_access(1, 2000);
    assert_eq!(tm.tier_of(1), Some(codegraph_engine::tier::Tier::Cold));
    tm.record_access(1, 3000);
    assert_eq!(tm.tier_of(1), Some(codegraph_engine::tier::Tier::Warm));

    tm.evict_idle(1000, 4500);
    assert_eq!(tm.tier_of(1), Some(codegraph_engine::tier::Tier::Cold));
}

#[test]
fn s7_watcher_debounce_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.txt");

    let mut w = FileWatcher::new();
    w.watch(&path).unwrap();

    std::fs::write(&path, b"hello").unwrap();

    assert!(w.poll(&path, 5000).is_none());
    assert!(w.poll(&path, 5299).is_none());
    let event = w.poll(&path, 5300).unwrap();
    assert_eq!(event.kind, ChangeKind::Created);
}
