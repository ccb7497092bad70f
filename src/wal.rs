//! Write-ahead log (spec §4.4): append-only mutation log with per-record
//! CRC32 and crash-safe replay.
//!
//! ```text
//! record := [op: u8][payload][crc32: u32]   (crc covers payload only)
//! ```
//!
//! Grounded on `codegraph-ir/src/features/multi_index/infrastructure/wal.rs`'s
//! append/replay/checksum/compact shape, adapted to spec's exact op codes,
//! per-entity payload encodings (shared with the binary codec), and the
//! "torn tail is silently truncated" replay contract.

use std::collections::HashSet;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::info;

use crate::codec;
use crate::domain::entity::{Commit, Edge, File, Symbol};
use crate::domain::graph::Graph;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    AddSymbol = 0x01,
    AddFile = 0x02,
    AddCommit = 0x03,
    AddEdge = 0x04,
    FileInvalidate = 0x05,
    Checkpoint = 0xFF,
}

impl OpCode {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::AddSymbol),
            0x02 => Some(Self::AddFile),
            0x03 => Some(Self::AddCommit),
            0x04 => Some(Self::AddEdge),
            0x05 => Some(Self::FileInvalidate),
            0xFF => Some(Self::Checkpoint),
            _ => None,
        }
    }
}

/// A decoded record, carrying enough to both apply it to a `Graph` and
/// report it via `ReplayResult`.
#[derive(Debug, Clone)]
pub enum WalRecord {
    AddSymbol(Symbol),
    AddFile(File),
    AddCommit(Commit),
    AddEdge(Edge),
    FileInvalidate(u32),
    Checkpoint,
}

/// CRC32 (IEEE 802.3 polynomial), computed without external dependencies
/// so the WAL format has no decoding surprises tied to a crate version.
fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (POLY & mask);
        }
    }
    !crc
}

fn encode_payload(record: &WalRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match record {
        WalRecord::AddSymbol(s) => codec_write_symbol(&mut buf, s)?,
        WalRecord::AddFile(f) => codec_write_file(&mut buf, f)?,
        WalRecord::AddCommit(c) => codec_write_commit(&mut buf, c)?,
        WalRecord::AddEdge(e) => codec::write_edge(&mut buf, e)?,
        WalRecord::FileInvalidate(id) => buf.write_u32::<LittleEndian>(*id)?,
        WalRecord::Checkpoint => {}
    }
    Ok(buf)
}

fn op_code_of(record: &WalRecord) -> OpCode {
    match record {
        WalRecord::AddSymbol(_) => OpCode::AddSymbol,
        WalRecord::AddFile(_) => OpCode::AddFile,
        WalRecord::AddCommit(_) => OpCode::AddCommit,
        WalRecord::AddEdge(_) => OpCode::AddEdge,
        WalRecord::FileInvalidate(_) => OpCode::FileInvalidate,
        WalRecord::Checkpoint => OpCode::Checkpoint,
    }
}

// Payload encodings mirror codec.rs's per-entity layout (spec §4.4).
fn codec_write_symbol(buf: &mut Vec<u8>, s: &Symbol) -> Result<()> {
    buf.write_u64::<LittleEndian>(s.id)?;
    write_bytes(buf, &s.name)?;
    buf.write_u8(s.kind as u8)?;
    buf.write_u32::<LittleEndian>(s.file_id)?;
    buf.write_u32::<LittleEndian>(s.line)?;
    buf.write_u16::<LittleEndian>(s.col)?;
    write_bytes(buf, &s.scope)?;
    Ok(())
}

fn codec_write_file(buf: &mut Vec<u8>, f: &File) -> Result<()> {
    buf.write_u32::<LittleEndian>(f.id)?;
    write_bytes(buf, &f.path)?;
    buf.write_u8(f.language.as_u8())?;
    buf.write_i64::<LittleEndian>(f.last_modified)?;
    buf.write_all(&f.hash)?;
    Ok(())
}

fn codec_write_commit(buf: &mut Vec<u8>, c: &Commit) -> Result<()> {
    buf.write_u32::<LittleEndian>(c.id)?;
    buf.write_all(&c.hash)?;
    buf.write_i64::<LittleEndian>(c.timestamp)?;
    write_bytes(buf, &c.author)?;
    write_bytes(buf, &c.message)?;
    Ok(())
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    buf.write_u32::<LittleEndian>(bytes.len() as u32)?;
    buf.write_all(bytes)?;
    Ok(())
}

fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = r.read_u32::<LittleEndian>()?;
    if len > codec::MAX_STRING_LEN {
        return Err(crate::error::CodegraphError::string_too_large(
            "WAL payload string exceeds cap",
        ));
    }
    let mut out = vec![0u8; len as usize];
    r.read_exact(&mut out)?;
    Ok(out)
}

fn decode_payload(op: OpCode, payload: &[u8]) -> Result<WalRecord> {
    let mut cur = payload;
    Ok(match op {
        OpCode::AddSymbol => {
            let id = cur.read_u64::<LittleEndian>()?;
            let name = read_bytes(&mut cur)?;
            let kind_raw = cur.read_u8()?;
            let kind = crate::domain::entity::SymbolKind::from_u8(kind_raw).ok_or_else(|| {
                crate::error::CodegraphError::invalid_format("unknown symbol kind in WAL")
            })?;
            let file_id = cur.read_u32::<LittleEndian>()?;
            let line = cur.read_u32::<LittleEndian>()?;
            let col = cur.read_u16::<LittleEndian>()?;
            let scope = read_bytes(&mut cur)?;
            WalRecord::AddSymbol(Symbol {
                id,
                name,
                kind,
                file_id,
                line,
                col,
                scope,
            })
        }
        OpCode::AddFile => {
            let id = cur.read_u32::<LittleEndian>()?;
            let path = read_bytes(&mut cur)?;
            let language = crate::domain::entity::Language::from_u8(cur.read_u8()?);
            let last_modified = cur.read_i64::<LittleEndian>()?;
            let mut hash = [0u8; 32];
            cur.read_exact(&mut hash)?;
            WalRecord::AddFile(File {
                id,
                path,
                language,
                last_modified,
                hash,
            })
        }
        OpCode::AddCommit => {
            let id = cur.read_u32::<LittleEndian>()?;
            let mut hash = [0u8; 40];
            cur.read_exact(&mut hash)?;
            let timestamp = cur.read_i64::<LittleEndian>()?;
            let author = read_bytes(&mut cur)?;
            let message = read_bytes(&mut cur)?;
            WalRecord::AddCommit(Commit {
                id,
                hash,
                timestamp,
                author,
                message,
            })
        }
        OpCode::AddEdge => WalRecord::AddEdge(codec::read_edge(&mut cur)?),
        OpCode::FileInvalidate => WalRecord::FileInvalidate(cur.read_u32::<LittleEndian>()?),
        OpCode::Checkpoint => WalRecord::Checkpoint,
    })
}

/// Applies a decoded record to `graph`.
pub fn apply(graph: &mut Graph, record: &WalRecord) {
    match record {
        WalRecord::AddSymbol(s) => graph.add_symbol(s.clone()),
        WalRecord::AddFile(f) => graph.add_file(f.clone()),
        WalRecord::AddCommit(c) => graph.add_commit(c.clone()),
        WalRecord::AddEdge(e) => graph.add_edge(*e),
        WalRecord::FileInvalidate(_) => {}
        WalRecord::Checkpoint => {}
    }
}

/// Outcome of replaying a byte sequence (spec §4.4).
#[derive(Debug, Default, Clone)]
pub struct ReplayResult {
    pub records_applied: usize,
    pub checkpoints_observed: usize,
    pub invalidated_files: HashSet<u32>,
}

/// Replays `bytes` into `graph`, applying records until {unknown op,
/// truncated payload, CRC mismatch}, at which point replay stops
/// cleanly — a torn tail is silently truncated (spec §4.4).
pub fn replay(bytes: &[u8], graph: &mut Graph) -> ReplayResult {
    let mut result = ReplayResult::default();
    let mut cur = bytes;

    loop {
        if cur.is_empty() {
            break;
        }
        let record_start = cur;
        let op_raw = match cur.read_u8() {
            Ok(v) => v,
            Err(_) => break,
        };
        let op = match OpCode::from_u8(op_raw) {
            Some(op) => op,
            None => break,
        };

        // Decode the payload speculatively so we know its byte length,
        // then verify the trailing CRC before committing the record.
        let before_payload_len = cur.len();
        let decoded = decode_payload(op, cur);
        let record = match decoded {
            Ok(r) => r,
            Err(_) => break,
        };
        let consumed = before_payload_len - cur.len();
        let payload_bytes = &record_start[1..1 + consumed];

        let crc_expected = match cur.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(_) => break,
        };
        let crc_actual = crc32(payload_bytes);
        if crc_actual != crc_expected {
            break;
        }

        match &record {
            WalRecord::Checkpoint => result.checkpoints_observed += 1,
            WalRecord::FileInvalidate(id) => {
                result.invalidated_files.insert(*id);
            }
            _ => {}
        }
        apply(graph, &record);
        result.records_applied += 1;
    }

    result
}

/// Append-only in-memory WAL buffer; `flush_to` performs the actual
/// durable write (spec §4.4: "Writer holds an in-memory byte buffer").
#[derive(Debug, Default)]
pub struct WalWriter {
    buffer: Vec<u8>,
}

impl WalWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: &WalRecord) -> Result<()> {
        let op = op_code_of(record);
        let payload = encode_payload(record)?;
        let crc = crc32(&payload);

        self.buffer.write_u8(op as u8)?;
        self.buffer.write_all(&payload)?;
        self.buffer.write_u32::<LittleEndian>(crc)?;
        Ok(())
    }

    pub fn append_checkpoint(&mut self) -> Result<()> {
        self.append(&WalRecord::Checkpoint)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn flush_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.buffer)?;
        w.flush()?;
        Ok(())
    }

    /// Performs a full checkpoint (spec §4.4): serializes `graph` to
    /// `graph_path` via the binary codec (C3), appends a checkpoint
    /// record, flushes the buffer to `wal_path`, then truncates
    /// `wal_path` to zero length. Once the full graph is durably on
    /// disk, every record written before (and including) the checkpoint
    /// is redundant, so the whole WAL file is discarded rather than
    /// just a prefix. Resets the in-memory buffer on success.
    pub fn checkpoint_and_truncate(
        &mut self,
        graph: &Graph,
        graph_path: &std::path::Path,
        wal_path: &std::path::Path,
    ) -> Result<()> {
        let mut graph_file = std::fs::File::create(graph_path)?;
        codec::serialize(graph, &mut graph_file)?;
        graph_file.flush()?;

        self.append_checkpoint()?;

        // Flush the buffer (prior appends plus the checkpoint marker)
        // to disk before truncating: a crash between these two calls
        // still leaves a replayable WAL, since `graph_path` isn't
        // trusted as durable until this whole function returns.
        let mut wal_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(wal_path)?;
        self.flush_to(&mut wal_file)?;
        wal_file.set_len(0)?;

        self.reset();
        info!(
            graph_path = %graph_path.display(),
            wal_path = %wal_path.display(),
            symbols = graph.symbol_count(),
            edges = graph.edge_count(),
            "checkpoint complete, WAL truncated"
        );
        Ok(())
    }
}
