//! Binary storage codec (spec §4.3): little-endian, stream-oriented
//! serialization of the full graph.
//!
//! ```text
//! magic = "CGDB" (4 bytes)
//! format_version : u32
//! num_symbols    : u32
//! num_files      : u32
//! num_commits    : u32
//! num_edges      : u32
//! [ symbol block × num_symbols ]
//! [ file   block × num_files   ]
//! [ commit block × num_commits ]
//! [ edge   block × num_edges   ]
//! ```

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::domain::entity::{Commit, Edge, EdgeKind, File, Language, Symbol, SymbolKind};
use crate::domain::graph::Graph;
use crate::error::{CodegraphError, Result};

pub const MAGIC: &[u8; 4] = b"CGDB";
pub const FORMAT_VERSION: u32 = 1;

/// Length-prefixed byte strings larger than this are rejected outright
/// rather than trusted to allocate (spec §4.3).
pub const MAX_STRING_LEN: u32 = 10 * 1024 * 1024;

fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> Result<()> {
    w.write_u32::<LittleEndian>(bytes.len() as u32)?;
    w.write_all(bytes)?;
    Ok(())
}

fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = r.read_u32::<LittleEndian>()?;
    if len > MAX_STRING_LEN {
        return Err(CodegraphError::string_too_large(format!(
            "length-prefixed string of {len} bytes exceeds {MAX_STRING_LEN} byte cap"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_symbol<W: Write>(w: &mut W, s: &Symbol) -> Result<()> {
    w.write_u64::<LittleEndian>(s.id)?;
    write_bytes(w, &s.name)?;
    w.write_u8(s.kind as u8)?;
    w.write_u32::<LittleEndian>(s.file_id)?;
    w.write_u32::<LittleEndian>(s.line)?;
    w.write_u16::<LittleEndian>(s.col)?;
    write_bytes(w, &s.scope)?;
    Ok(())
}

fn read_symbol<R: Read>(r: &mut R) -> Result<Symbol> {
    let id = r.read_u64::<LittleEndian>()?;
    let name = read_bytes(r)?;
    let kind_raw = r.read_u8()?;
    let kind = SymbolKind::from_u8(kind_raw)
        .ok_or_else(|| CodegraphError::invalid_format(format!("unknown symbol kind {kind_raw}")))?;
    let file_id = r.read_u32::<LittleEndian>()?;
    let line = r.read_u32::<LittleEndian>()?;
    let col = r.read_u16::<LittleEndian>()?;
    let scope = read_bytes(r)?;
    Ok(Symbol {
        id,
        name,
        kind,
        file_id,
        line,
        col,
        scope,
    })
}

fn write_file<W: Write>(w: &mut W, f: &File) -> Result<()> {
    w.write_u32::<LittleEndian>(f.id)?;
    write_bytes(w, &f.path)?;
    w.write_u8(f.language.as_u8())?;
    w.write_i64::<LittleEndian>(f.last_modified)?;
    w.write_all(&f.hash)?;
    Ok(())
}

fn read_file<R: Read>(r: &mut R) -> Result<File> {
    let id = r.read_u32::<LittleEndian>()?;
    let path = read_bytes(r)?;
    let language = Language::from_u8(r.read_u8()?);
    let last_modified = r.read_i64::<LittleEndian>()?;
    let mut hash = [0u8; 32];
    r.read_exact(&mut hash)?;
    Ok(File {
        id,
        path,
        language,
        last_modified,
        hash,
    })
}

fn write_commit<W: Write>(w: &mut W, c: &Commit) -> Result<()> {
    w.write_u32::<LittleEndian>(c.id)?;
    w.write_all(&c.hash)?;
    w.write_i64::<LittleEndian>(c.timestamp)?;
    write_bytes(w, &c.author)?;
    write_bytes(w, &c.message)?;
    Ok(())
}

fn read_commit<R: Read>(r: &mut R) -> Result<Commit> {
    let id = r.read_u32::<LittleEndian>()?;
    let mut hash = [0u8; 40];
    r.read_exact(&mut hash)?;
    let timestamp = r.read_i64::<LittleEndian>()?;
    let author = read_bytes(r)?;
    let message = read_bytes(r)?;
    Ok(Commit {
        id,
        hash,
        timestamp,
        author,
        message,
    })
}

pub fn write_edge<W: Write>(w: &mut W, e: &Edge) -> Result<()> {
    w.write_u64::<LittleEndian>(e.src)?;
    w.write_u64::<LittleEndian>(e.dst)?;
    w.write_u8(e.kind as u8)?;
    w.write_u32::<LittleEndian>(e.weight.to_bits())?;
    Ok(())
}

pub fn read_edge<R: Read>(r: &mut R) -> Result<Edge> {
    let src = r.read_u64::<LittleEndian>()?;
    let dst = r.read_u64::<LittleEndian>()?;
    let kind_raw = r.read_u8()?;
    let kind = EdgeKind::from_u8(kind_raw)
        .ok_or_else(|| CodegraphError::invalid_format(format!("unknown edge kind {kind_raw}")))?;
    let weight = f32::from_bits(r.read_u32::<LittleEndian>()?);
    Ok(Edge {
        src,
        dst,
        kind,
        weight,
    })
}

/// Serializes the full graph to `w`.
pub fn serialize<W: Write>(graph: &Graph, w: &mut W) -> Result<()> {
    w.write_all(MAGIC)?;
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    w.write_u32::<LittleEndian>(graph.symbol_count() as u32)?;
    w.write_u32::<LittleEndian>(graph.file_count() as u32)?;
    w.write_u32::<LittleEndian>(graph.commit_count() as u32)?;
    w.write_u32::<LittleEndian>(graph.edge_count() as u32)?;

    for s in graph.iter_symbols() {
        write_symbol(w, s)?;
    }
    for f in graph.iter_files() {
        write_file(w, f)?;
    }
    for c in graph.iter_commits() {
        write_commit(w, c)?;
    }
    for e in graph.iter_edges() {
        write_edge(w, e)?;
    }
    Ok(())
}

/// Deserializes a full graph from `r`.
pub fn deserialize<R: Read>(r: &mut R) -> Result<Graph> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(CodegraphError::invalid_format("magic mismatch"));
    }
    let version = r.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(CodegraphError::unsupported_version(format!(
            "unsupported format version {version}"
        )));
    }

    let num_symbols = r.read_u32::<LittleEndian>()?;
    let num_files = r.read_u32::<LittleEndian>()?;
    let num_commits = r.read_u32::<LittleEndian>()?;
    let num_edges = r.read_u32::<LittleEndian>()?;

    let mut graph = Graph::new();

    for _ in 0..num_symbols {
        graph.add_symbol(read_symbol(r)?);
    }
    for _ in 0..num_files {
        graph.add_file(read_file(r)?);
    }
    for _ in 0..num_commits {
        graph.add_commit(read_commit(r)?);
    }
    for _ in 0..num_edges {
        graph.add_edge(read_edge(r)?);
    }

    Ok(graph)
}
