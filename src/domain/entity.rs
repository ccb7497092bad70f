//! Entity model (spec §3): Symbol, File, Commit, Edge, and their enums.
//!
//! These are plain owned-data structs; the graph (`super::graph`) is
//! responsible for arena-managing their string/byte fields. Kind/language
//! enums carry stable u8 codes since they cross the binary codec (§4.3)
//! and the WAL (§4.4) verbatim.

use serde::{Deserialize, Serialize};

/// Symbol kind, stable u8 codes 0-7 (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SymbolKind {
    Function = 0,
    Method = 1,
    Class = 2,
    Variable = 3,
    Constant = 4,
    TypeDef = 5,
    Interface = 6,
    Module = 7,
}

impl SymbolKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Function),
            1 => Some(Self::Method),
            2 => Some(Self::Class),
            3 => Some(Self::Variable),
            4 => Some(Self::Constant),
            5 => Some(Self::TypeDef),
            6 => Some(Self::Interface),
            7 => Some(Self::Module),
            _ => None,
        }
    }
}

/// File language, stable u8 codes (spec §3). `Unknown` is 255 so that
/// future languages can be added in the low range without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Language {
    TypeScript = 0,
    JavaScript = 1,
    Zig = 2,
    Python = 3,
    Unknown = 255,
}

impl Language {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::TypeScript,
            1 => Self::JavaScript,
            2 => Self::Zig,
            3 => Self::Python,
            _ => Self::Unknown,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Edge kind, stable u8 codes 0-4 (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EdgeKind {
    Calls = 0,
    Imports = 1,
    Defines = 2,
    Modifies = 3,
    References = 4,
}

impl EdgeKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Calls),
            1 => Some(Self::Imports),
            2 => Some(Self::Defines),
            3 => Some(Self::Modifies),
            4 => Some(Self::References),
            _ => None,
        }
    }
}

/// Manifest kind for a monorepo package (spec §3, C13). Derived from the
/// basename of a manifest file by the caller, not by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestKind {
    PackageJson,
    CargoToml,
    BuildZig,
    PyprojectToml,
    GoMod,
    Unknown,
}

/// Source-code symbol (function, class, variable, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: u64,
    pub name: Vec<u8>,
    pub kind: SymbolKind,
    pub file_id: u32,
    pub line: u32,
    pub col: u16,
    pub scope: Vec<u8>,
}

/// Source file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: u32,
    pub path: Vec<u8>,
    pub language: Language,
    /// Milliseconds since Unix epoch; may be negative or i64::MAX.
    pub last_modified: i64,
    /// Conventionally SHA-256, exactly 32 bytes.
    pub hash: [u8; 32],
}

/// VCS commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub id: u32,
    /// Conventionally lowercase hex, exactly 40 bytes.
    pub hash: [u8; 40],
    pub timestamp: i64,
    pub author: Vec<u8>,
    pub message: Vec<u8>,
}

/// Directed, weighted, typed edge. No uniqueness constraint: duplicate
/// (src, dst, kind) tuples are all stored distinctly (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub src: u64,
    pub dst: u64,
    pub kind: EdgeKind,
    pub weight: f32,
}

impl Edge {
    pub fn new(src: u64, dst: u64, kind: EdgeKind) -> Self {
        Self {
            src,
            dst,
            kind,
            weight: 1.0,
        }
    }

    pub fn with_weight(src: u64, dst: u64, kind: EdgeKind, weight: f32) -> Self {
        Self {
            src,
            dst,
            kind,
            weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_kind_roundtrips_through_u8() {
        for code in 0u8..=7 {
            let kind = SymbolKind::from_u8(code).expect("valid code");
            assert_eq!(kind as u8, code);
        }
        assert!(SymbolKind::from_u8(8).is_none());
    }

    #[test]
    fn language_unknown_is_255_and_catches_invalid_codes() {
        assert_eq!(Language::Unknown as u8, 255);
        assert_eq!(Language::from_u8(200), Language::Unknown);
        assert_eq!(Language::from_u8(2), Language::Zig);
    }

    #[test]
    fn edge_default_weight_is_one() {
        let e = Edge::new(1, 2, EdgeKind::Calls);
        assert_eq!(e.weight, 1.0);
    }
}
