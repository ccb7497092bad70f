//! IPC frame protocol (spec §4.9): length-prefixed binary frames with
//! JSON payloads over a Unix socket.
//!
//! ```text
//! frame := [length: u32 LE][payload: length bytes]
//! ```
//!
//! Grounded on `codegraph-ir`'s RFC-RUST-ENGINE framing protocol
//! dependency choice (`byteorder` for "u32 little-endian framing").

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CodegraphError, Result};

pub const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Reads one length-prefixed frame from `r`.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = r.read_u32::<LittleEndian>()?;
    if len > MAX_FRAME_BYTES {
        return Err(CodegraphError::frame_too_large(format!(
            "frame of {len} bytes exceeds {MAX_FRAME_BYTES} byte cap"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Writes `payload` as one length-prefixed frame to `w`.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() as u64 > MAX_FRAME_BYTES as u64 {
        return Err(CodegraphError::frame_too_large(format!(
            "frame of {} bytes exceeds {MAX_FRAME_BYTES} byte cap",
            payload.len()
        )));
    }
    w.write_u32::<LittleEndian>(payload.len() as u32)?;
    w.write_all(payload)?;
    w.flush()?;
    Ok(())
}

/// Request grammar (spec §4.9): `{ "method": <string>, "params": <object?> }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

pub fn parse_request(bytes: &[u8]) -> Result<Request> {
    serde_json::from_slice(bytes)
        .map_err(|e| CodegraphError::invalid_request(format!("malformed IPC JSON: {e}")))
}

/// Helper for pulling a required u64 field out of `params`.
pub fn required_u64(params: &Value, field: &str) -> Result<u64> {
    params
        .get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| CodegraphError::missing_params(format!("missing or invalid `{field}`")))
}

pub fn required_string(params: &Value, field: &str) -> Result<String> {
    params
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| CodegraphError::missing_params(format!("missing or invalid `{field}`")))
}

pub fn optional_u64(params: &Value, field: &str, default: u64) -> u64 {
    params.get(field).and_then(Value::as_u64).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").unwrap();
        let payload = read_frame(&mut buf.as_slice()).unwrap();
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn oversized_frame_is_rejected_on_write() {
        let big = vec![0u8; (MAX_FRAME_BYTES + 1) as usize];
        let mut buf = Vec::new();
        let err = write_frame(&mut buf, &big).unwrap_err();
        assert!(err.is(crate::error::ErrorKind::FrameTooLarge));
    }

    #[test]
    fn oversized_frame_is_rejected_on_read() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_le_bytes());
        let err = read_frame(&mut buf.as_slice()).unwrap_err();
        assert!(err.is(crate::error::ErrorKind::FrameTooLarge));
    }

    #[test]
    fn parse_request_grammar() {
        let req = parse_request(br#"{"method":"symbol_at","params":{"file":"f.ts","line":1}}"#).unwrap();
        assert_eq!(req.method, "symbol_at");
        assert_eq!(required_string(&req.params, "file").unwrap(), "f.ts");
        assert_eq!(required_u64(&req.params, "line").unwrap(), 1);
    }

    #[test]
    fn missing_params_field_is_an_error() {
        let req = parse_request(br#"{"method":"find_callers","params":{}}"#).unwrap();
        assert!(required_u64(&req.params, "symbol_id").is_err());
    }

    #[test]
    fn optional_u64_falls_back_to_default() {
        let req = parse_request(br#"{"method":"find_dependents","params":{"symbol_id":1}}"#).unwrap();
        assert_eq!(optional_u64(&req.params, "max_results", 10), 10);
    }
}
