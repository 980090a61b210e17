//! Byte utilities: Pascal-string codec, hex<->bytes, and small concatenation helpers.
//!
//! Kept dependency-free and `no_std`: every higher layer (node codec, key
//! parsing) builds on these primitives rather than reaching for an external
//! hex crate.

use alloc::string::String;
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CasError;

/// Writes a Pascal string: u16 LE byte length, then the UTF-8 bytes.
///
/// Fails with `PascalOverflow` if `s` is longer than `u16::MAX` bytes —
/// directory entry names are expected to be short, and this keeps the
/// on-wire length field a fixed 2 bytes.
pub fn write_pascal_string(out: &mut Vec<u8>, s: &str) -> Result<(), CasError> {
    let bytes = s.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(CasError::PascalOverflow);
    }
    let mut len_buf = [0u8; 2];
    LittleEndian::write_u16(&mut len_buf, bytes.len() as u16);
    out.extend_from_slice(&len_buf);
    out.extend_from_slice(bytes);
    Ok(())
}

/// Reads a Pascal string from the front of `data`, returning `(string, rest)`.
///
/// `PascalOverflow` if the claimed length exceeds the remaining buffer;
/// `InvalidUtf8Name` if the claimed bytes are not valid UTF-8.
pub fn read_pascal_string(data: &[u8]) -> Result<(String, &[u8]), CasError> {
    if data.len() < 2 {
        return Err(CasError::PascalOverflow);
    }
    let len = LittleEndian::read_u16(&data[0..2]) as usize;
    let data = &data[2..];
    if data.len() < len {
        return Err(CasError::PascalOverflow);
    }
    let (raw, rest) = data.split_at(len);
    let s = core::str::from_utf8(raw)
        .map_err(|_| CasError::InvalidUtf8Name)?
        .into();
    Ok((s, rest))
}

/// Encodes `bytes` as a lowercase hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Decodes a lowercase hex string into bytes. Rejects uppercase, odd length,
/// or any non-hex character — the key format is strict (see `key.rs`).
pub fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let hi = hex_digit(bytes[i])?;
        let lo = hex_digit(bytes[i + 1])?;
        out.push((hi << 4) | lo);
        i += 2;
    }
    Some(out)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Concatenates a header image, child digests, and a body into one buffer,
/// sized exactly so no reallocation occurs during the copy.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for p in parts {
        out.extend_from_slice(p);
    }
    out
}
