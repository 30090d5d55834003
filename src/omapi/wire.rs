//! OMAPI wire primitives (§4.C): the fixed six-`u32` header and the
//! length-prefixed map encoding. Free functions over raw byte buffers,
//! mirroring the teacher's manual packet-slicing style rather than a
//! derive-based serializer — the 32/64-bit width ambiguity the source
//! worked around does not exist here: every length is explicitly u16 or
//! u32 big-endian (Design Note 3).

use std::collections::BTreeMap;

use super::OmapiError;

pub const HEADER_SIZE: u32 = 24;
pub const PROTOCOL_VERSION: u32 = 100;

pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn put_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn put_bool(buf: &mut Vec<u8>, value: bool) {
    put_i32(buf, if value { 1 } else { 0 });
}

pub fn put_ipv4(buf: &mut Vec<u8>, value: std::net::Ipv4Addr) {
    buf.extend_from_slice(&value.octets());
}

pub fn read_u32(raw: &[u8], offset: usize) -> Result<u32, OmapiError> {
    let slice = raw
        .get(offset..offset + 4)
        .ok_or(OmapiError::Truncated)?;
    Ok(u32::from_be_bytes(slice.try_into().expect("length checked above")))
}

/// An ordered field map (`Vec<u8>` values so callers can hold either text
/// or raw binary fields such as MAC addresses).
pub type FieldMap = BTreeMap<String, Vec<u8>>;

/// Encodes a map in lexicographic key order (required by the signing
/// contract in §4.C even outside of a sign/verify call — `BTreeMap`
/// guarantees this for free).
pub fn encode_map(map: &FieldMap, out: &mut Vec<u8>) {
    for (key, value) in map {
        out.extend_from_slice(&(key.len() as u16).to_be_bytes());
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(&(value.len() as u32).to_be_bytes());
        out.extend_from_slice(value);
    }
    out.extend_from_slice(&0u16.to_be_bytes());
}

/// Decodes a map starting at `offset`, returning the map and the offset
/// just past the terminating `0x0000`.
pub fn decode_map(raw: &[u8], mut offset: usize) -> Result<(FieldMap, usize), OmapiError> {
    let mut map = FieldMap::new();
    loop {
        let key_len = raw
            .get(offset..offset + 2)
            .ok_or(OmapiError::Truncated)?;
        let key_len = u16::from_be_bytes(key_len.try_into().unwrap()) as usize;
        offset += 2;
        if key_len == 0 {
            return Ok((map, offset));
        }
        let key = raw
            .get(offset..offset + key_len)
            .ok_or(OmapiError::Truncated)?;
        let key = String::from_utf8(key.to_vec()).map_err(|_| OmapiError::Truncated)?;
        offset += key_len;

        let value_len = raw
            .get(offset..offset + 4)
            .ok_or(OmapiError::Truncated)?;
        let value_len = u32::from_be_bytes(value_len.try_into().unwrap()) as usize;
        offset += 4;
        let value = raw
            .get(offset..offset + value_len)
            .ok_or(OmapiError::Truncated)?;
        offset += value_len;

        map.insert(key, value.to_vec());
    }
}
