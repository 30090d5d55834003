//! The single normalized OMAPI message type (Design Note 2: the source
//! carries a historical and a rewritten copy of this struct plus its
//! authenticator; this crate exposes exactly one).

use super::wire::{decode_map, encode_map, put_u32, read_u32, FieldMap};
use super::OmapiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Open,
    Refresh,
    Update,
    Notify,
    Error,
    Delete,
    Status,
}

impl Opcode {
    fn as_u32(self) -> u32 {
        match self {
            Opcode::Open => 1,
            Opcode::Refresh => 2,
            Opcode::Update => 3,
            Opcode::Notify => 4,
            Opcode::Error => 5,
            Opcode::Delete => 6,
            Opcode::Status => 7,
        }
    }

    fn from_u32(value: u32) -> Result<Self, OmapiError> {
        Ok(match value {
            1 => Opcode::Open,
            2 => Opcode::Refresh,
            3 => Opcode::Update,
            4 => Opcode::Notify,
            5 => Opcode::Error,
            6 => Opcode::Delete,
            7 => Opcode::Status,
            other => return Err(OmapiError::UnknownOpcode(other)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub auth_id: u32,
    pub op: Opcode,
    pub handle: u32,
    pub tid: u32,
    pub rid: u32,
    pub msg: FieldMap,
    pub obj: FieldMap,
    pub signature: Vec<u8>,
}

impl Message {
    /// Serializes the full wire image: header, `msg`, `obj`, signature.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_u32(&mut buf, self.auth_id);
        put_u32(&mut buf, self.signature.len() as u32);
        put_u32(&mut buf, self.op.as_u32());
        put_u32(&mut buf, self.handle);
        put_u32(&mut buf, self.tid);
        put_u32(&mut buf, self.rid);
        encode_map(&self.msg, &mut buf);
        encode_map(&self.obj, &mut buf);
        buf.extend_from_slice(&self.signature);
        buf
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, OmapiError> {
        let auth_id = read_u32(raw, 0)?;
        let signature_len = read_u32(raw, 4)? as usize;
        let op = Opcode::from_u32(read_u32(raw, 8)?)?;
        let handle = read_u32(raw, 12)?;
        let tid = read_u32(raw, 16)?;
        let rid = read_u32(raw, 20)?;

        let (msg, offset) = decode_map(raw, 24)?;
        let (obj, offset) = decode_map(raw, offset)?;
        let signature = raw
            .get(offset..offset + signature_len)
            .ok_or(OmapiError::Truncated)?
            .to_vec();

        Ok(Self {
            auth_id,
            op,
            handle,
            tid,
            rid,
            msg,
            obj,
            signature,
        })
    }

    /// The bytes HMAC-signing runs over: the wire image with the leading
    /// `auth_id` field and the trailing signature bytes excluded.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let full = self.to_bytes();
        let start = 4;
        let end = full.len() - self.signature.len();
        full[start..end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        let mut msg = FieldMap::new();
        msg.insert("type".to_string(), b"host".to_vec());
        Message {
            auth_id: 7,
            op: Opcode::Open,
            handle: 0,
            tid: 42,
            rid: 0,
            msg,
            obj: FieldMap::new(),
            signature: vec![0xaa; 16],
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let original = sample();
        let encoded = original.to_bytes();
        let decoded = Message::from_bytes(&encoded).unwrap();
        assert_eq!(decoded.op, Opcode::Open);
        assert_eq!(decoded.tid, 42);
        assert_eq!(decoded.signature, original.signature);
    }

    #[test]
    fn signable_bytes_excludes_auth_id_and_signature() {
        let original = sample();
        let signable = original.signable_bytes();
        let full = original.to_bytes();
        assert_eq!(signable.len(), full.len() - 4 - original.signature.len());
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let mut buf = vec![0u8; 24];
        buf[8..12].copy_from_slice(&99u32.to_be_bytes());
        assert!(Message::from_bytes(&buf).is_err());
    }
}
