//! Ethernet II frame decoding: 6-byte destination, 6-byte source, a 2-byte
//! ethertype/length field, and the payload. Values below `0x600` are an
//! IEEE 802.3 length field rather than an ethertype; the payload is
//! truncated to that length when present (§4.A step 1).

use mac_address::MacAddress;

use super::DecodeError;

const MIN_FRAME_LEN: usize = 14;
const LENGTH_ETHERTYPE_BOUNDARY: u16 = 0x0600;

pub const ETHERTYPE_VLAN: u16 = 0x8100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherTypeOrLength {
    EtherType(u16),
    Length(u16),
}

#[derive(Debug)]
pub struct EthernetFrame<'a> {
    pub dst: MacAddress,
    pub src: MacAddress,
    pub kind: EtherTypeOrLength,
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    /// The ethertype to dispatch decoding on: a genuine length field never
    /// carries ARP, so it's treated as a non-ARP ethertype value (0) by
    /// callers that only care whether `== 0x0800 | 0x8100`.
    pub fn ethertype(&self) -> u16 {
        match self.kind {
            EtherTypeOrLength::EtherType(t) => t,
            EtherTypeOrLength::Length(_) => 0,
        }
    }
}

pub fn parse(raw: &[u8]) -> Result<EthernetFrame<'_>, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::UnexpectedEof);
    }
    if raw.len() < MIN_FRAME_LEN {
        return Err(DecodeError::MalformedFrame);
    }

    let dst = MacAddress::new(raw[0..6].try_into().unwrap());
    let src = MacAddress::new(raw[6..12].try_into().unwrap());
    let raw_type = u16::from_be_bytes([raw[12], raw[13]]);

    let rest = &raw[14..];
    let (kind, payload) = if raw_type < LENGTH_ETHERTYPE_BOUNDARY {
        let len = raw_type as usize;
        if len > rest.len() {
            return Err(DecodeError::MalformedFrame);
        }
        (EtherTypeOrLength::Length(raw_type), &rest[..len])
    } else {
        (EtherTypeOrLength::EtherType(raw_type), rest)
    };

    Ok(EthernetFrame {
        dst,
        src,
        kind,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut raw = vec![0xff; 6];
        raw.extend_from_slice(&[0x84, 0x39, 0xc0, 0x0b, 0x22, 0x25]);
        raw.extend_from_slice(&ethertype.to_be_bytes());
        raw.extend_from_slice(payload);
        raw
    }

    #[test]
    fn parses_arp_ethertype() {
        let raw = frame(0x0806, &[1, 2, 3]);
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.ethertype(), 0x0806);
        assert_eq!(parsed.payload, &[1, 2, 3]);
    }

    #[test]
    fn empty_input_is_unexpected_eof() {
        assert!(matches!(parse(&[]), Err(DecodeError::UnexpectedEof)));
    }

    #[test]
    fn undersized_frame_is_malformed() {
        let raw = vec![0u8; 13];
        assert!(matches!(parse(&raw), Err(DecodeError::MalformedFrame)));
    }

    #[test]
    fn length_field_truncates_payload() {
        let raw = frame(4, &[1, 2, 3, 4, 5, 6]);
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.payload, &[1, 2, 3, 4]);
        assert!(matches!(parsed.kind, EtherTypeOrLength::Length(4)));
    }
}
