//! IEEE 802.1Q VLAN tag decoding: a 4-byte tag carrying a 3-bit priority,
//! a 1-bit drop-eligible-indicator, a 12-bit VID, and the 16-bit inner
//! ethertype (§4.A step 2).

use super::DecodeError;

const VLAN_TAG_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    pub priority: u8,
    pub dei: bool,
    pub vid: u16,
    pub inner_ethertype: u16,
}

pub fn parse(payload: &[u8]) -> Result<(VlanTag, &[u8]), DecodeError> {
    if payload.len() < VLAN_TAG_LEN {
        return Err(DecodeError::MalformedVlan);
    }

    let tci = u16::from_be_bytes([payload[0], payload[1]]);
    let priority = ((tci >> 13) & 0b111) as u8;
    let dei = (tci >> 12) & 0b1 != 0;
    let vid = tci & 0x0fff;
    let inner_ethertype = u16::from_be_bytes([payload[2], payload[3]]);

    Ok((
        VlanTag {
            priority,
            dei,
            vid,
            inner_ethertype,
        },
        &payload[VLAN_TAG_LEN..],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vid_2() {
        let raw = [0x00, 0x02, 0x08, 0x06];
        let (tag, rest) = parse(&raw).unwrap();
        assert_eq!(tag.vid, 2);
        assert_eq!(tag.inner_ethertype, 0x0806);
        assert!(rest.is_empty());
    }

    #[test]
    fn undersized_tag_is_malformed() {
        assert!(matches!(parse(&[0, 1]), Err(DecodeError::MalformedVlan)));
    }

    #[test]
    fn priority_and_dei_bits_extracted() {
        // priority = 0b101, dei = 1, vid = 0x0ab
        let tci: u16 = (0b101 << 13) | (1 << 12) | 0x0ab;
        let raw = [(tci >> 8) as u8, (tci & 0xff) as u8, 0x08, 0x00];
        let (tag, _) = parse(&raw).unwrap();
        assert_eq!(tag.priority, 0b101);
        assert!(tag.dei);
        assert_eq!(tag.vid, 0x0ab);
    }
}
