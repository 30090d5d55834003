//! ARP packet decoding (RFC 826): hardware/protocol type, address lengths,
//! opcode, then sender/target hardware and protocol addresses sized by the
//! length fields.

use std::net::Ipv4Addr;

use mac_address::MacAddress;

use super::DecodeError;

const FIXED_HEADER_LEN: usize = 8;

pub const HTYPE_ETHERNET: u16 = 1;
pub const HTYPE_EXP_ETH: u16 = 6;
pub const PTYPE_IPV4: u16 = 0x0800;
pub const PTYPE_ARP: u16 = 0x0806;

const REQUIRED_HLEN: u8 = 6;
const REQUIRED_PLEN: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOpcode {
    Request,
    Reply,
    Other(u16),
}

impl From<u16> for ArpOpcode {
    fn from(value: u16) -> Self {
        match value {
            1 => ArpOpcode::Request,
            2 => ArpOpcode::Reply,
            other => ArpOpcode::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArpPacket {
    pub htype: u16,
    pub ptype: u16,
    pub hlen: u8,
    pub plen: u8,
    pub opcode: ArpOpcode,
    pub sender_hw: MacAddress,
    pub sender_ip: Ipv4Addr,
    pub target_hw: MacAddress,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Valid per §4.A: hardware type Ethernet/ExpEth, protocol type
    /// IPv4/ARP, 6-byte hardware addresses, 4-byte protocol addresses.
    pub fn is_valid(&self) -> bool {
        matches!(self.htype, HTYPE_ETHERNET | HTYPE_EXP_ETH)
            && matches!(self.ptype, PTYPE_IPV4 | PTYPE_ARP)
            && self.hlen == REQUIRED_HLEN
            && self.plen == REQUIRED_PLEN
    }
}

pub fn parse(payload: &[u8]) -> Result<ArpPacket, DecodeError> {
    if payload.len() < FIXED_HEADER_LEN {
        return Err(DecodeError::MalformedArp);
    }

    let htype = u16::from_be_bytes([payload[0], payload[1]]);
    let ptype = u16::from_be_bytes([payload[2], payload[3]]);
    let hlen = payload[4];
    let plen = payload[5];
    let opcode = ArpOpcode::from(u16::from_be_bytes([payload[6], payload[7]]));

    let addr_block_len = 2 * hlen as usize + 2 * plen as usize;
    let body = &payload[FIXED_HEADER_LEN..];
    if body.len() < addr_block_len {
        return Err(DecodeError::MalformedArp);
    }

    let hlen_usize = hlen as usize;
    let plen_usize = plen as usize;
    let mut offset = 0;

    let sender_hw = read_mac(body, &mut offset, hlen_usize)?;
    let sender_ip = read_ipv4(body, &mut offset, plen_usize)?;
    let target_hw = read_mac(body, &mut offset, hlen_usize)?;
    let target_ip = read_ipv4(body, &mut offset, plen_usize)?;

    Ok(ArpPacket {
        htype,
        ptype,
        hlen,
        plen,
        opcode,
        sender_hw,
        sender_ip,
        target_hw,
        target_ip,
    })
}

fn read_mac(body: &[u8], offset: &mut usize, hlen: usize) -> Result<MacAddress, DecodeError> {
    let slice = body
        .get(*offset..*offset + hlen)
        .ok_or(DecodeError::MalformedArp)?;
    *offset += hlen;
    if hlen == 6 {
        let bytes: [u8; 6] = slice.try_into().unwrap();
        Ok(MacAddress::new(bytes))
    } else {
        // Non-Ethernet hardware addresses (invalid per is_valid()) still
        // decode losslessly into the low 6 bytes so the caller can inspect
        // `is_valid()` and reject rather than panicking.
        let mut bytes = [0u8; 6];
        let take = slice.len().min(6);
        bytes[..take].copy_from_slice(&slice[..take]);
        Ok(MacAddress::new(bytes))
    }
}

fn read_ipv4(body: &[u8], offset: &mut usize, plen: usize) -> Result<Ipv4Addr, DecodeError> {
    let slice = body
        .get(*offset..*offset + plen)
        .ok_or(DecodeError::MalformedArp)?;
    *offset += plen;
    if plen == 4 {
        Ok(Ipv4Addr::new(slice[0], slice[1], slice[2], slice[3]))
    } else {
        Ok(Ipv4Addr::UNSPECIFIED)
    }
}
