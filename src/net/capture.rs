//! Packet-capture pipeline: opens a promiscuous, 64-byte-snaplen capture
//! with BPF filter `ether proto arp`, decodes each frame, updates the
//! binding table, and streams results to the caller over a channel
//! (§4.A, §5 "(A) One capture task... and one dispatch task").

use std::net::Ipv4Addr;
use std::time::SystemTime;

use mac_address::MacAddress;
use tokio::sync::mpsc;

use super::arp::{self, ArpOpcode};
use super::binding::{BindingKey, BindingTable, Event};
use super::ethernet;
use super::vlan;
use super::DecodeError;

const SNAPLEN: i32 = 64;
const BPF_FILTER: &str = "ether proto arp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub ip: Ipv4Addr,
    pub mac: MacAddress,
    pub previous_mac: Option<MacAddress>,
    pub vid: Option<u16>,
    pub event: Event,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to open capture device {iface}: {source}")]
    Open {
        iface: String,
        #[source]
        source: pcap::Error,
    },
    #[error("capture channel closed")]
    ChannelClosed,
    #[error(transparent)]
    Pcap(#[from] pcap::Error),
}

/// Decodes one captured Ethernet frame and applies the binding-update
/// algorithm from §4.A. Returns `Ok(None)` for frames that are well-formed
/// but not ARP (or not the VLAN-tagged ARP case), and `Err` for malformed
/// input — both cases leave capture running; only the caller decides
/// whether to log and continue.
pub fn process_frame(
    table: &mut BindingTable,
    raw: &[u8],
    now: SystemTime,
) -> Result<Vec<CaptureResult>, DecodeError> {
    let frame = ethernet::parse(raw)?;

    let (vid, arp_payload) = match frame.ethertype() {
        ethernet::ETHERTYPE_VLAN => {
            let (tag, rest) = vlan::parse(frame.payload)?;
            if tag.inner_ethertype != 0x0806 {
                return Ok(Vec::new());
            }
            (Some(tag.vid), rest)
        }
        0x0806 => (None, frame.payload),
        _ => return Ok(Vec::new()),
    };

    let packet = arp::parse(arp_payload)?;
    if !packet.is_valid() {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();

    let sender_key = BindingKey {
        vid,
        ip: packet.sender_ip,
    };
    if let Some(event) = table.observe(sender_key, packet.sender_hw, now) {
        results.push(result_from_event(
            packet.sender_ip,
            packet.sender_hw,
            vid,
            event,
        ));
    }

    if packet.opcode == ArpOpcode::Reply {
        let target_key = BindingKey {
            vid,
            ip: packet.target_ip,
        };
        if let Some(event) = table.observe(target_key, packet.target_hw, now) {
            results.push(result_from_event(
                packet.target_ip,
                packet.target_hw,
                vid,
                event,
            ));
        }
    }

    Ok(results)
}

fn result_from_event(
    ip: Ipv4Addr,
    mac: MacAddress,
    vid: Option<u16>,
    event: Event,
) -> CaptureResult {
    let previous_mac = match event {
        Event::Moved { previous_mac } => Some(previous_mac),
        _ => None,
    };
    CaptureResult {
        ip,
        mac,
        previous_mac,
        vid,
        event,
    }
}

/// Opens `iface` and streams [`CaptureResult`] values into `result_sink`
/// until `cancel` fires. A closed capture device is fatal; malformed
/// individual frames are logged and skipped.
pub async fn start(
    iface: &str,
    result_sink: mpsc::Sender<CaptureResult>,
    mut cancel: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), CaptureError> {
    let device = pcap::Capture::from_device(iface)
        .map_err(|source| CaptureError::Open {
            iface: iface.to_string(),
            source,
        })?
        .promisc(true)
        .snaplen(SNAPLEN)
        .immediate_mode(true);

    let mut capture = device.open().map_err(|source| CaptureError::Open {
        iface: iface.to_string(),
        source,
    })?;
    capture.filter(BPF_FILTER, true)?;
    let mut capture = capture.setnonblock()?;

    let mut table = BindingTable::new();

    loop {
        if cancel.try_recv().is_ok() {
            return Ok(());
        }

        match capture.next_packet() {
            Ok(packet) => {
                let now = SystemTime::now();
                match process_frame(&mut table, packet.data, now) {
                    Ok(results) => {
                        for result in results {
                            if result_sink.send(result).await.is_err() {
                                return Err(CaptureError::ChannelClosed);
                            }
                        }
                    }
                    Err(err) => {
                        log::warn!("dropping malformed ARP frame on {iface}: {err}");
                    }
                }
            }
            Err(pcap::Error::TimeoutExpired) => {
                tokio::task::yield_now().await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request_frame(vlan: Option<u16>) -> Vec<u8> {
        let mut raw = vec![0xff; 6];
        raw.extend_from_slice(&[0x84, 0x39, 0xc0, 0x0b, 0x22, 0x25]);

        let arp_bytes: Vec<u8> = {
            let mut b = vec![];
            b.extend_from_slice(&arp::HTYPE_ETHERNET.to_be_bytes());
            b.extend_from_slice(&arp::PTYPE_IPV4.to_be_bytes());
            b.push(6);
            b.push(4);
            b.extend_from_slice(&1u16.to_be_bytes());
            b.extend_from_slice(&[0x84, 0x39, 0xc0, 0x0b, 0x22, 0x25]);
            b.extend_from_slice(&[192, 168, 10, 26]);
            b.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
            b.extend_from_slice(&[192, 168, 10, 25]);
            b
        };

        match vlan {
            None => {
                raw.extend_from_slice(&0x0806u16.to_be_bytes());
                raw.extend_from_slice(&arp_bytes);
            }
            Some(vid) => {
                raw.extend_from_slice(&ethernet::ETHERTYPE_VLAN.to_be_bytes());
                let tci = vid & 0x0fff;
                raw.extend_from_slice(&tci.to_be_bytes());
                raw.extend_from_slice(&0x0806u16.to_be_bytes());
                raw.extend_from_slice(&arp_bytes);
            }
        }
        raw
    }

    #[test]
    fn scenario_1_arp_request_no_vlan() {
        let mut table = BindingTable::new();
        let raw = valid_request_frame(None);
        let results = process_frame(&mut table, &raw, SystemTime::now()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ip, Ipv4Addr::new(192, 168, 10, 26));
        assert_eq!(results[0].vid, None);
        assert_eq!(results[0].event, Event::New);
    }

    #[test]
    fn scenario_2_arp_request_vlan_2() {
        let mut table = BindingTable::new();
        let raw = valid_request_frame(Some(2));
        let results = process_frame(&mut table, &raw, SystemTime::now()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].vid, Some(2));
    }

    #[test]
    fn non_arp_vlan_payload_is_dropped_not_errored() {
        let mut table = BindingTable::new();
        let mut raw = vec![0xff; 6];
        raw.extend_from_slice(&[0x84, 0x39, 0xc0, 0x0b, 0x22, 0x25]);
        raw.extend_from_slice(&ethernet::ETHERTYPE_VLAN.to_be_bytes());
        raw.extend_from_slice(&[0x00, 0x02]);
        raw.extend_from_slice(&0x0800u16.to_be_bytes()); // IPv4, not ARP
        raw.extend_from_slice(&[1, 2, 3, 4]);
        let results = process_frame(&mut table, &raw, SystemTime::now()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn reply_updates_both_sender_and_target() {
        let mut table = BindingTable::new();
        let mut raw = valid_request_frame(None);
        // Flip opcode field (at fixed offset within the ARP payload) to Reply.
        let opcode_offset = raw.len() - (8 + 2 * 6 + 2 * 4) + 6;
        raw[opcode_offset] = 0;
        raw[opcode_offset + 1] = 2;
        let results = process_frame(&mut table, &raw, SystemTime::now()).unwrap();
        assert_eq!(results.len(), 2);
    }
}
