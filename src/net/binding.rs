//! Binding table keyed by `(VLAN, IP)`: at most one binding per key,
//! mutated only through `NEW`/`REFRESHED`/`MOVED` events (§3, §4.A).

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

use mac_address::MacAddress;

/// Threshold above which re-observing the same `(vid, ip, mac)` emits a
/// `REFRESHED` event rather than being silently ignored.
pub const SEEN_AGAIN: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub vid: Option<u16>,
    pub ip: Ipv4Addr,
}

#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub mac: MacAddress,
    pub first_seen_at: SystemTime,
    pub last_seen_at: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    New,
    Refreshed,
    Moved { previous_mac: MacAddress },
}

impl Event {
    pub fn as_str(self) -> &'static str {
        match self {
            Event::New => "NEW",
            Event::Refreshed => "REFRESHED",
            Event::Moved { .. } => "MOVED",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized event string {0:?}")]
pub struct UnknownEvent(String);

impl std::str::FromStr for Event {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Event::New),
            "REFRESHED" => Ok(Event::Refreshed),
            // MOVED is only ever produced with a `previous_mac`; decoding
            // the bare string alone can't reconstruct it, so it's rejected
            // as an unknown event rather than silently dropping data.
            _ => Err(UnknownEvent(s.to_string())),
        }
    }
}

#[derive(Default)]
pub struct BindingTable {
    bindings: HashMap<BindingKey, Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the observation policy from §4.A and returns the resulting
    /// event, or `None` if nothing changed (same MAC seen within
    /// [`SEEN_AGAIN`]).
    pub fn observe(
        &mut self,
        key: BindingKey,
        mac: MacAddress,
        now: SystemTime,
    ) -> Option<Event> {
        match self.bindings.get_mut(&key) {
            None => {
                self.bindings.insert(
                    key,
                    Binding {
                        mac,
                        first_seen_at: now,
                        last_seen_at: now,
                    },
                );
                Some(Event::New)
            }
            Some(binding) if binding.mac == mac => {
                let elapsed = now
                    .duration_since(binding.last_seen_at)
                    .unwrap_or(Duration::ZERO);
                if elapsed >= SEEN_AGAIN {
                    binding.last_seen_at = now;
                    Some(Event::Refreshed)
                } else {
                    None
                }
            }
            Some(binding) => {
                let previous_mac = binding.mac;
                binding.mac = mac;
                binding.first_seen_at = now;
                binding.last_seen_at = now;
                Some(Event::Moved { previous_mac })
            }
        }
    }

    pub fn get(&self, key: &BindingKey) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(n: u8) -> MacAddress {
        MacAddress::new([0, 0, 0, 0, 0, n])
    }

    #[test]
    fn first_observation_is_new() {
        let mut table = BindingTable::new();
        let key = BindingKey {
            vid: None,
            ip: Ipv4Addr::new(10, 0, 0, 1),
        };
        let event = table.observe(key, mac(1), SystemTime::now());
        assert_eq!(event, Some(Event::New));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn same_mac_within_seen_again_is_silent() {
        let mut table = BindingTable::new();
        let key = BindingKey {
            vid: None,
            ip: Ipv4Addr::new(10, 0, 0, 1),
        };
        let t0 = SystemTime::now();
        table.observe(key, mac(1), t0);
        let event = table.observe(key, mac(1), t0 + Duration::from_secs(1));
        assert_eq!(event, None);
    }

    #[test]
    fn same_mac_after_seen_again_is_refreshed() {
        let mut table = BindingTable::new();
        let key = BindingKey {
            vid: None,
            ip: Ipv4Addr::new(10, 0, 0, 1),
        };
        let t0 = SystemTime::now();
        table.observe(key, mac(1), t0);
        let event = table.observe(key, mac(1), t0 + SEEN_AGAIN);
        assert_eq!(event, Some(Event::Refreshed));
    }

    #[test]
    fn different_mac_is_moved_with_previous() {
        let mut table = BindingTable::new();
        let key = BindingKey {
            vid: Some(2),
            ip: Ipv4Addr::new(10, 0, 0, 1),
        };
        let t0 = SystemTime::now();
        table.observe(key, mac(1), t0);
        let event = table.observe(key, mac(2), t0 + Duration::from_secs(1));
        assert_eq!(
            event,
            Some(Event::Moved {
                previous_mac: mac(1)
            })
        );
        assert_eq!(table.get(&key).unwrap().mac, mac(2));
    }

    #[test]
    fn event_string_round_trip() {
        assert_eq!(Event::New.as_str(), "NEW");
        assert_eq!("NEW".parse::<Event>().unwrap(), Event::New);
        assert!("GARBAGE".parse::<Event>().is_err());
    }
}
