//! Lease notification: the unit of work ingested from the companion DHCP
//! daemon and, eventually, flushed to the controller (§3 "Notification").

use std::net::IpAddr;

use mac_address::MacAddress;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Commit,
    Expiry,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpFamily {
    Ipv4,
    Ipv6,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub action: Action,
    pub ip_family: IpFamily,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(with = "mac_serde")]
    pub mac: MacAddress,
    pub ip: IpAddr,
    /// Unix seconds.
    pub timestamp: i64,
    pub lease_time: u32,
}

mod mac_serde {
    use mac_address::MacAddress;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(mac: &MacAddress, serializer: S) -> Result<S::Ok, S::Error> {
        mac.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<MacAddress, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationDecodeError {
    #[error("invalid notification json: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn decode_line(line: &str) -> Result<Notification, NotificationDecodeError> {
    Ok(serde_json::from_str(line)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_commit_notification() {
        let line = r#"{"action":"commit","ip_family":"ipv4","hostname":"host1","mac":"84:39:c0:0b:22:25","ip":"10.0.0.1","timestamp":20,"lease_time":3600}"#;
        let notification = decode_line(line).unwrap();
        assert_eq!(notification.action, Action::Commit);
        assert_eq!(notification.timestamp, 20);
        assert_eq!(notification.hostname.as_deref(), Some("host1"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(decode_line("not json").is_err());
    }

    #[test]
    fn hostname_is_optional() {
        let line = r#"{"action":"expiry","ip_family":"ipv4","mac":"00:00:00:00:00:01","ip":"10.0.0.2","timestamp":1,"lease_time":0}"#;
        let notification = decode_line(line).unwrap();
        assert_eq!(notification.hostname, None);
    }
}
