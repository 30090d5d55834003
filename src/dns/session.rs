//! A single remote peer's CNAME/DNAME resolution chain (§4.D), and the
//! loop check that runs against it on every query.

use std::time::{Duration, Instant};

use super::name::{encode_name, find_offset, pointer};
use super::DnsError;

pub const SESSION_TTL: Duration = Duration::from_secs(60);

pub struct Session {
    chain: Vec<u8>,
    last_seen: Instant,
}

impl Session {
    pub fn new() -> Self {
        Self {
            chain: Vec::new(),
            last_seen: Instant::now(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_seen) > SESSION_TTL
    }

    /// Clears the chain; called whenever the upstream response is not a
    /// CNAME/DNAME.
    pub fn reset(&mut self) {
        self.chain.clear();
    }

    /// Runs the loop check for `name` and, if it is not already queried,
    /// records it (compressed against the existing chain when possible).
    pub fn query(&mut self, name: &str, now: Instant) -> Result<(), DnsError> {
        self.last_seen = now;
        let uncompressed = encode_name(name)?;
        let compressed = find_offset(&self.chain, &uncompressed).map(pointer);

        if already_queried(&self.chain, &uncompressed, compressed.as_deref()) {
            return Err(DnsError::CnameLoop);
        }

        match compressed {
            Some(pointer_bytes) => self.chain.extend_from_slice(&pointer_bytes),
            None => self.chain.extend_from_slice(&uncompressed),
        }
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn already_queried(chain: &[u8], uncompressed: &[u8], compressed: Option<&[u8]>) -> bool {
    if chain.starts_with(uncompressed) {
        return true;
    }
    if let Some(compressed) = compressed {
        if chain.starts_with(compressed) {
            return true;
        }
    }

    for (offset, byte) in chain.iter().enumerate() {
        if *byte != 0 {
            continue;
        }
        let after = &chain[offset + 1..];
        if after.starts_with(uncompressed) {
            return true;
        }
        if let Some(compressed) = compressed {
            if after.starts_with(compressed) {
                return true;
            }
        }
    }
    false
}
