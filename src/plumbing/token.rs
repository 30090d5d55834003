//! Bootstrap token codec: `base64(JSON {secret, fingerprint, url})`.
//!
//! Each failure mode named in §6 (bad base64, bad JSON, an unparseable URL)
//! is surfaced as a distinct error variant so a caller can tell a corrupted
//! token from a token that simply names an invalid controller.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapToken {
    pub secret: String,
    pub fingerprint: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid url {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

pub fn encode(token: &BootstrapToken) -> String {
    let json = serde_json::to_vec(token).expect("BootstrapToken always serializes");
    STANDARD.encode(json)
}

pub fn decode(encoded: &str) -> Result<BootstrapToken, TokenError> {
    let raw = STANDARD.decode(encoded)?;
    let token: BootstrapToken = serde_json::from_slice(&raw)?;
    Url::parse(&token.url).map_err(|source| TokenError::Url {
        url: token.url.clone(),
        source,
    })?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_identity() {
        let token = BootstrapToken {
            secret: "s3cr3t".to_string(),
            fingerprint: "fp".to_string(),
            url: "https://maas.internal".to_string(),
        };
        let encoded = encode(&token);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(token, decoded);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(decode("not base64!!"), Err(TokenError::Base64(_))));
    }

    #[test]
    fn rejects_invalid_json() {
        let encoded = STANDARD.encode(b"not json");
        assert!(matches!(decode(&encoded), Err(TokenError::Json(_))));
    }

    #[test]
    fn rejects_unparseable_url() {
        let token = BootstrapToken {
            secret: "s".to_string(),
            fingerprint: "f".to_string(),
            url: "not a url".to_string(),
        };
        let encoded = encode(&token);
        assert!(matches!(decode(&encoded), Err(TokenError::Url { .. })));
    }
}
