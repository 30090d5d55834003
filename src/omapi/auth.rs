//! The single OMAPI authenticator implementation (Design Note 2): HMAC-MD5
//! signing over the key material decoded once at construction.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use md5::Md5;

use super::message::Message;
use super::OmapiError;

type HmacMd5 = Hmac<Md5>;

pub struct Authenticator {
    pub name: String,
    key: Vec<u8>,
}

impl Authenticator {
    pub const ALGORITHM: &'static str = "hmac-md5.SIG-ALG.REG.INT.";
    /// HMAC-MD5 digest length; the real `signature_len` every placeholder
    /// must carry before signing, since that field is inside the signed
    /// region (§4.C).
    pub const SIGNATURE_LEN: usize = 16;

    pub fn new(name: impl Into<String>, base64_key: &str) -> Result<Self, OmapiError> {
        let key = BASE64
            .decode(base64_key)
            .map_err(|_| OmapiError::InvalidKey)?;
        Ok(Self {
            name: name.into(),
            key,
        })
    }

    pub fn sign(&self, message: &Message) -> Result<Vec<u8>, OmapiError> {
        let mut mac = HmacMd5::new_from_slice(&self.key).map_err(|_| OmapiError::InvalidKey)?;
        mac.update(&message.signable_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Recomputes the signature over `message` and compares it
    /// constant-time against the signature the message already carries.
    pub fn verify(&self, message: &Message) -> Result<(), OmapiError> {
        let mut mac = HmacMd5::new_from_slice(&self.key).map_err(|_| OmapiError::InvalidKey)?;
        mac.update(&message.signable_bytes());
        mac.verify_slice(&message.signature)
            .map_err(|_| OmapiError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omapi::message::Opcode;
    use crate::omapi::wire::FieldMap;

    fn key() -> Authenticator {
        Authenticator::new("omapi_key", "c2VjcmV0LWtleS1tYXRlcmlhbA==").unwrap()
    }

    fn unsigned() -> Message {
        let mut msg = FieldMap::new();
        msg.insert("type".to_string(), b"host".to_vec());
        Message {
            auth_id: 1,
            op: Opcode::Open,
            handle: 0,
            tid: 5,
            rid: 0,
            msg,
            obj: FieldMap::new(),
            signature: vec![0; Authenticator::SIGNATURE_LEN],
        }
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let authenticator = key();
        let mut message = unsigned();
        message.signature = authenticator.sign(&message).unwrap();
        assert!(authenticator.verify(&message).is_ok());
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let authenticator = key();
        let mut message = unsigned();
        message.signature = authenticator.sign(&message).unwrap();
        message.signature[0] ^= 0xff;
        assert!(authenticator.verify(&message).is_err());
    }

    #[test]
    fn invalid_base64_key_is_rejected() {
        assert!(Authenticator::new("omapi_key", "not base64!!").is_err());
    }
}
