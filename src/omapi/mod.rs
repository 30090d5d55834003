//! OMAPI client (§4.C): wire codec, the single normalized message type,
//! HMAC-MD5 authentication, and the `AddHost`/`GetHost`/`DeleteHost`
//! operations against ISC DHCP's runtime configuration port.

pub mod auth;
pub mod client;
pub mod message;
pub mod wire;

pub use auth::Authenticator;
pub use client::{Host, OmapiClient};
pub use message::{Message, Opcode};

#[derive(Debug, thiserror::Error)]
pub enum OmapiError {
    #[error("connection preamble mismatch")]
    PreambleMismatch,
    #[error("truncated omapi message")]
    Truncated,
    #[error("unknown omapi opcode {0}")]
    UnknownOpcode(u32),
    #[error("unexpected opcode in response{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    WrongOpcode { message: Option<String> },
    #[error("server returned a zero handle")]
    ZeroHandle,
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("invalid authenticator key material")]
    InvalidKey,
    #[error("signature verification failed")]
    SignatureMismatch,
    #[error("server error{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    ServerError { message: Option<String> },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
