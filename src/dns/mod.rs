//! Recursive DNS session tracker (§4.D): detects CNAME/DNAME recursion
//! loops by recording every queried name per remote peer. Operates on
//! already-parsed requests; it does not itself terminate a DNS listener.

pub mod name;
pub mod session;
pub mod sessions;

pub use session::Session;
pub use sessions::Sessions;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DnsError {
    #[error("label exceeds 63 bytes")]
    LabelTooLong,
    #[error("cname/dname resolution loop detected")]
    CnameLoop,
}
