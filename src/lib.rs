//! Core networking and state-management subsystems for the MAAS rack agent:
//! an ARP/neighbor observer, a DHCP lease-notification pipeline, an OMAPI
//! client, a recursive-DNS session tracker, and an on-disk image cache.
//!
//! The CLI, YAML config loading/templating, TLS handshake plumbing, LXD
//! integration harnesses, service-supervisor shims and the controller RPC
//! transport live outside this crate; it exposes the plain interfaces
//! (`Config`, `UploadSink`, component constructors) that those collaborators
//! drive.

pub mod cache;
pub mod config;
pub mod dhcp;
pub mod dns;
pub mod logging;
pub mod net;
pub mod omapi;
pub mod plumbing;
