//! Cross-cutting leaves shared by every subsystem: byte-size parsing, the
//! bootstrap-token codec, atomic file writes, and identity/CSR generation.

pub mod atomic_file;
pub mod bytesize;
pub mod identity;
pub mod token;
