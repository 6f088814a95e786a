//! Utilities Module - boundary helpers
//!
//! - `bundle`: pack/unpack of opaque payloads exchanged with the host

pub mod bundle;

pub use bundle::{pack, unpack, unpack_bytes};
