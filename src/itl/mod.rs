//! Reader for the older binary catalog dialect ("itl").
//!
//! Frames default to big-endian with the byte order inferred from the
//! signature, and the encryption boundary depends on the envelope's
//! format version.

pub mod data;
pub mod frame;
mod loader;
pub mod object;

pub use loader::Loader;
