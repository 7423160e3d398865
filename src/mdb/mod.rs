//! Reader for the newer binary catalog dialect ("musicdb").
//!
//! Frames are little-endian throughout and the encryption boundary is
//! whatever the envelope declares.

pub mod boma;
pub mod frame;
mod loader;
pub mod object;

pub use loader::Loader;
