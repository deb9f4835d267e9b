//! Core functionality for matching photographs against reference artwork.
//!
//! This library provides the components of a small perceptual matcher:
//! - Input classification (vector markup, raster image, unknown)
//! - Decoding and rasterization to a normalized luminance grid
//! - Fingerprinting with a perceptual hash and a content-hash fallback
//! - Hamming similarity scoring and threshold/ranking of matches
//!
//! Everything is request-scoped: fingerprints are recomputed for each call
//! and nothing is shared between calls except configuration.

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{DecodeError, Error, FingerprintError, Result};
pub use matching::{match_all, FingerprintedAsset, Matcher};
pub use processing::{classify, decode, fingerprint, similarity, Fingerprint, Fingerprinter};
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod discovery;
pub mod logging;
pub mod matching;
pub mod processing;
pub mod types;
