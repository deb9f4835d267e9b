// Core modules
pub mod classify;
pub mod decode;
pub mod embedding;
pub mod fingerprint;
pub mod similarity;
pub mod timeout_utils;

// Reexport core functionality
pub use classify::classify;
pub use decode::{decode, Decoder, NormalizedRaster};
pub use embedding::{install_model, installed_model, uninstall_model, EmbeddingModel};
pub use fingerprint::{content_hash, fingerprint, perceptual_hash, Fingerprint, Fingerprinter};
pub use similarity::{hamming_distance, is_comparable, scaled_similarity, similarity};
pub use timeout_utils::execute_with_timeout;
