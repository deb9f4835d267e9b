//! # Fingerprint Engine
//!
//! Reduces an input asset to a fixed-length fingerprint.
//!
//! ## Perceptual hash
//!
//! The asset is classified, decoded and reduced to a `grid × grid` luminance
//! raster (8×8 by default). Bit *i* is set when sample *i* is brighter than
//! the raster mean, in row-major order, giving a 64-bit hash. Small
//! photometric or compression changes flip few bits, structurally different
//! images flip many.
//!
//! ## Content hash
//!
//! When an asset cannot be decoded, a 128-bit BLAKE3 digest of the raw bytes
//! stands in. It only ever agrees fully with a byte-identical asset, and it
//! carries its own method tag so it is never scored against a perceptual hash.
//!
//! ## Learned embedding
//!
//! With an [`EmbeddingModel`] installed, the decoded image is handed to the
//! model and the resulting vector is the fingerprint.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::config::{Config, FingerprintMethod};
use crate::error::FingerprintError;
use crate::logging::log_fallback;
use crate::processing::classify::classify;
use crate::processing::decode::{Decoder, NormalizedRaster};
use crate::processing::embedding::{installed_model, EmbeddingModel};
use crate::types::InputAsset;

/// Length of the content digest in bytes (128 bits)
pub const CONTENT_DIGEST_BYTES: usize = 16;

/// A fingerprint tagged with the method that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum Fingerprint {
    /// `len` bits packed little-endian into 64-bit words; unused high bits are zero
    Perceptual { bits: Vec<u64>, len: usize },

    /// Digest of the raw bytes
    Content([u8; CONTENT_DIGEST_BYTES]),

    /// Model output vector
    Embedding(Vec<f32>),
}

impl Fingerprint {
    /// Pack a row-major bit sequence
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut words = Vec::new();
        let mut len = 0;

        for (i, bit) in bits.into_iter().enumerate() {
            if i % 64 == 0 {
                words.push(0u64);
            }
            if bit {
                if let Some(word) = words.last_mut() {
                    *word |= 1u64 << (i % 64);
                }
            }
            len = i + 1;
        }

        Fingerprint::Perceptual { bits: words, len }
    }

    pub fn method(&self) -> FingerprintMethod {
        match self {
            Fingerprint::Perceptual { .. } => FingerprintMethod::PerceptualHash,
            Fingerprint::Content(_) => FingerprintMethod::ContentHash,
            Fingerprint::Embedding(_) => FingerprintMethod::LearnedEmbedding,
        }
    }

    /// Bit length, or vector dimension for embeddings
    pub fn len(&self) -> usize {
        match self {
            Fingerprint::Perceptual { len, .. } => *len,
            Fingerprint::Content(digest) => digest.len() * 8,
            Fingerprint::Embedding(vector) => vector.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bit `i` of a perceptual fingerprint
    pub fn bit(&self, i: usize) -> Option<bool> {
        match self {
            Fingerprint::Perceptual { bits, len } if i < *len => {
                bits.get(i / 64).map(|word| word & (1u64 << (i % 64)) != 0)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Perceptual { len, .. } => {
                for i in 0..*len {
                    let bit = self.bit(i).unwrap_or(false);
                    f.write_str(if bit { "1" } else { "0" })?;
                }
                Ok(())
            }
            Fingerprint::Content(digest) => {
                for byte in digest {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Fingerprint::Embedding(vector) => write!(f, "embedding[{}]", vector.len()),
        }
    }
}

/// Mean-threshold hash of a normalized raster.
///
/// Samples are compared as 8-bit gray levels against the integer sum, so a
/// flat raster sits exactly at its mean and hashes to all zeros.
pub fn perceptual_hash(raster: &NormalizedRaster) -> Fingerprint {
    let levels = raster.levels();
    let count = levels.len() as u64;
    let sum: u64 = levels.iter().map(|&level| level as u64).sum();

    Fingerprint::from_bits(levels.iter().map(|&level| level as u64 * count > sum))
}

/// 128-bit BLAKE3 digest of the raw bytes
pub fn content_hash(content: &[u8]) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content);

    let mut digest = [0u8; CONTENT_DIGEST_BYTES];
    hasher.finalize_xof().fill(&mut digest);
    Fingerprint::Content(digest)
}

/// Produces fingerprints with one fixed method and raster geometry
#[derive(Clone)]
pub struct Fingerprinter {
    decoder: Decoder,
    method: FingerprintMethod,
    model: Option<Arc<dyn EmbeddingModel>>,
}

impl fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("decoder", &self.decoder)
            .field("method", &self.method)
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .finish()
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(Decoder::default(), FingerprintMethod::PerceptualHash)
    }
}

impl Fingerprinter {
    /// Create a fingerprinter. `LearnedEmbedding` picks up the installed model.
    pub fn new(decoder: Decoder, method: FingerprintMethod) -> Self {
        let model = match method {
            FingerprintMethod::LearnedEmbedding => installed_model(),
            _ => None,
        };

        if method == FingerprintMethod::LearnedEmbedding && model.is_none() {
            warn!("No embedding model installed, falling back to perceptual hashing");
        }

        Self {
            decoder,
            method,
            model,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Decoder::from_config(config), config.method)
    }

    /// Use an explicit model instead of the process-wide one
    pub fn with_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// The method actually used, after accounting for a missing model
    pub fn effective_method(&self) -> FingerprintMethod {
        match (self.method, &self.model) {
            (FingerprintMethod::LearnedEmbedding, None) => FingerprintMethod::PerceptualHash,
            (method, _) => method,
        }
    }

    /// Fingerprint without fallback; decode failures are returned
    pub fn try_fingerprint(&self, asset: &InputAsset) -> Result<Fingerprint, FingerprintError> {
        let content = &asset.raw_bytes;

        let fingerprint = match (self.effective_method(), &self.model) {
            (FingerprintMethod::ContentHash, _) => content_hash(content),
            (FingerprintMethod::LearnedEmbedding, Some(model)) => {
                let kind = classify(&asset.name, content);
                let img = self.decoder.load_image(kind, content)?;
                let vector = model.embed(&img).map_err(FingerprintError::Embedding)?;
                if vector.is_empty() {
                    return Err(FingerprintError::Embedding(format!(
                        "model '{}' returned an empty vector",
                        model.name()
                    )));
                }
                Fingerprint::Embedding(vector)
            }
            _ => {
                let kind = classify(&asset.name, content);
                let raster = self.decoder.decode(kind, content)?;
                perceptual_hash(&raster)
            }
        };

        debug!(
            "Fingerprinted '{}' with {:?}: {}",
            asset.name,
            fingerprint.method(),
            fingerprint
        );
        Ok(fingerprint)
    }

    /// Fingerprint, substituting the content hash when decoding fails
    pub fn fingerprint(&self, asset: &InputAsset) -> Fingerprint {
        match self.try_fingerprint(asset) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                log_fallback(&asset.name, &e);
                content_hash(&asset.raw_bytes)
            }
        }
    }
}

/// Fingerprint with the default 256px canvas and 8×8 grid
pub fn fingerprint(asset: &InputAsset) -> Fingerprint {
    Fingerprinter::default().fingerprint(asset)
}
