//! Hamming similarity between fingerprints.
//!
//! Agreement is the fraction of equal bit positions. Identical fingerprints
//! score 1.0, inverted ones 0.0, and unrelated images cluster around 0.5, so
//! useful thresholds sit above 0.5.

use crate::config::ScoreScaling;
use crate::processing::embedding::cosine_similarity;
use crate::processing::fingerprint::Fingerprint;

/// True if both fingerprints came from the same method and have equal length
pub fn is_comparable(a: &Fingerprint, b: &Fingerprint) -> bool {
    a.method() == b.method() && a.len() == b.len()
}

/// Count of differing bits, `None` for incomparable or non-bit fingerprints
pub fn hamming_distance(a: &Fingerprint, b: &Fingerprint) -> Option<u32> {
    match (a, b) {
        (
            Fingerprint::Perceptual { bits: x, len: lx },
            Fingerprint::Perceptual { bits: y, len: ly },
        ) if lx == ly => Some(x.iter().zip(y).map(|(p, q)| (p ^ q).count_ones()).sum()),
        (Fingerprint::Content(x), Fingerprint::Content(y)) => {
            Some(x.iter().zip(y).map(|(p, q)| (p ^ q).count_ones()).sum())
        }
        _ => None,
    }
}

/// Similarity in [0, 1]; exactly 0.0 when the fingerprints are not comparable.
///
/// `similarity(f, f)` is 1.0 for every fingerprint the engine produces. The
/// exceptions are hand-built values: an empty fingerprint scores 0.0 against
/// itself, as does an embedding holding a non-finite component.
pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    if !is_comparable(a, b) || a.is_empty() {
        return 0.0;
    }

    match (a, b) {
        (Fingerprint::Embedding(x), Fingerprint::Embedding(y)) => cosine_similarity(x, y),
        _ => match hamming_distance(a, b) {
            Some(distance) => {
                let len = a.len() as f64;
                (len - distance as f64) / len
            }
            None => 0.0,
        },
    }
}

/// Similarity after score scaling; incomparable pairs stay at 0.0
pub fn scaled_similarity(a: &Fingerprint, b: &Fingerprint, scaling: &ScoreScaling) -> f64 {
    if !is_comparable(a, b) || a.is_empty() {
        return 0.0;
    }
    scaling.apply(similarity(a, b))
}
