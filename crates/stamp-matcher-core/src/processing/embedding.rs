//! Optional learned-embedding backend.
//!
//! The model itself lives outside this crate. A host installs one process-wide
//! handle at startup and removes it at shutdown; between those points the
//! handle is shared read-only.

use std::sync::{Arc, RwLock};

use image::DynamicImage;
use log::info;
use once_cell::sync::Lazy;

use crate::error::{Error, Result};

/// An image embedding model, e.g. a CLIP image tower
pub trait EmbeddingModel: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Embed a decoded image into a fixed-length vector
    fn embed(&self, image: &DynamicImage) -> core::result::Result<Vec<f32>, String>;
}

static MODEL: Lazy<RwLock<Option<Arc<dyn EmbeddingModel>>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide model. Fails if one is already installed.
pub fn install_model(model: Arc<dyn EmbeddingModel>) -> Result<()> {
    let mut slot = MODEL
        .write()
        .map_err(|_| Error::Unknown("embedding model lock poisoned".to_string()))?;

    if let Some(existing) = slot.as_ref() {
        return Err(Error::Configuration(format!(
            "Embedding model '{}' is already installed",
            existing.name()
        )));
    }

    info!("Installed embedding model '{}'", model.name());
    *slot = Some(model);
    Ok(())
}

/// The installed model, if any
pub fn installed_model() -> Option<Arc<dyn EmbeddingModel>> {
    MODEL.read().ok().and_then(|slot| slot.clone())
}

/// Remove the process-wide model, returning it
pub fn uninstall_model() -> Option<Arc<dyn EmbeddingModel>> {
    let removed = MODEL.write().ok().and_then(|mut slot| slot.take());
    if let Some(model) = &removed {
        info!("Uninstalled embedding model '{}'", model.name());
    }
    removed
}

/// Cosine similarity clamped to [0, 1]; non-finite input scores 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !cosine.is_finite() {
        return 0.0;
    }
    cosine.clamp(0.0, 1.0)
}
