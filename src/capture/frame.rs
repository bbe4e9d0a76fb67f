//! Frame and reference image types.

use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba};
use std::path::Path;

/// A captured (or loaded) RGBA pixel grid, row-major.
pub type Frame = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// A named template frame that captured frames are classified against.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub name: String,
    pub frame: Frame,
}

impl ReferenceImage {
    pub fn new(name: impl Into<String>, frame: Frame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }

    /// Decodes an image file into RGBA form.
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self> {
        let frame = image::open(path)
            .with_context(|| format!("Failed to load reference image {}", path.display()))?
            .to_rgba8();
        let reference = Self::new(name, frame);
        tracing::info!(
            "Loaded reference \"{}\" ({}x{}) from {}",
            reference.name,
            reference.frame.width(),
            reference.frame.height(),
            path.display()
        );
        Ok(reference)
    }
}

/// Returns true if the two frames have identical dimensions and pixels.
pub fn frames_identical(a: &Frame, b: &Frame) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}
