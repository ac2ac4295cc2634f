//! Text-recognizer seam.
//!
//! Optical recognition is an external capability: the pipeline only relies
//! on "give me the texts visible in this region, with confidences". Keeping
//! it behind a trait lets tests substitute a stub and lets deployments plug
//! in whichever engine they run.
use crate::image::RgbImage;
use crate::types::Rect;

/// One recognized fragment within the queried region.
#[derive(Clone, Debug, PartialEq)]
pub struct TextDetection {
    pub text: String,
    /// Recognizer confidence in [0, 1].
    pub confidence: f32,
    /// Bounding box in the coordinates of the queried region.
    pub bbox: Rect,
}

/// Black-box text recognition over a small image region.
///
/// `Send + Sync` so the per-cell fan-out can share one instance.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, region: &RgbImage) -> Result<Vec<TextDetection>, String>;
}

/// Recognizer that sees nothing. Used in tests and when no engine is wired
/// up; the pipeline then degrades to symbol detection only.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecognizer;

impl TextRecognizer for NullRecognizer {
    fn recognize(&self, _region: &RgbImage) -> Result<Vec<TextDetection>, String> {
        Ok(Vec::new())
    }
}
