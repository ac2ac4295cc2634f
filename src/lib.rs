#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod image;
pub mod ocr;
pub mod report;
pub mod scanner;
pub mod types;

// Detection stages — public for tools and tests, considered internals.
pub mod bounds;
pub mod color;
pub mod header;
pub mod lines;
pub mod mapper;
pub mod mask;
pub mod regions;
pub mod symbols;
pub mod text;

// --- High-level re-exports -------------------------------------------------

// Main entry points: scanner + results.
pub use crate::scanner::{BoardScanner, ScanParams};
pub use crate::types::{Cell, ColorCategory, Grid, GridShape, HeaderInfo};

// High-level report returned by the scanner.
pub use crate::diagnostics::{PipelineTrace, ScanReport};
pub use crate::report::ScanOutput;

// Recognizer seam.
pub use crate::ocr::{NullRecognizer, TextDetection, TextRecognizer};

/// Small prelude for quick experiments.
///
/// ```no_run
/// use board_scanner::prelude::*;
///
/// # fn main() -> Result<(), String> {
/// let image = load_rgb_image(std::path::Path::new("board.png"))?;
/// let scanner = BoardScanner::new(ScanParams::default());
/// let report = scanner.process(&image);
/// println!("{} floor rows", report.output.data.len());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::io::load_rgb_image;
    pub use crate::image::RgbImage;
    pub use crate::{BoardScanner, ScanParams, ScanReport};
}
