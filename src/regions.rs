//! Colored-region detection.
//!
//! For each chromatic category the image is thresholded in HSV space with a
//! union of tuned sub-ranges (several ranges per category compensate for
//! antialiasing and varying pastel intensity), cleaned up with a
//! morphological open/close, and the surviving external contours become
//! [`ColorBlob`]s. White is never detected — it is the absence of color.
//!
//! The blobs are the ground truth for "where a painted cell actually is"
//! and calibrate both grid-line interpolation and table-bounds selection.
use crate::image::RgbImage;
use crate::mask::{find_contours, Mask};
use crate::types::{ColorBlob, ColorCategory};
use log::debug;
use serde::Deserialize;

/// Inclusive HSV range in OpenCV scale: H in [0, 180], S and V in [0, 255].
#[derive(Clone, Copy, Debug)]
pub struct HsvRange {
    pub lo: (u8, u8, u8),
    pub hi: (u8, u8, u8),
}

impl HsvRange {
    #[inline]
    fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        h >= self.lo.0
            && h <= self.hi.0
            && s >= self.lo.1
            && s <= self.hi.1
            && v >= self.lo.2
            && v <= self.hi.2
    }
}

const GREEN_RANGES: &[HsvRange] = &[
    HsvRange { lo: (35, 30, 150), hi: (85, 255, 255) },
    HsvRange { lo: (35, 50, 100), hi: (85, 255, 255) },
    HsvRange { lo: (40, 20, 180), hi: (80, 150, 255) },
];

const YELLOW_RANGES: &[HsvRange] = &[
    HsvRange { lo: (15, 30, 200), hi: (35, 255, 255) },
    HsvRange { lo: (20, 50, 180), hi: (35, 200, 255) },
    HsvRange { lo: (18, 20, 220), hi: (32, 120, 255) },
];

const PINK_RANGES: &[HsvRange] = &[
    HsvRange { lo: (140, 20, 180), hi: (180, 150, 255) },
    HsvRange { lo: (150, 30, 200), hi: (170, 120, 255) },
    HsvRange { lo: (0, 20, 200), hi: (15, 100, 255) },
    HsvRange { lo: (160, 15, 200), hi: (180, 80, 255) },
];

fn ranges_for(category: ColorCategory) -> &'static [HsvRange] {
    match category {
        ColorCategory::Green => GREEN_RANGES,
        ColorCategory::Yellow => YELLOW_RANGES,
        ColorCategory::Pink => PINK_RANGES,
        ColorCategory::White => &[],
    }
}

/// Detection knobs, tuned for screenshots of pastel status boards.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RegionParams {
    /// Contours below this enclosed area (px²) are antialiasing artifacts.
    pub min_area: f32,
    /// Side of the square kernel for the open/close cleanup.
    pub morph_kernel: usize,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            min_area: 500.0,
            morph_kernel: 5,
        }
    }
}

/// RGB to HSV in OpenCV scale: H in [0, 180], S and V in [0, 255].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let rf = r as f32;
    let gf = g as f32;
    let bf = b as f32;
    let max_c = rf.max(gf).max(bf);
    let min_c = rf.min(gf).min(bf);
    let diff = max_c - min_c;
    let v = max_c;
    let s = if max_c == 0.0 { 0.0 } else { diff / max_c * 255.0 };
    let h_deg = if diff == 0.0 {
        0.0
    } else if max_c == rf {
        60.0 * (((gf - bf) / diff).rem_euclid(6.0))
    } else if max_c == gf {
        60.0 * ((bf - rf) / diff + 2.0)
    } else {
        60.0 * ((rf - gf) / diff + 4.0)
    };
    (
        (h_deg / 2.0).round().clamp(0.0, 180.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    )
}

fn category_mask(image: &RgbImage, category: ColorCategory) -> Mask {
    let ranges = ranges_for(category);
    let mut mask = Mask::new(image.width(), image.height());
    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b] = image.get(x, y);
            let (h, s, v) = rgb_to_hsv(r, g, b);
            if ranges.iter().any(|range| range.contains(h, s, v)) {
                mask.set(x, y, true);
            }
        }
    }
    mask
}

/// Detect all colored regions of the image as blobs.
pub fn detect_colored_regions(image: &RgbImage, params: &RegionParams) -> Vec<ColorBlob> {
    let mut blobs = Vec::new();
    for category in ColorCategory::CHROMATIC {
        let raw = category_mask(image, category);
        let cleaned = raw
            .open_rect(params.morph_kernel, params.morph_kernel)
            .close_rect(params.morph_kernel, params.morph_kernel);
        let mut kept = 0usize;
        for contour in find_contours(&cleaned) {
            if contour.area < params.min_area {
                continue;
            }
            kept += 1;
            blobs.push(ColorBlob {
                color: category,
                center: (
                    contour.centroid.0.round() as u32,
                    contour.centroid.1.round() as u32,
                ),
                bbox: contour.bbox,
                area: contour.area,
            });
        }
        debug!(
            "region detection: {} -> {} blob(s) after area filter",
            category.as_str(),
            kept
        );
    }
    blobs
}
