//! Cell glyph detection.
//!
//! Status boards mark cells with small printed glyphs: filled circle
//! (contracted), open circle (available), double circle (company-held) and
//! square (special). A cell sub-image is binarized with a tight adaptive
//! threshold, its external contours are classified by circularity and local
//! brightness, and the surviving glyphs come out left-to-right with
//! duplicate categories collapsed.
//!
//! Brightness is read from the grayscale plane rather than the binary mask:
//! a large filled glyph binarizes to an annulus (its deep interior matches
//! the local mean), but stays uniformly dark in gray.
use crate::image::GrayImage;
use crate::mask::{adaptive_threshold_inv, approx_poly, find_contours, Contour};
use log::trace;

/// One detected glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    FilledCircle,
    OpenCircle,
    DoubleCircle,
    Square,
}

impl Symbol {
    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::FilledCircle => "●",
            Symbol::OpenCircle => "○",
            Symbol::DoubleCircle => "◎",
            Symbol::Square => "□",
        }
    }
}

const THRESHOLD_BLOCK: usize = 11;
const THRESHOLD_C: f32 = 2.0;
/// Contours below this enclosed area are noise specks.
const MIN_CONTOUR_AREA: f32 = 20.0;
/// Circle-candidate gates.
const MIN_CIRCLE_AREA: f32 = 30.0;
const MIN_CIRCULARITY: f32 = 0.7;
/// Only large circles qualify as double-circle candidates.
const MIN_DOUBLE_AREA: f32 = 100.0;
/// A center probe darker than this (and markedly darker than the whole
/// ROI) marks the concentric inner dot.
const CENTER_DARK_LEVEL: f32 = 120.0;
/// Bounding-box brightness bands: below is a filled circle, above an open
/// one; in between the glyph size and level decide.
const FILLED_LEVEL: f32 = 80.0;
const OPEN_LEVEL: f32 = 150.0;
const MID_SPLIT_LEVEL: f32 = 130.0;
/// Square-candidate gates.
const MIN_SQUARE_AREA: f32 = 50.0;
const SQUARE_ASPECT: (f32, f32) = (0.6, 1.4);
/// Candidates closer than this horizontally are one physical glyph.
const MERGE_X_GAP: f32 = 5.0;

struct Candidate {
    center_x: f32,
    area: f32,
    symbol: Symbol,
}

/// Detect the glyphs of one grayscale cell image, left-to-right, one entry
/// per category.
pub fn detect_symbols(cell: &GrayImage) -> Vec<Symbol> {
    let binary = adaptive_threshold_inv(cell, THRESHOLD_BLOCK, THRESHOLD_C);
    let mut candidates: Vec<Candidate> = Vec::new();
    for contour in find_contours(&binary) {
        if contour.area < MIN_CONTOUR_AREA {
            continue;
        }
        let Some(symbol) = classify_contour(cell, &contour) else {
            continue;
        };
        trace!(
            "symbol candidate {:?} at x={:.1} area={:.0}",
            symbol,
            contour.centroid.0,
            contour.area
        );
        candidates.push(Candidate {
            center_x: contour.centroid.0,
            area: contour.area,
            symbol,
        });
    }

    candidates.sort_by(|a, b| {
        a.center_x
            .partial_cmp(&b.center_x)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // A double circle's inner dot arrives as its own contour at the same x;
    // keep the larger of any horizontally overlapping pair.
    let mut merged: Vec<Candidate> = Vec::new();
    for cand in candidates {
        match merged.last_mut() {
            Some(last) if (cand.center_x - last.center_x).abs() <= MERGE_X_GAP => {
                if cand.area > last.area {
                    *last = cand;
                }
            }
            _ => merged.push(cand),
        }
    }

    let mut out = Vec::new();
    for cand in merged {
        if !out.contains(&cand.symbol) {
            out.push(cand.symbol);
        }
    }
    out
}

/// Shape classification of one external contour. Circularity separates
/// round glyphs from quads. Round glyphs are resolved in order: the
/// concentric double-circle check first (a large contour whose centroid
/// neighborhood is markedly darker than its bounding box), then the
/// brightness bands.
fn classify_contour(gray: &GrayImage, contour: &Contour) -> Option<Symbol> {
    let circularity = if contour.perimeter > 0.0 {
        4.0 * std::f32::consts::PI * contour.area / (contour.perimeter * contour.perimeter)
    } else {
        0.0
    };
    let bb = contour.bbox;

    if circularity > MIN_CIRCULARITY && contour.area > MIN_CIRCLE_AREA {
        let roi_mean = gray.region_mean(bb.x as i64, bb.y as i64, bb.w as i64, bb.h as i64)?;
        if contour.area > MIN_DOUBLE_AREA {
            // Probe a window of 40% of the glyph diameter around the centroid.
            let center_r = (bb.w.min(bb.h) as f32 * 0.2) as i64;
            let cx = contour.centroid.0.round() as i64;
            let cy = contour.centroid.1.round() as i64;
            if center_r > 2 {
                if let Some(center_mean) =
                    gray.region_mean(cx - center_r, cy - center_r, 2 * center_r, 2 * center_r)
                {
                    if center_mean < CENTER_DARK_LEVEL && center_mean < 0.6 * roi_mean {
                        return Some(Symbol::DoubleCircle);
                    }
                }
            }
        }
        if roi_mean < FILLED_LEVEL {
            return Some(Symbol::FilledCircle);
        }
        if roi_mean > OPEN_LEVEL {
            return Some(Symbol::OpenCircle);
        }
        // Mid-brightness band: a large glyph here is a double circle whose
        // probe missed; small ones split on the level.
        return Some(if contour.area > MIN_DOUBLE_AREA {
            Symbol::DoubleCircle
        } else if roi_mean < MID_SPLIT_LEVEL {
            Symbol::FilledCircle
        } else {
            Symbol::OpenCircle
        });
    }

    let poly = approx_poly(&contour.boundary, 0.04 * contour.perimeter);
    if poly.len() == 4 && contour.area > MIN_SQUARE_AREA && bb.h > 0 {
        let aspect = bb.w as f32 / bb.h as f32;
        if aspect >= SQUARE_ASPECT.0 && aspect <= SQUARE_ASPECT.1 {
            return Some(Symbol::Square);
        }
    }
    None
}
