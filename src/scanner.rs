//! Scanner pipeline driving the board extraction end-to-end.
//!
//! [`BoardScanner`] exposes a simple API: feed an RGB image and get the
//! structured `{header, data}` output with a detailed trace. Internally it
//! coordinates colored-region detection, grid-line detection, canonical
//! window selection, blob-to-cell mapping and the parallel per-cell
//! color/text pass.
//!
//! Typical usage:
//! ```no_run
//! use board_scanner::scanner::{BoardScanner, ScanParams};
//! use board_scanner::image::RgbImage;
//!
//! # fn example(image: RgbImage) {
//! let scanner = BoardScanner::new(ScanParams::default());
//! let report = scanner.process(&image);
//! println!("{} floor rows", report.output.data.len());
//! # }
//! ```
use crate::bounds::{select_table_bounds, TableBounds};
use crate::color::classify_rgb;
use crate::diagnostics::{
    BoundsStage, CellPassStage, FallbackStage, HeaderStage, InputDescriptor, LineStage,
    MappingStage, PipelineTrace, RegionStage, ScanReport, TimingBreakdown,
};
use crate::header::extract_header;
use crate::image::{luma_of, RgbImage};
use crate::lines::{detect_grid_lines, LineParams};
use crate::mapper::map_blobs_to_grid;
use crate::ocr::{NullRecognizer, TextRecognizer};
use crate::regions::{detect_colored_regions, RegionParams};
use crate::report::ScanOutput;
use crate::text::extract_cell_text;
use crate::types::{ColorBlob, ColorCategory, Grid, GridShape};
use log::{debug, warn};
use rayon::prelude::*;
use serde::Deserialize;
use std::time::Instant;

/// Tuning knobs of one scan.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    pub shape: GridShape,
    pub regions: RegionParams,
    pub lines: LineParams,
    /// Pixels shaved off each cell edge before color sampling, keeping grid
    /// lines out of the average.
    pub sample_margin: i64,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            shape: GridShape::default(),
            regions: RegionParams::default(),
            lines: LineParams::default(),
            sample_margin: 3,
        }
    }
}

// Assumed table region when line evidence is insufficient, as fractions of
// the image dimensions.
const FALLBACK_TOP: f32 = 0.15;
const FALLBACK_BOTTOM: f32 = 0.05;
const FALLBACK_LEFT: f32 = 0.08;
const FALLBACK_RIGHT: f32 = 0.02;

/// Intermediate detections of one run, kept for the debug overlay.
pub struct ScanArtifacts {
    pub blobs: Vec<ColorBlob>,
    pub bounds: TableBounds,
    pub fallback: bool,
}

/// Board scanner orchestrating region detection, grid-line detection,
/// canonical window selection and the per-cell pass.
pub struct BoardScanner {
    params: ScanParams,
    recognizer: Box<dyn TextRecognizer>,
}

impl BoardScanner {
    /// Scanner without a text engine: cell text degrades to glyph detection.
    pub fn new(params: ScanParams) -> Self {
        Self::with_recognizer(params, Box::new(NullRecognizer))
    }

    pub fn with_recognizer(params: ScanParams, recognizer: Box<dyn TextRecognizer>) -> Self {
        Self { params, recognizer }
    }

    /// Run the full pipeline on one image.
    pub fn process(&self, image: &RgbImage) -> ScanReport {
        self.process_with_artifacts(image).0
    }

    /// Run the pipeline and keep the intermediate detections, e.g. for
    /// [`render_overlay`].
    pub fn process_with_artifacts(&self, image: &RgbImage) -> (ScanReport, ScanArtifacts) {
        let shape = self.params.shape;
        let (width, height) = (image.width(), image.height());
        debug!("BoardScanner::process start w={width} h={height} shape={shape:?}");
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();

        let stage_start = Instant::now();
        let blobs = detect_colored_regions(image, &self.params.regions);
        let regions_ms = stage_start.elapsed().as_secs_f64() * 1000.0;
        timings.push("regions", regions_ms);
        let count_of = |c: ColorCategory| blobs.iter().filter(|b| b.color == c).count();
        let regions_stage = RegionStage {
            elapsed_ms: regions_ms,
            blob_count: blobs.len(),
            green: count_of(ColorCategory::Green),
            yellow: count_of(ColorCategory::Yellow),
            pink: count_of(ColorCategory::Pink),
        };

        let stage_start = Instant::now();
        let gray = luma_of(image);
        let detected = detect_grid_lines(&gray, &blobs, &self.params.lines);
        let lines_ms = stage_start.elapsed().as_secs_f64() * 1000.0;
        timings.push("lines", lines_ms);
        let lines_stage = LineStage {
            elapsed_ms: lines_ms,
            raw_horizontal: detected.raw_horizontal,
            raw_vertical: detected.raw_vertical,
            horizontal: detected.horizontal.len(),
            vertical: detected.vertical.len(),
            cell_width: detected.cell_width,
            cell_height: detected.cell_height,
            cell_width_source: detected.cell_width_source,
            cell_height_source: detected.cell_height_source,
        };

        let selection = if detected.horizontal.is_empty() || detected.vertical.is_empty() {
            Err("insufficient grid lines on at least one axis".to_string())
        } else {
            select_table_bounds(
                &detected.horizontal,
                &detected.vertical,
                &blobs,
                height as u32,
                shape,
            )
        };
        let (bounds, fallback) = match selection {
            Ok(bounds) => (bounds, None),
            Err(reason) => {
                warn!("falling back to the default grid: {reason}");
                (
                    fallback_bounds(width, height, shape),
                    Some(FallbackStage { reason }),
                )
            }
        };
        let bounds_stage = BoundsStage {
            top: bounds.top(),
            bottom: bounds.bottom(),
            left: bounds.left(),
            right: bounds.right(),
        };

        let (mut grid, mapping_stats) = map_blobs_to_grid(&blobs, &bounds, shape);

        let stage_start = Instant::now();
        let cells_stage = self.cell_pass(image, &bounds, &mut grid, fallback.is_some());
        timings.push("cells", cells_stage.elapsed_ms);

        let header = extract_header(image, bounds.top(), self.recognizer.as_ref());
        let header_stage = HeaderStage {
            building_found: !header.building.is_empty(),
            name_found: !header.name.is_empty(),
        };

        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        let report = ScanReport {
            output: ScanOutput::from_grid(header, &grid),
            trace: PipelineTrace {
                input: InputDescriptor { width, height },
                timings,
                regions: regions_stage,
                lines: Some(lines_stage),
                bounds: Some(bounds_stage),
                fallback: fallback.clone(),
                mapping: MappingStage::from(mapping_stats),
                cells: cells_stage,
                header: header_stage,
            },
        };
        let artifacts = ScanArtifacts {
            blobs,
            bounds,
            fallback: fallback.is_some(),
        };
        (report, artifacts)
    }

    /// Parallel per-cell color sampling and text extraction. Blob-assigned
    /// colors take precedence over the sampled average; on the fallback grid
    /// only the cell centers are sampled and text stays empty.
    fn cell_pass(
        &self,
        image: &RgbImage,
        bounds: &TableBounds,
        grid: &mut Grid,
        fallback: bool,
    ) -> CellPassStage {
        let start = Instant::now();
        let shape = grid.shape();
        let margin = self.params.sample_margin;

        let mut addresses = Vec::with_capacity(shape.floors * shape.units);
        for row in 0..shape.floors {
            for col in 0..shape.units {
                addresses.push((row, col));
            }
        }

        let results: Vec<(usize, usize, Option<ColorCategory>, String)> = addresses
            .par_iter()
            .map(|&(row, col)| {
                let floor = shape.floors - row;
                let unit = col + 1;
                let (x0, x1) = (bounds.vertical[col] as i64, bounds.vertical[col + 1] as i64);
                let (y0, y1) = (
                    bounds.horizontal[row] as i64,
                    bounds.horizontal[row + 1] as i64,
                );
                let window = if fallback {
                    // Center window of half the cell size.
                    let (cw, ch) = (x1 - x0, y1 - y0);
                    (
                        x0 + cw / 4,
                        y0 + ch / 4,
                        (cw / 2).max(1),
                        (ch / 2).max(1),
                    )
                } else {
                    (
                        x0 + margin,
                        y0 + margin,
                        (x1 - x0 - 2 * margin).max(1),
                        (y1 - y0 - 2 * margin).max(1),
                    )
                };
                let Some(view) = image.view(window.0, window.1, window.2, window.3) else {
                    return (floor, unit, None, String::new());
                };
                let color = classify_rgb(view.mean_rgb());
                let text = if fallback {
                    String::new()
                } else {
                    extract_cell_text(&view.to_owned_image(), self.recognizer.as_ref())
                };
                (floor, unit, Some(color), text)
            })
            .collect();

        let mut stage = CellPassStage::default();
        for (floor, unit, sampled, text) in results {
            let Some(cell) = grid.get_mut(floor, unit) else {
                continue;
            };
            if let Some(color) = sampled {
                stage.sampled += 1;
                if cell.color == ColorCategory::White {
                    cell.color = color;
                }
            }
            if !text.is_empty() {
                stage.with_text += 1;
                cell.text = text;
            }
            if cell.color != ColorCategory::White {
                stage.colored += 1;
            }
        }
        stage.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        stage
    }
}

/// Default evenly-spaced grid over the assumed table region, used when line
/// evidence is insufficient.
fn fallback_bounds(width: usize, height: usize, shape: GridShape) -> TableBounds {
    let top = (height as f32 * FALLBACK_TOP).round();
    let bottom = (height as f32 * (1.0 - FALLBACK_BOTTOM)).round();
    let left = (width as f32 * FALLBACK_LEFT).round();
    let right = (width as f32 * (1.0 - FALLBACK_RIGHT)).round();

    let spread = |lo: f32, hi: f32, n: usize| -> Vec<i32> {
        (0..=n)
            .map(|i| (lo + (hi - lo) * i as f32 / n as f32).round() as i32)
            .collect()
    };
    TableBounds {
        horizontal: spread(top, bottom, shape.floors),
        vertical: spread(left, right, shape.units),
    }
}

const OVERLAY_H_LINE: [u8; 3] = [220, 40, 40];
const OVERLAY_V_LINE: [u8; 3] = [40, 60, 220];
const OVERLAY_BOUNDS: [u8; 3] = [30, 180, 60];

fn blob_marker_color(category: ColorCategory) -> [u8; 3] {
    match category {
        ColorCategory::Green => [0, 170, 0],
        ColorCategory::Yellow => [230, 190, 0],
        ColorCategory::Pink => [240, 100, 170],
        ColorCategory::White => [160, 160, 160],
    }
}

/// Annotated copy of the input for human inspection: horizontal boundaries
/// red, vertical blue, the table outline green, blob centers as filled dots
/// with a black ring.
pub fn render_overlay(image: &RgbImage, artifacts: &ScanArtifacts) -> RgbImage {
    let mut out = image.clone();
    let (w, h) = (out.width(), out.height());
    let bounds = &artifacts.bounds;

    for &y in &bounds.horizontal {
        if y >= 0 && (y as usize) < h {
            for x in 0..w {
                out.set(x, y as usize, OVERLAY_H_LINE);
            }
        }
    }
    for &x in &bounds.vertical {
        if x >= 0 && (x as usize) < w {
            for y in 0..h {
                out.set(x as usize, y, OVERLAY_V_LINE);
            }
        }
    }
    draw_rect_outline(
        &mut out,
        bounds.left(),
        bounds.top(),
        bounds.right(),
        bounds.bottom(),
        OVERLAY_BOUNDS,
    );

    for blob in &artifacts.blobs {
        let (cx, cy) = (blob.center.0 as i64, blob.center.1 as i64);
        let fill = blob_marker_color(blob.color);
        for dy in -4i64..=4 {
            for dx in -4i64..=4 {
                let (x, y) = (cx + dx, cy + dy);
                if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
                    continue;
                }
                let d2 = dx * dx + dy * dy;
                if d2 <= 9 {
                    out.set(x as usize, y as usize, fill);
                } else if d2 <= 16 {
                    out.set(x as usize, y as usize, [0, 0, 0]);
                }
            }
        }
    }
    out
}

fn draw_rect_outline(image: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, color: [u8; 3]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    for x in x0.max(0)..=x1.min(w - 1) {
        for &y in &[y0, y1] {
            if y >= 0 && y < h {
                image.set(x as usize, y as usize, color);
            }
        }
    }
    for y in y0.max(0)..=y1.min(h - 1) {
        for &x in &[x0, x1] {
            if x >= 0 && x < w {
                image.set(x as usize, y as usize, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_bounds_respect_the_margin_heuristics() {
        let shape = GridShape { floors: 5, units: 4 };
        let bounds = fallback_bounds(1000, 800, shape);
        assert_eq!(bounds.horizontal.len(), 6);
        assert_eq!(bounds.vertical.len(), 5);
        assert_eq!(bounds.top(), 120); // 15% of 800
        assert_eq!(bounds.bottom(), 760); // 95% of 800
        assert_eq!(bounds.left(), 80); // 8% of 1000
        assert_eq!(bounds.right(), 980); // 98% of 1000
    }

    #[test]
    fn featureless_image_falls_back_without_panicking() {
        let image = RgbImage::filled(300, 240, [252, 252, 252]);
        let scanner = BoardScanner::new(ScanParams {
            shape: GridShape { floors: 4, units: 3 },
            ..ScanParams::default()
        });
        let (report, artifacts) = scanner.process_with_artifacts(&image);
        assert!(artifacts.fallback);
        assert!(report.trace.fallback.is_some());
        assert_eq!(report.output.data.len(), 4);
        for row in &report.output.data {
            assert_eq!(row.units.len(), 3);
            for cell in row.units.values() {
                assert_eq!(cell.color, ColorCategory::White);
                assert!(cell.text.is_empty());
            }
        }
    }

    #[test]
    fn overlay_marks_the_table_outline() {
        let image = RgbImage::filled(100, 100, [255, 255, 255]);
        let artifacts = ScanArtifacts {
            blobs: Vec::new(),
            bounds: fallback_bounds(100, 100, GridShape { floors: 2, units: 2 }),
            fallback: true,
        };
        let overlay = render_overlay(&image, &artifacts);
        // Outer edges are repainted green by the table outline; interior
        // boundaries keep the axis colors.
        assert_eq!(overlay.get(50, artifacts.bounds.top() as usize), OVERLAY_BOUNDS);
        assert_eq!(overlay.get(50, artifacts.bounds.horizontal[1] as usize), OVERLAY_H_LINE);
        assert_eq!(overlay.get(artifacts.bounds.vertical[1] as usize, 50), OVERLAY_V_LINE);
    }
}
