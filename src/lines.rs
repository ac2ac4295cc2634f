//! Grid-line detection with blob-calibrated gap interpolation.
//!
//! The input table is an irregular, partially obscured rendering of a
//! regular logical grid, so detection happens in layers:
//!
//! 1. Binarize (adaptive mean threshold on the blurred luma plane) and
//!    isolate thin structural lines with directional run-length openings —
//!    a wide-flat kernel keeps horizontal strokes, a tall-narrow one keeps
//!    vertical strokes.
//! 2. Grow 8-connected regions on each directional mask and fit a line per
//!    region via PCA of the pixel scatter. Regions whose principal
//!    direction strays from the intended axis, or whose projected length is
//!    below a fraction of the image dimension, are rejected. A surviving
//!    region contributes one axis coordinate (its centroid's perpendicular
//!    component).
//! 3. Cluster raw coordinates closer than a small pixel gap into single
//!    representatives (group means) — several detections of one physical
//!    line collapse together.
//! 4. Interpolate: estimate the true cell size from blob-center distances
//!    (falling back to detected line gaps when blob evidence is sparse or
//!    line gaps when blob gaps are implausible), drop spurious lines whose
//!    gap is below half the estimate, and synthesize evenly spaced lines
//!    into gaps above 1.5x the estimate. A final merge/filter/insert pass
//!    restores the spacing invariant: every gap ends up within
//!    `[0.5, 1.5]` of the estimated cell size.
//!
//! Fewer than 3 lines on an axis is treated as no evidence: the axis comes
//! back empty and the pipeline falls back to a default grid.
use crate::image::GrayImage;
use crate::mask::{adaptive_threshold_inv, Mask};
use crate::types::ColorBlob;
use log::debug;
use nalgebra::{Matrix2, SymmetricEigen};
use serde::Deserialize;

/// Ordered, strictly increasing grid-line coordinates along one axis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineSet {
    coords: Vec<i32>,
}

impl LineSet {
    pub fn new(mut coords: Vec<i32>) -> Self {
        coords.sort_unstable();
        coords.dedup();
        Self { coords }
    }

    pub fn empty() -> Self {
        Self { coords: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.coords
    }
}

/// Axis a detected line runs along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Knobs for the detector. Defaults reproduce behaviour tuned on
/// photographed 25x10 status boards.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LineParams {
    /// Adaptive threshold window (odd) and offset.
    pub threshold_block: usize,
    pub threshold_c: f32,
    /// Directional kernel lengths as image-dimension divisors.
    pub h_kernel_divisor: usize,
    pub v_kernel_divisor: usize,
    /// Minimum segment length as a fraction of the image dimension.
    pub h_min_len_frac: f32,
    pub v_min_len_frac: f32,
    /// Maximum deviation from the axis for a fitted segment (degrees).
    pub angle_tol_deg: f32,
    /// Raw coordinates closer than this collapse into one line.
    pub merge_gap: i32,
    /// Axes with fewer lines than this yield an empty result.
    pub min_lines: usize,
}

impl Default for LineParams {
    fn default() -> Self {
        Self {
            threshold_block: 15,
            threshold_c: 3.0,
            h_kernel_divisor: 30,
            v_kernel_divisor: 40,
            h_min_len_frac: 0.25,
            v_min_len_frac: 0.10,
            angle_tol_deg: 5.0,
            merge_gap: 5,
            min_lines: 3,
        }
    }
}

/// Which evidence source the cell-size estimate trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CellSizeSource {
    BlobGaps,
    LineGaps,
    Default,
}

/// Detection outcome for both axes plus calibration details.
#[derive(Clone, Debug)]
pub struct DetectedLines {
    pub horizontal: LineSet,
    pub vertical: LineSet,
    pub raw_horizontal: usize,
    pub raw_vertical: usize,
    pub cell_height: f32,
    pub cell_width: f32,
    pub cell_height_source: CellSizeSource,
    pub cell_width_source: CellSizeSource,
}

/// Detect grid lines on a pre-computed luma plane. Blobs, when available,
/// calibrate the expected cell size for interpolation.
pub fn detect_grid_lines(gray: &GrayImage, blobs: &[ColorBlob], params: &LineParams) -> DetectedLines {
    let w = gray.w;
    let h = gray.h;
    let binary = adaptive_threshold_inv(&gray.blur3(), params.threshold_block, params.threshold_c);

    let h_kernel = (w / params.h_kernel_divisor).max(3);
    let v_kernel = (h / params.v_kernel_divisor).max(3);
    let h_mask = binary.open_runs_h(h_kernel);
    let v_mask = binary.open_runs_v(v_kernel);

    let h_raw = axis_segment_coords(
        &h_mask,
        Axis::Horizontal,
        w as f32 * params.h_min_len_frac,
        params.angle_tol_deg,
    );
    let v_raw = axis_segment_coords(
        &v_mask,
        Axis::Vertical,
        h as f32 * params.v_min_len_frac,
        params.angle_tol_deg,
    );
    let raw_horizontal = h_raw.len();
    let raw_vertical = v_raw.len();

    let h_merged = cluster_coords(&h_raw, params.merge_gap as f32);
    let v_merged = cluster_coords(&v_raw, params.merge_gap as f32);
    debug!(
        "line detection: raw h={} v={} merged h={} v={}",
        raw_horizontal,
        raw_vertical,
        h_merged.len(),
        v_merged.len()
    );

    let (horizontal, cell_height, cell_height_source) =
        finalize_axis(h_merged, blobs, Axis::Horizontal, params.min_lines);
    let (vertical, cell_width, cell_width_source) =
        finalize_axis(v_merged, blobs, Axis::Vertical, params.min_lines);

    DetectedLines {
        horizontal,
        vertical,
        raw_horizontal,
        raw_vertical,
        cell_height,
        cell_width,
        cell_height_source,
        cell_width_source,
    }
}

fn finalize_axis(
    merged: Vec<i32>,
    blobs: &[ColorBlob],
    axis: Axis,
    min_lines: usize,
) -> (LineSet, f32, CellSizeSource) {
    if merged.len() < min_lines {
        debug!(
            "line detection: {:?} axis has only {} line(s), returning empty",
            axis,
            merged.len()
        );
        return (LineSet::empty(), 0.0, CellSizeSource::Default);
    }
    let (estimate, source) = estimate_cell_size(&merged, blobs, axis);
    let coords = interpolate_lines(&merged, estimate);
    (LineSet::new(coords), estimate, source)
}

struct AxisRegion {
    indices: Vec<usize>,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}

impl AxisRegion {
    fn new() -> Self {
        Self {
            indices: Vec::new(),
            sum_x: 0.0,
            sum_y: 0.0,
            sum_xx: 0.0,
            sum_yy: 0.0,
            sum_xy: 0.0,
        }
    }

    fn push(&mut self, idx: usize, x: usize, y: usize) {
        self.indices.push(idx);
        let xf = x as f64;
        let yf = y as f64;
        self.sum_x += xf;
        self.sum_y += yf;
        self.sum_xx += xf * xf;
        self.sum_yy += yf * yf;
        self.sum_xy += xf * yf;
    }
}

const NEIGH8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Grow 8-connected regions on a directional line mask and fit a line per
/// region with a PCA of the pixel scatter; emit the perpendicular-axis
/// coordinate of every region that passes the orientation and length gates.
fn axis_segment_coords(mask: &Mask, axis: Axis, min_len: f32, angle_tol_deg: f32) -> Vec<i32> {
    let w = mask.w;
    let h = mask.h;
    let mut used = vec![0u8; w * h];
    let mut stack: Vec<usize> = Vec::with_capacity(64);
    let mut coords = Vec::new();
    let tol_rad = angle_tol_deg.to_radians();

    for seed in 0..w * h {
        if mask.data[seed] == 0 || used[seed] != 0 {
            continue;
        }
        let mut region = AxisRegion::new();
        used[seed] = 1;
        stack.push(seed);
        while let Some(idx) = stack.pop() {
            let x = idx % w;
            let y = idx / w;
            region.push(idx, x, y);
            for (dx, dy) in NEIGH8 {
                let xn = x as i32 + dx;
                let yn = y as i32 + dy;
                if xn < 0 || yn < 0 || xn >= w as i32 || yn >= h as i32 {
                    continue;
                }
                let nidx = yn as usize * w + xn as usize;
                if mask.data[nidx] != 0 && used[nidx] == 0 {
                    used[nidx] = 1;
                    stack.push(nidx);
                }
            }
        }

        if let Some(coord) = fit_axis_coordinate(&region, w, axis, min_len, tol_rad) {
            coords.push(coord);
        }
    }
    coords
}

fn fit_axis_coordinate(
    region: &AxisRegion,
    width: usize,
    axis: Axis,
    min_len: f32,
    tol_rad: f32,
) -> Option<i32> {
    let count = region.indices.len();
    if count < 8 {
        return None;
    }
    let n = count as f64;
    let cx = region.sum_x / n;
    let cy = region.sum_y / n;
    let cxx = region.sum_xx / n - cx * cx;
    let cyy = region.sum_yy / n - cy * cy;
    let cxy = region.sum_xy / n - cx * cy;
    let cov = Matrix2::new(cxx as f32, cxy as f32, cxy as f32, cyy as f32);
    let eig = SymmetricEigen::new(cov);
    let (vmax, lambda) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        (eig.eigenvectors.column(0), eig.eigenvalues[0])
    } else {
        (eig.eigenvectors.column(1), eig.eigenvalues[1])
    };
    if !lambda.is_finite() || lambda < 0.0 {
        return None;
    }
    let (tx, ty) = (vmax[0], vmax[1]);
    let norm = (tx * tx + ty * ty).sqrt();
    if norm < 1e-6 {
        return None;
    }
    let (tx, ty) = (tx / norm, ty / norm);

    // Deviation from the intended axis, modulo direction sign.
    let deviation = match axis {
        Axis::Horizontal => ty.abs().atan2(tx.abs()),
        Axis::Vertical => tx.abs().atan2(ty.abs()),
    };
    if deviation > tol_rad {
        return None;
    }

    // Projected extent along the tangent.
    let mut smin = f32::INFINITY;
    let mut smax = f32::NEG_INFINITY;
    for &idx in &region.indices {
        let x = (idx % width) as f32;
        let y = (idx / width) as f32;
        let s = (x - cx as f32) * tx + (y - cy as f32) * ty;
        smin = smin.min(s);
        smax = smax.max(s);
    }
    if smax - smin < min_len {
        return None;
    }

    let coord = match axis {
        Axis::Horizontal => cy,
        Axis::Vertical => cx,
    };
    Some(coord.round() as i32)
}

/// Collapse coordinates whose consecutive distance is within `gap` into a
/// single representative (the group mean).
pub fn cluster_coords(raw: &[i32], gap: f32) -> Vec<i32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut sorted = raw.to_vec();
    sorted.sort_unstable();
    let mut groups = Vec::new();
    let mut start = 0usize;
    for i in 1..=sorted.len() {
        if i == sorted.len() || (sorted[i] - sorted[i - 1]) as f32 > gap {
            let group = &sorted[start..i];
            let mean = group.iter().map(|&v| v as i64).sum::<i64>() as f64 / group.len() as f64;
            groups.push(mean.round() as i32);
            start = i;
        }
    }
    groups
}

fn median(values: &mut Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let m = values.len();
    Some(if m % 2 == 1 {
        values[m / 2]
    } else {
        0.5 * (values[m / 2 - 1] + values[m / 2])
    })
}

// Plausible blob-center distance windows for one cell step. Pairs outside
// these ranges span several cells or are jitter within one.
const COL_GAP_RANGE: (f32, f32) = (40.0, 200.0);
const ROW_GAP_RANGE: (f32, f32) = (15.0, 100.0);
const SAME_LINE_TOL: f32 = 15.0;
const MIN_CELL_SIZE: f32 = 10.0;
const DEFAULT_CELL_SIZE: f32 = 20.0;

/// Estimate the canonical cell size along `axis`, weighing blob-implied
/// spacing against detected line gaps.
pub fn estimate_cell_size(
    coords: &[i32],
    blobs: &[ColorBlob],
    axis: Axis,
) -> (f32, CellSizeSource) {
    let mut line_gaps: Vec<f32> = coords
        .windows(2)
        .map(|w| (w[1] - w[0]) as f32)
        .collect();
    let median_line = median(&mut line_gaps);

    let mut data_gaps: Vec<f32> = Vec::new();
    let (range, sort_key): ((f32, f32), fn(&ColorBlob) -> u32) = match axis {
        // Column width: distances between blobs in the same row.
        Axis::Vertical => (COL_GAP_RANGE, |b| b.center.1),
        // Row height: distances between blobs in the same column.
        Axis::Horizontal => (ROW_GAP_RANGE, |b| b.center.0),
    };
    let mut sorted: Vec<&ColorBlob> = blobs.iter().collect();
    sorted.sort_by_key(|b| sort_key(b));
    for i in 0..sorted.len() {
        for j in (i + 1)..sorted.len().min(i + 10) {
            let (a, b) = (sorted[i], sorted[j]);
            let (same, gap) = match axis {
                Axis::Vertical => (
                    (a.center.1 as f32 - b.center.1 as f32).abs() < SAME_LINE_TOL,
                    (a.center.0 as f32 - b.center.0 as f32).abs(),
                ),
                Axis::Horizontal => (
                    (a.center.0 as f32 - b.center.0 as f32).abs() < SAME_LINE_TOL,
                    (a.center.1 as f32 - b.center.1 as f32).abs(),
                ),
            };
            if same && gap > range.0 && gap < range.1 {
                data_gaps.push(gap);
            }
        }
    }
    let median_data = median(&mut data_gaps);

    let (estimate, source) = match (median_data, median_line) {
        (Some(data), Some(line)) if line > 0.0 => {
            let line_noisy = line < data * 0.6;
            let data_sparse = data > line * 1.8;
            // Row blobs are often sparse, inflating the data median; check
            // sparsity first on the horizontal axis.
            if axis == Axis::Horizontal && data_sparse {
                (line, CellSizeSource::LineGaps)
            } else if line_noisy {
                (data, CellSizeSource::BlobGaps)
            } else if data_sparse {
                (line, CellSizeSource::LineGaps)
            } else {
                (data, CellSizeSource::BlobGaps)
            }
        }
        (Some(data), _) => (data, CellSizeSource::BlobGaps),
        (None, Some(line)) => (line, CellSizeSource::LineGaps),
        (None, None) => (DEFAULT_CELL_SIZE, CellSizeSource::Default),
    };
    let estimate = estimate.max(MIN_CELL_SIZE);
    debug!(
        "cell size estimate {:?}: {:.1}px (source {:?}, data={:?}, line={:?})",
        axis, estimate, source, median_data, median_line
    );
    (estimate, source)
}

/// Enforce the spacing invariant around `cell_size`: drop gaps below half a
/// cell, fill gaps above 1.5 cells with evenly spaced synthetic lines, then
/// re-merge and re-filter remaining near-duplicates.
pub fn interpolate_lines(coords: &[i32], cell_size: f32) -> Vec<i32> {
    if coords.len() < 2 {
        return coords.to_vec();
    }
    let filled = drop_and_fill(coords, cell_size);
    let merged = cluster_coords(&filled, cell_size * 0.5);
    let mut filtered = Vec::with_capacity(merged.len());
    for &c in &merged {
        match filtered.last() {
            Some(&last) if ((c - last) as f32) < cell_size * 0.8 => {}
            _ => filtered.push(c),
        }
    }
    // Filtering can reopen an over-wide gap; one more fill pass closes it.
    drop_and_fill(&filtered, cell_size)
}

fn drop_and_fill(coords: &[i32], cell_size: f32) -> Vec<i32> {
    let mut out = vec![coords[0]];
    let mut last = coords[0];
    for &next in &coords[1..] {
        let gap = (next - last) as f32;
        if gap < cell_size * 0.5 {
            continue; // spurious extra line
        }
        if gap > cell_size * 1.5 {
            let missing = (gap / cell_size).round() as i32 - 1;
            for j in 1..=missing {
                out.push(last + ((j as f32) * gap / (missing as f32 + 1.0)).round() as i32);
            }
        }
        out.push(next);
        last = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorCategory, Rect};

    fn blob_at(x: u32, y: u32) -> ColorBlob {
        ColorBlob {
            color: ColorCategory::Green,
            center: (x, y),
            bbox: Rect { x, y, w: 10, h: 10 },
            area: 600.0,
        }
    }

    #[test]
    fn clustering_collapses_nearby_detections() {
        let merged = cluster_coords(&[100, 102, 101, 160, 158, 240], 5.0);
        assert_eq!(merged, vec![101, 159, 240]);
    }

    #[test]
    fn interpolation_restores_spacing_invariant() {
        // A regular 30px lattice with one missing line, one duplicated line
        // and one spurious mid-cell line.
        let coords = vec![0, 3, 30, 60, 75, 120, 150];
        let out = interpolate_lines(&coords, 30.0);
        for w in out.windows(2) {
            let gap = (w[1] - w[0]) as f32;
            assert!(gap >= 15.0, "gap {gap} below 0.5x estimate in {out:?}");
            assert!(gap <= 45.0, "gap {gap} above 1.5x estimate in {out:?}");
        }
        assert!(out.contains(&0) && out.contains(&150));
    }

    #[test]
    fn blob_gaps_calibrate_column_width() {
        // Blobs on one row, 60px apart; detected lines polluted with noise
        // every 20px.
        let blobs = vec![blob_at(100, 50), blob_at(160, 52), blob_at(220, 49)];
        let coords: Vec<i32> = (0..10).map(|i| i * 20).collect();
        let (estimate, source) = estimate_cell_size(&coords, &blobs, Axis::Vertical);
        assert_eq!(source, CellSizeSource::BlobGaps);
        assert!((estimate - 60.0).abs() < 1.0, "estimate={estimate}");
    }

    #[test]
    fn sparse_blob_rows_fall_back_to_line_gaps() {
        // Two blobs three rows apart would imply a 90px row height; the
        // detected 30px line spacing must win.
        let blobs = vec![blob_at(100, 50), blob_at(101, 140)];
        let coords: Vec<i32> = (0..10).map(|i| i * 30).collect();
        let (estimate, source) = estimate_cell_size(&coords, &blobs, Axis::Horizontal);
        assert_eq!(source, CellSizeSource::LineGaps);
        assert!((estimate - 30.0).abs() < 1.0, "estimate={estimate}");
    }

    #[test]
    fn too_few_lines_yield_an_empty_axis() {
        let gray = GrayImage::new(64, 64); // all black, no structure
        let detected = detect_grid_lines(&gray, &[], &LineParams::default());
        assert!(detected.horizontal.is_empty());
        assert!(detected.vertical.is_empty());
    }

    #[test]
    fn synthetic_lattice_is_recovered() {
        // White board with dark 1px lattice lines: 5 horizontal, 4 vertical.
        let mut gray = GrayImage::new(160, 160);
        gray.data.fill(235);
        let h_positions = [20, 50, 80, 110, 140];
        let v_positions = [20, 60, 100, 140];
        for &y in &h_positions {
            for x in 0..160 {
                gray.set(x, y, 40);
            }
        }
        for &x in &v_positions {
            for y in 0..160 {
                gray.set(x, y, 40);
            }
        }
        let detected = detect_grid_lines(&gray, &[], &LineParams::default());
        assert_eq!(detected.horizontal.len(), h_positions.len());
        assert_eq!(detected.vertical.len(), v_positions.len());
        for (found, expected) in detected.horizontal.as_slice().iter().zip(h_positions) {
            assert!(
                (found - expected as i32).abs() <= 2,
                "h line {found} vs {expected}"
            );
        }
    }
}
