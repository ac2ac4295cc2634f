//! Canonical table-window selection.
//!
//! The detected line sets usually carry more lines than the logical grid
//! has boundaries: header rows, a legend, the floor-number column, stray
//! marks. The real data table is a contiguous window of exactly
//! `units + 1` vertical and `floors + 1` horizontal lines, found by sliding
//! a window of the target size over each axis and scoring it against the
//! blob evidence. Blobs are where painted cells actually are, so the right
//! window is the one they concentrate in, with uniform internal spacing.
use crate::lines::LineSet;
use crate::types::{ColorBlob, GridShape};
use log::{debug, warn};

/// The selected canonical windows, inclusive pixel spans.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBounds {
    /// `floors + 1` horizontal boundaries.
    pub horizontal: Vec<i32>,
    /// `units + 1` vertical boundaries; the first is unit 1's left edge.
    pub vertical: Vec<i32>,
}

impl TableBounds {
    pub fn top(&self) -> i32 {
        self.horizontal[0]
    }

    pub fn bottom(&self) -> i32 {
        self.horizontal[self.horizontal.len() - 1]
    }

    pub fn left(&self) -> i32 {
        self.vertical[0]
    }

    pub fn right(&self) -> i32 {
        self.vertical[self.vertical.len() - 1]
    }
}

fn std_dev(gaps: &[f32]) -> f32 {
    if gaps.is_empty() {
        return 0.0;
    }
    let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;
    let var = gaps.iter().map(|g| (g - mean) * (g - mean)).sum::<f32>() / gaps.len() as f32;
    var.sqrt()
}

fn window_gaps(window: &[i32]) -> Vec<f32> {
    window.windows(2).map(|w| (w[1] - w[0]) as f32).collect()
}

/// Score one vertical window: blob count inside it, spacing uniformity and
/// the vertical spread of the in-window blobs (a genuine unit column spans
/// most of the table height, a legend or header strip does not).
fn score_vertical_window(window: &[i32], blobs: &[ColorBlob], image_height: u32) -> f32 {
    let (lo, hi) = (window[0], window[window.len() - 1]);
    let inside: Vec<&ColorBlob> = blobs
        .iter()
        .filter(|b| (b.center.0 as i32) > lo && (b.center.0 as i32) < hi)
        .collect();
    let count = inside.len() as f32;
    let regularity = 20.0 / (1.0 + std_dev(&window_gaps(window)));

    let spread = if inside.is_empty() {
        0.0
    } else {
        let ys: Vec<f32> = inside.iter().map(|b| b.center.1 as f32).collect();
        let ymin = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let ymax = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let target = 0.4 * image_height as f32;
        ((ymax - ymin) / target).min(1.5) * 50.0
    };
    2.0 * count + regularity + spread
}

/// Score one horizontal window against the blobs already inside the chosen
/// vertical span. Rewards populated rows so that an empty header band never
/// outranks the data body.
fn score_horizontal_window(window: &[i32], blobs: &[ColorBlob]) -> f32 {
    let (lo, hi) = (window[0], window[window.len() - 1]);
    let count = blobs
        .iter()
        .filter(|b| (b.center.1 as i32) > lo && (b.center.1 as i32) < hi)
        .count() as f32;
    let regularity = 100.0 / (1.0 + std_dev(&window_gaps(window)));

    let active_rows = window
        .windows(2)
        .filter(|row| {
            blobs
                .iter()
                .any(|b| (b.center.1 as i32) >= row[0] && (b.center.1 as i32) < row[1])
        })
        .count() as f32;
    count + regularity + 30.0 * active_rows
}

fn best_window<F>(coords: &[i32], size: usize, score: F) -> (Vec<i32>, f32)
where
    F: Fn(&[i32]) -> f32,
{
    let mut best: Option<(usize, f32)> = None;
    for start in 0..=(coords.len() - size) {
        let s = score(&coords[start..start + size]);
        if best.map_or(true, |(_, b)| s > b) {
            best = Some((start, s));
        }
    }
    // coords.len() >= size is checked by the caller, so a window exists.
    let (start, s) = best.unwrap_or((0, 0.0));
    (coords[start..start + size].to_vec(), s)
}

/// Select the canonical `floors + 1` by `units + 1` line windows.
///
/// Fails when either axis carries fewer lines than the target window; the
/// caller falls back to a default grid. Without blob evidence the first
/// window on each axis is taken as a best-effort default.
pub fn select_table_bounds(
    horizontal: &LineSet,
    vertical: &LineSet,
    blobs: &[ColorBlob],
    image_height: u32,
    shape: GridShape,
) -> Result<TableBounds, String> {
    let need_h = shape.floors + 1;
    let need_v = shape.units + 1;
    if horizontal.len() < need_h {
        return Err(format!(
            "not enough horizontal lines: {} found, {} required",
            horizontal.len(),
            need_h
        ));
    }
    if vertical.len() < need_v {
        return Err(format!(
            "not enough vertical lines: {} found, {} required",
            vertical.len(),
            need_v
        ));
    }

    if blobs.is_empty() {
        warn!("bounds selection without blob evidence, taking the first window on each axis");
        return Ok(TableBounds {
            horizontal: horizontal.as_slice()[..need_h].to_vec(),
            vertical: vertical.as_slice()[..need_v].to_vec(),
        });
    }

    let (v_window, v_score) = best_window(vertical.as_slice(), need_v, |w| {
        score_vertical_window(w, blobs, image_height)
    });
    let (v_lo, v_hi) = (v_window[0], v_window[v_window.len() - 1]);
    let in_span: Vec<ColorBlob> = blobs
        .iter()
        .filter(|b| (b.center.0 as i32) > v_lo && (b.center.0 as i32) < v_hi)
        .cloned()
        .collect();
    let (h_window, h_score) = best_window(horizontal.as_slice(), need_h, |w| {
        score_horizontal_window(w, &in_span)
    });
    debug!(
        "bounds: vertical [{}..{}] score {:.1}, horizontal [{}..{}] score {:.1}",
        v_lo,
        v_hi,
        v_score,
        h_window[0],
        h_window[h_window.len() - 1],
        h_score
    );

    Ok(TableBounds {
        horizontal: h_window,
        vertical: v_window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorCategory, Rect};

    fn blob_at(x: u32, y: u32) -> ColorBlob {
        ColorBlob {
            color: ColorCategory::Green,
            center: (x, y),
            bbox: Rect {
                x: x.saturating_sub(5),
                y: y.saturating_sub(5),
                w: 10,
                h: 10,
            },
            area: 600.0,
        }
    }

    fn shape(floors: usize, units: usize) -> GridShape {
        GridShape { floors, units }
    }

    #[test]
    fn too_few_lines_is_an_error() {
        let h = LineSet::new((0..5).map(|i| i * 30).collect());
        let v = LineSet::new((0..5).map(|i| i * 60).collect());
        let err = select_table_bounds(&h, &v, &[], 300, shape(10, 4));
        assert!(err.is_err());
    }

    #[test]
    fn without_blobs_the_first_window_wins() {
        let h = LineSet::new((0..8).map(|i| i * 30).collect());
        let v = LineSet::new((0..8).map(|i| i * 60).collect());
        let bounds = select_table_bounds(&h, &v, &[], 300, shape(4, 4)).expect("bounds");
        assert_eq!(bounds.horizontal, vec![0, 30, 60, 90, 120]);
        assert_eq!(bounds.vertical, vec![0, 60, 120, 180, 240]);
    }

    #[test]
    fn blob_cluster_pulls_the_window_off_noise_lines() {
        // True table: verticals 100..400 every 60, horizontals 50..170 every
        // 30. Noise lines sit before and after each true window.
        let v = LineSet::new(vec![10, 40, 100, 160, 220, 280, 340, 400, 470]);
        let h = LineSet::new(vec![5, 20, 50, 80, 110, 140, 170, 260]);
        // Blobs fill the table body, spread over most of its height.
        let blobs = vec![
            blob_at(130, 65),
            blob_at(190, 95),
            blob_at(250, 125),
            blob_at(310, 155),
            blob_at(370, 65),
            blob_at(130, 155),
        ];
        let bounds = select_table_bounds(&h, &v, &blobs, 300, shape(4, 5)).expect("bounds");
        assert_eq!(bounds.vertical, vec![100, 160, 220, 280, 340, 400]);
        assert_eq!(bounds.horizontal, vec![50, 80, 110, 140, 170]);
    }

    #[test]
    fn active_rows_outweigh_an_empty_header_band() {
        // Two candidate horizontal windows with identical spacing; only the
        // lower one contains blobs.
        let h = LineSet::new(vec![0, 30, 60, 90, 120, 150, 180]);
        let v = LineSet::new(vec![0, 60, 120, 180]);
        let blobs = vec![blob_at(30, 100), blob_at(90, 130), blob_at(150, 160)];
        let bounds = select_table_bounds(&h, &v, &blobs, 200, shape(3, 3)).expect("bounds");
        assert_eq!(bounds.horizontal, vec![90, 120, 150, 180]);
    }
}
