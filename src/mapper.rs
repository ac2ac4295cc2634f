//! Blob-to-cell assignment.
//!
//! Maps blob centers into the canonical table windows with half-open
//! interval lookup per axis. Row 0 is the top floor, so `floor = floors −
//! row`; the selected vertical window covers the unit columns only (the
//! floor-number column sits left of it), so `unit = col + 1`.
//!
//! The source data is noisy: two blobs can land in one cell when a painted
//! region is split by a grid line. Assignment is last-write-wins with the
//! conflict logged, never a hard failure.
use crate::bounds::TableBounds;
use crate::types::{ColorBlob, ColorCategory, Grid, GridShape};
use log::{debug, warn};

/// Per-run assignment counters, surfaced in the pipeline trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MappingStats {
    pub assigned: usize,
    pub out_of_range: usize,
    pub conflicts: usize,
}

fn interval_of(boundaries: &[i32], value: i32) -> Option<usize> {
    for i in 0..boundaries.len().saturating_sub(1) {
        if boundaries[i] <= value && value < boundaries[i + 1] {
            return Some(i);
        }
    }
    None
}

/// Build a color-only grid from the mapped blobs. Text is filled in later
/// by the per-cell pass.
pub fn map_blobs_to_grid(
    blobs: &[ColorBlob],
    bounds: &TableBounds,
    shape: GridShape,
) -> (Grid, MappingStats) {
    let mut grid = Grid::new(shape);
    let mut stats = MappingStats::default();

    for blob in blobs {
        let (cx, cy) = (blob.center.0 as i32, blob.center.1 as i32);
        let (Some(col), Some(row)) = (
            interval_of(&bounds.vertical, cx),
            interval_of(&bounds.horizontal, cy),
        ) else {
            debug!(
                "blob {:?} at ({}, {}) outside the table window, dropped",
                blob.color, cx, cy
            );
            stats.out_of_range += 1;
            continue;
        };
        let floor = shape.floors - row;
        let unit = col + 1;
        if let Some(cell) = grid.get_mut(floor, unit) {
            if cell.color != ColorCategory::White {
                warn!(
                    "cell ({floor}, {unit}) already {:?}, overwritten with {:?}",
                    cell.color, blob.color
                );
                stats.conflicts += 1;
            }
            cell.color = blob.color;
            stats.assigned += 1;
        }
    }
    (grid, stats)
}
