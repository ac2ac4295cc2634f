//! Execution trace of one scan.
//!
//! Every stage leaves a small serializable descriptor behind so a failed or
//! surprising extraction can be diagnosed from the JSON alone, without
//! rerunning the pipeline. All types serialize camelCase.
use crate::lines::CellSizeSource;
use crate::mapper::MappingStats;
use crate::report::ScanOutput;
use serde::Serialize;

/// Result produced by [`BoardScanner::process`](crate::scanner::BoardScanner).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub output: ScanOutput,
    pub trace: PipelineTrace,
}

/// Timing entry for one pipeline stage.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

/// Aggregated timing trace for the scan.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming {
            label: label.into(),
            elapsed_ms,
        });
    }
}

/// End-to-end trace describing the internal execution of the scanner.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub input: InputDescriptor,
    pub timings: TimingBreakdown,
    pub regions: RegionStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<LineStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundsStage>,
    /// Present when the scan ran on the default evenly-spaced grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackStage>,
    pub mapping: MappingStage,
    pub cells: CellPassStage,
    pub header: HeaderStage,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStage {
    pub elapsed_ms: f64,
    pub blob_count: usize,
    pub green: usize,
    pub yellow: usize,
    pub pink: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineStage {
    pub elapsed_ms: f64,
    pub raw_horizontal: usize,
    pub raw_vertical: usize,
    pub horizontal: usize,
    pub vertical: usize,
    pub cell_width: f32,
    pub cell_height: f32,
    pub cell_width_source: CellSizeSource,
    pub cell_height_source: CellSizeSource,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsStage {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackStage {
    pub reason: String,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingStage {
    pub assigned: usize,
    pub out_of_range: usize,
    pub conflicts: usize,
}

impl From<MappingStats> for MappingStage {
    fn from(stats: MappingStats) -> Self {
        Self {
            assigned: stats.assigned,
            out_of_range: stats.out_of_range,
            conflicts: stats.conflicts,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellPassStage {
    pub elapsed_ms: f64,
    pub sampled: usize,
    pub colored: usize,
    pub with_text: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderStage {
    pub building_found: bool,
    pub name_found: bool,
}
