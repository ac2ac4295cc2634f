use serde::{Deserialize, Serialize};

/// Closed set of fill categories used by the status board.
///
/// Classification is total: every RGB sample maps to exactly one category,
/// with [`ColorCategory::White`] as the default for anything unrecognized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorCategory {
    #[default]
    White,
    Yellow,
    Green,
    Pink,
}

impl ColorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorCategory::White => "WHITE",
            ColorCategory::Yellow => "YELLOW",
            ColorCategory::Green => "GREEN",
            ColorCategory::Pink => "PINK",
        }
    }

    /// The three categories detected as blobs. White is the absence of color.
    pub const CHROMATIC: [ColorCategory; 3] = [
        ColorCategory::Green,
        ColorCategory::Yellow,
        ColorCategory::Pink,
    ];
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// A detected contiguous colored region corresponding to one painted cell.
#[derive(Clone, Debug)]
pub struct ColorBlob {
    pub color: ColorCategory,
    /// Centroid of the region's pixels.
    pub center: (u32, u32),
    pub bbox: Rect,
    /// Enclosed area of the traced external boundary, in square pixels.
    pub area: f32,
}

/// Target logical shape of the data table: rows are floors (descending),
/// columns are units (ascending).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub floors: usize,
    pub units: usize,
}

impl Default for GridShape {
    fn default() -> Self {
        Self {
            floors: 25,
            units: 10,
        }
    }
}

/// One resolved cell: a fill category plus a short marker string.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Cell {
    pub color: ColorCategory,
    pub text: String,
}

/// Fixed-size mapping from (floor, unit) to [`Cell`].
///
/// Entries exist for every address once constructed; they are only ever
/// updated, never added or removed.
#[derive(Clone, Debug)]
pub struct Grid {
    shape: GridShape,
    cells: Vec<Cell>,
}

impl Grid {
    /// All cells start as `{White, ""}`.
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            cells: vec![Cell::default(); shape.floors * shape.units],
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    fn index(&self, floor: usize, unit: usize) -> Option<usize> {
        if floor == 0 || unit == 0 || floor > self.shape.floors || unit > self.shape.units {
            return None;
        }
        Some((floor - 1) * self.shape.units + (unit - 1))
    }

    pub fn get(&self, floor: usize, unit: usize) -> Option<&Cell> {
        self.index(floor, unit).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, floor: usize, unit: usize) -> Option<&mut Cell> {
        self.index(floor, unit).map(move |i| &mut self.cells[i])
    }
}

/// Best-effort metadata recovered from the margin above the table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HeaderInfo {
    pub building: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_defaults_to_white_and_empty() {
        let grid = Grid::new(GridShape {
            floors: 3,
            units: 2,
        });
        for floor in 1..=3 {
            for unit in 1..=2 {
                let cell = grid.get(floor, unit).unwrap();
                assert_eq!(cell.color, ColorCategory::White);
                assert!(cell.text.is_empty());
            }
        }
    }

    #[test]
    fn grid_addressing_is_one_based_and_bounded() {
        let mut grid = Grid::new(GridShape {
            floors: 2,
            units: 2,
        });
        assert!(grid.get(0, 1).is_none());
        assert!(grid.get(1, 0).is_none());
        assert!(grid.get(3, 1).is_none());
        grid.get_mut(2, 1).unwrap().color = ColorCategory::Green;
        assert_eq!(grid.get(2, 1).unwrap().color, ColorCategory::Green);
        assert_eq!(grid.get(1, 1).unwrap().color, ColorCategory::White);
    }
}
