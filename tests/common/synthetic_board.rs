//! Generates clean synthetic status-board images.
use board_scanner::image::RgbImage;
use board_scanner::types::GridShape;

pub const CELL_W: usize = 60;
pub const CELL_H: usize = 30;
pub const TOP: usize = 60;

pub const PASTEL_GREEN: [u8; 3] = [180, 230, 180];
pub const PASTEL_PINK: [u8; 3] = [250, 200, 220];

const LINE: [u8; 3] = [40, 40, 40];
const INK: [u8; 3] = [30, 30, 30];

pub struct SyntheticBoard {
    pub image: RgbImage,
    /// Left edge of unit column 1.
    pub left: usize,
    pub shape: GridShape,
}

impl SyntheticBoard {
    /// Interior of one logical cell (grid lines excluded).
    pub fn cell_interior(&self, floor: usize, unit: usize) -> (usize, usize, usize, usize) {
        let row = self.shape.floors - floor;
        let col = unit - 1;
        let x0 = self.left + col * CELL_W;
        let y0 = TOP + row * CELL_H;
        (x0 + 1, y0 + 1, CELL_W - 1, CELL_H - 1)
    }
}

/// Draw a `shape.floors x shape.units` board with 1 px dark grid lines on a
/// white background. `floor_column` adds an extra empty column left of the
/// data table, the way real boards list floor numbers. `fills` paints cell
/// interiors, `disks` stamps a small filled dark circle at the cell center.
pub fn build_board(
    shape: GridShape,
    floor_column: bool,
    fills: &[(usize, usize, [u8; 3])],
    disks: &[(usize, usize)],
) -> SyntheticBoard {
    let left = 40 + if floor_column { CELL_W } else { 0 };
    let width = left + shape.units * CELL_W + 20;
    let height = TOP + shape.floors * CELL_H + 30;
    let mut image = RgbImage::filled(width, height, [255, 255, 255]);

    let table_left = if floor_column { left - CELL_W } else { left };
    let right = left + shape.units * CELL_W;
    let bottom = TOP + shape.floors * CELL_H;

    for j in 0..=shape.floors {
        let y = TOP + j * CELL_H;
        for x in table_left..=right {
            image.set(x, y, LINE);
        }
    }
    let mut vlines: Vec<usize> = (0..=shape.units).map(|i| left + i * CELL_W).collect();
    if floor_column {
        vlines.push(table_left);
    }
    for x in vlines {
        for y in TOP..=bottom {
            image.set(x, y, LINE);
        }
    }

    let mut board = SyntheticBoard { image, left, shape };
    for &(floor, unit, rgb) in fills {
        let (x0, y0, w, h) = board.cell_interior(floor, unit);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                board.image.set(x, y, rgb);
            }
        }
    }
    for &(floor, unit) in disks {
        let (x0, y0, w, h) = board.cell_interior(floor, unit);
        let (cx, cy) = ((x0 + w / 2) as i32, (y0 + h / 2) as i32);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                let dx = x as i32 - cx;
                let dy = y as i32 - cy;
                if dx * dx + dy * dy <= 25 {
                    board.image.set(x, y, INK);
                }
            }
        }
    }
    board
}
