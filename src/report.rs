//! Structured output model.
//!
//! The consumer-facing shape: `{header, data}` with one entry per floor,
//! highest floor first, and unit keys zero-padded (`"01호"`) so that map
//! iteration order equals numeric order.
use crate::types::{ColorCategory, Grid, HeaderInfo};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize)]
pub struct ScanOutput {
    pub header: HeaderInfo,
    pub data: Vec<FloorRow>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FloorRow {
    pub floor: String,
    pub units: BTreeMap<String, CellOut>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CellOut {
    pub text: String,
    pub color: ColorCategory,
}

pub fn floor_key(floor: usize) -> String {
    format!("{floor}층")
}

pub fn unit_key(unit: usize) -> String {
    format!("{unit:02}호")
}

impl ScanOutput {
    pub fn from_grid(header: HeaderInfo, grid: &Grid) -> Self {
        let shape = grid.shape();
        let mut data = Vec::with_capacity(shape.floors);
        for floor in (1..=shape.floors).rev() {
            let mut units = BTreeMap::new();
            for unit in 1..=shape.units {
                if let Some(cell) = grid.get(floor, unit) {
                    units.insert(
                        unit_key(unit),
                        CellOut {
                            text: cell.text.clone(),
                            color: cell.color,
                        },
                    );
                }
            }
            data.push(FloorRow {
                floor: floor_key(floor),
                units,
            });
        }
        Self { header, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GridShape;

    #[test]
    fn floors_descend_and_unit_keys_are_padded() {
        let mut grid = Grid::new(GridShape { floors: 3, units: 12 });
        grid.get_mut(3, 1).unwrap().color = ColorCategory::Green;
        grid.get_mut(1, 12).unwrap().text = "●".to_string();

        let out = ScanOutput::from_grid(HeaderInfo::default(), &grid);
        assert_eq!(out.data.len(), 3);
        assert_eq!(out.data[0].floor, "3층");
        assert_eq!(out.data[2].floor, "1층");
        assert_eq!(out.data[0].units["01호"].color, ColorCategory::Green);
        assert_eq!(out.data[2].units["12호"].text, "●");
        // Zero padding keeps lexicographic order numeric.
        let keys: Vec<&String> = out.data[0].units.keys().collect();
        assert_eq!(keys.first().map(|s| s.as_str()), Some("01호"));
        assert_eq!(keys.last().map(|s| s.as_str()), Some("12호"));
    }

    #[test]
    fn serialized_shape_matches_the_contract() {
        let grid = Grid::new(GridShape { floors: 1, units: 1 });
        let out = ScanOutput::from_grid(
            HeaderInfo {
                building: "103동".into(),
                name: "행복마을".into(),
            },
            &grid,
        );
        let json = serde_json::to_value(&out).expect("serialize");
        assert_eq!(json["header"]["building"], "103동");
        assert_eq!(json["data"][0]["floor"], "1층");
        assert_eq!(json["data"][0]["units"]["01호"]["color"], "WHITE");
        assert_eq!(json["data"][0]["units"]["01호"]["text"], "");
    }
}
