//! Per-cell text extraction.
//!
//! A cell's label is a short combination of printed glyphs (detected
//! geometrically) and marker letters (recognized optically). Symbols come
//! first, then recognizer output filtered to a confidence floor and, per
//! character, to the marker charset, ordered left to right. Recognition
//! failure is routine and degrades to symbols only.
use crate::image::{luma_of, RgbImage};
use crate::ocr::TextRecognizer;
use crate::symbols::detect_symbols;
use log::warn;

/// Letters that appear as cell markers on these boards. Everything else the
/// recognizer hallucinates in a 30 px cell is discarded.
const MARKER_LETTERS: [char; 5] = ['M', 'V', 'P', 'I', 'O'];
const MIN_CONFIDENCE: f32 = 0.3;

/// Extract the final text of one cell sub-image.
pub fn extract_cell_text(cell: &RgbImage, recognizer: &dyn TextRecognizer) -> String {
    let gray = luma_of(cell);
    let mut parts: Vec<String> = detect_symbols(&gray)
        .into_iter()
        .map(|s| s.glyph().to_string())
        .collect();

    match recognizer.recognize(cell) {
        Ok(mut detections) => {
            detections.retain(|d| d.confidence > MIN_CONFIDENCE);
            detections.sort_by_key(|d| d.bbox.x + d.bbox.w / 2);
            // Recognizers return fragments of varying length; filter per
            // character so a "MV" fragment contributes both markers.
            for det in detections {
                for c in det.text.trim().chars() {
                    let upper = c.to_ascii_uppercase();
                    if MARKER_LETTERS.contains(&upper) {
                        parts.push(upper.to_string());
                    }
                }
            }
        }
        Err(err) => {
            warn!("cell recognition failed, keeping symbols only: {err}");
        }
    }

    let mut seen: Vec<&str> = Vec::new();
    let mut out = String::new();
    for part in &parts {
        if !seen.contains(&part.as_str()) {
            seen.push(part);
            out.push_str(part);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{NullRecognizer, TextDetection};
    use crate::types::Rect;

    struct FixedRecognizer(Vec<TextDetection>);

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, _region: &RgbImage) -> Result<Vec<TextDetection>, String> {
            Ok(self.0.clone())
        }
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _region: &RgbImage) -> Result<Vec<TextDetection>, String> {
            Err("engine offline".into())
        }
    }

    fn det(text: &str, confidence: f32, x: u32) -> TextDetection {
        TextDetection {
            text: text.into(),
            confidence,
            bbox: Rect { x, y: 10, w: 8, h: 10 },
        }
    }

    fn white_cell() -> RgbImage {
        RgbImage::filled(40, 40, [255, 255, 255])
    }

    #[test]
    fn markers_are_filtered_ordered_and_deduplicated() {
        let rec = FixedRecognizer(vec![
            det("v", 0.9, 20),
            det("M", 0.8, 4),
            det("Q", 0.9, 1), // not in the marker set
            det("P", 0.1, 2), // below the confidence floor
            det("M", 0.7, 30),
        ]);
        assert_eq!(extract_cell_text(&white_cell(), &rec), "MV");
    }

    #[test]
    fn multi_character_fragments_contribute_each_marker() {
        let rec = FixedRecognizer(vec![det("MV", 0.9, 4)]);
        assert_eq!(extract_cell_text(&white_cell(), &rec), "MV");
    }

    #[test]
    fn non_marker_characters_inside_fragments_are_dropped() {
        let rec = FixedRecognizer(vec![det("m1원v", 0.9, 4)]);
        assert_eq!(extract_cell_text(&white_cell(), &rec), "MV");
    }

    #[test]
    fn recognizer_failure_degrades_to_symbols() {
        let cell = white_cell();
        assert_eq!(extract_cell_text(&cell, &FailingRecognizer), "");
        assert_eq!(extract_cell_text(&cell, &NullRecognizer), "");
    }

    #[test]
    fn filled_circle_cell_yields_the_glyph() {
        let mut cell = white_cell();
        for y in 12..28 {
            for x in 12..28 {
                let dx = x as i32 - 20;
                let dy = y as i32 - 20;
                if dx * dx + dy * dy <= 25 {
                    cell.set(x, y, [25, 25, 25]);
                }
            }
        }
        assert_eq!(extract_cell_text(&cell, &NullRecognizer), "●");
    }
}
