//! Header metadata extraction.
//!
//! The margin above the table usually carries the building number and the
//! development name. Both are best-effort pattern matches over recognizer
//! output: a plausible building number is a short digit run in the hundreds
//! to thousands, a plausible name is a longer digit-free Hangul string that
//! is not one of the boilerplate labels printed next to the selectors.
use crate::image::RgbImage;
use crate::ocr::TextRecognizer;
use crate::types::HeaderInfo;
use log::{debug, warn};

const MIN_MARGIN_HEIGHT: i32 = 20;
const MIN_CONFIDENCE: f32 = 0.3;
const MIN_NAME_CHARS: usize = 4;
/// Boilerplate label words that disqualify a name candidate.
const LABEL_WORDS: [&str; 4] = ["동선택", "세대수", "호", "층"];

fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// First 2-4 digit run whose value is a plausible building number.
fn find_building_number(text: &str) -> Option<u32> {
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if !c.is_ascii_digit() {
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(i, d)) = chars.peek() {
            if d.is_ascii_digit() {
                end = i + d.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let run = &text[start..end];
        if (2..=4).contains(&run.len()) {
            if let Ok(value) = run.parse::<u32>() {
                if (100..=9999).contains(&value) {
                    return Some(value);
                }
            }
        }
    }
    None
}

fn is_name_candidate(text: &str) -> bool {
    text.chars().count() >= MIN_NAME_CHARS
        && text.chars().any(is_hangul)
        && !text.chars().any(|c| c.is_ascii_digit())
        && !LABEL_WORDS.iter().any(|label| text.contains(label))
}

/// Extract `{building, name}` from the margin above `table_top`. Never
/// fails; anything unrecoverable comes back as empty strings.
pub fn extract_header(
    image: &RgbImage,
    table_top: i32,
    recognizer: &dyn TextRecognizer,
) -> HeaderInfo {
    if table_top < MIN_MARGIN_HEIGHT {
        debug!("header margin too small ({table_top}px), skipping");
        return HeaderInfo::default();
    }
    let Some(view) = image.view(0, 0, image.width() as i64, table_top as i64) else {
        return HeaderInfo::default();
    };
    let margin = view.to_owned_image();
    let mut detections = match recognizer.recognize(&margin) {
        Ok(d) => d,
        Err(err) => {
            warn!("header recognition failed: {err}");
            return HeaderInfo::default();
        }
    };
    detections.retain(|d| d.confidence > MIN_CONFIDENCE);
    // Reading order.
    detections.sort_by_key(|d| (d.bbox.y, d.bbox.x));

    let mut info = HeaderInfo::default();
    for det in &detections {
        let text = det.text.trim();
        if info.building.is_empty() {
            if let Some(number) = find_building_number(text) {
                info.building = format!("{number}동");
            }
        }
        if info.name.is_empty() && is_name_candidate(text) {
            info.name = text.to_string();
        }
        if !info.building.is_empty() && !info.name.is_empty() {
            break;
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::TextDetection;
    use crate::types::Rect;

    struct FixedRecognizer(Vec<TextDetection>);

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, _region: &RgbImage) -> Result<Vec<TextDetection>, String> {
            Ok(self.0.clone())
        }
    }

    fn det(text: &str, confidence: f32, x: u32, y: u32) -> TextDetection {
        TextDetection {
            text: text.into(),
            confidence,
            bbox: Rect { x, y, w: 40, h: 14 },
        }
    }

    #[test]
    fn building_number_pattern() {
        assert_eq!(find_building_number("101동"), Some(101));
        assert_eq!(find_building_number("제 1205 동"), Some(1205));
        assert_eq!(find_building_number("12동"), None); // below 100
        assert_eq!(find_building_number("12345"), None); // run too long
        assert_eq!(find_building_number("없음"), None);
    }

    #[test]
    fn name_skips_label_words() {
        assert!(is_name_candidate("행복마을아파트"));
        assert!(!is_name_candidate("동선택 메뉴"));
        assert!(!is_name_candidate("세대수 현황"));
        assert!(!is_name_candidate("apartment")); // no Hangul
        assert!(!is_name_candidate("마을")); // too short
        assert!(!is_name_candidate("1205동")); // building number, not a name
    }

    #[test]
    fn header_combines_first_matches_in_reading_order() {
        let image = RgbImage::filled(200, 100, [255, 255, 255]);
        let rec = FixedRecognizer(vec![
            det("행복마을아파트", 0.9, 10, 30),
            det("103동", 0.8, 10, 5),
            det("205동", 0.8, 80, 40),
        ]);
        let info = extract_header(&image, 60, &rec);
        assert_eq!(info.building, "103동");
        assert_eq!(info.name, "행복마을아파트");
    }

    #[test]
    fn thin_margin_is_skipped() {
        let image = RgbImage::filled(200, 100, [255, 255, 255]);
        let rec = FixedRecognizer(vec![det("103동", 0.9, 10, 2)]);
        let info = extract_header(&image, 10, &rec);
        assert_eq!(info, HeaderInfo::default());
    }
}
