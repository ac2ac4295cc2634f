//! Pastel color classification.
//!
//! Maps one averaged RGB sample to a [`ColorCategory`]. The board fills are
//! low-saturation pastels that sit close together in both RGB and HSV space,
//! so neither metric alone separates them reliably. The classifier layers
//! the two: an ordered list of direct-RGB rules handles the common pastel
//! cases cheaply and precisely, then a hue computation catches the rest.
//!
//! The rule list makes precedence explicit: rules are evaluated top to
//! bottom and the first match wins. The function is pure and total — every
//! input yields exactly one category, defaulting to white.
use crate::types::ColorCategory;

/// One named classification rule. `apply` returns `None` when the rule does
/// not fire, letting evaluation fall through to the next rule.
pub struct ColorRule {
    pub name: &'static str,
    pub apply: fn(f32, f32, f32) -> Option<ColorCategory>,
}

/// Direct-RGB rules, evaluated in order before the hue fallback.
pub const RGB_RULES: &[ColorRule] = &[
    ColorRule {
        name: "white-bright",
        apply: |r, g, b| (r > 245.0 && g > 245.0 && b > 245.0).then_some(ColorCategory::White),
    },
    ColorRule {
        name: "white-flat",
        apply: |r, g, b| {
            let brightness = (r + g + b) / 3.0;
            (brightness > 240.0 && max_channel_diff(r, g, b) < 15.0)
                .then_some(ColorCategory::White)
        },
    },
    ColorRule {
        name: "yellow-strict",
        apply: |r, g, b| {
            (r > 220.0
                && g > 220.0
                && b < 230.0
                && r > b + 10.0
                && g > b + 10.0
                && (r - g).abs() < 30.0)
                .then_some(ColorCategory::Yellow)
        },
    },
    ColorRule {
        name: "yellow-loose",
        apply: |r, g, b| {
            (r > 200.0 && g > 200.0 && (r + g) / 2.0 > b + 5.0 && (r - g).abs() < 35.0)
                .then_some(ColorCategory::Yellow)
        },
    },
    ColorRule {
        name: "yellow-cream",
        apply: |r, g, b| {
            (r > 230.0 && g > 230.0 && r >= b && g >= b && r + g > b * 2.0 + 20.0)
                .then_some(ColorCategory::Yellow)
        },
    },
    ColorRule {
        name: "green",
        apply: |r, g, b| {
            (g > 200.0 && g > r + 5.0 && g > b + 5.0).then_some(ColorCategory::Green)
        },
    },
    ColorRule {
        name: "pink",
        apply: |r, g, b| {
            (r > 220.0 && b > 200.0 && r > g && b > g - 20.0 && r >= b - 30.0)
                .then_some(ColorCategory::Pink)
        },
    },
];

fn max_channel_diff(r: f32, g: f32, b: f32) -> f32 {
    let rg = (r - g).abs();
    let rb = (r - b).abs();
    let gb = (g - b).abs();
    rg.max(rb).max(gb)
}

/// Hue in degrees [0, 360) and saturation [0, 1] of an RGB triple.
pub fn hue_saturation(r: f32, g: f32, b: f32) -> (f32, f32) {
    let rn = r / 255.0;
    let gn = g / 255.0;
    let bn = b / 255.0;
    let max_c = rn.max(gn).max(bn);
    let min_c = rn.min(gn).min(bn);
    let diff = max_c - min_c;
    let s = if max_c == 0.0 { 0.0 } else { diff / max_c };
    let h = if diff == 0.0 {
        0.0
    } else if max_c == rn {
        60.0 * (((gn - bn) / diff).rem_euclid(6.0))
    } else if max_c == gn {
        60.0 * ((bn - rn) / diff + 2.0)
    } else {
        60.0 * ((rn - gn) / diff + 4.0)
    };
    (h, s)
}

fn classify_by_hue(r: f32, g: f32, b: f32) -> ColorCategory {
    let (h, s) = hue_saturation(r, g, b);
    if s < 0.05 {
        return ColorCategory::White;
    }
    if (40.0..=70.0).contains(&h) {
        return ColorCategory::Yellow;
    }
    if h > 70.0 && h <= 160.0 {
        return ColorCategory::Green;
    }
    if h > 300.0 || h < 35.0 {
        return ColorCategory::Pink;
    }
    if (260.0..=300.0).contains(&h) {
        return ColorCategory::Pink;
    }
    ColorCategory::White
}

/// Classify one averaged RGB sample (channels in [0, 255]).
pub fn classify_color(r: f32, g: f32, b: f32) -> ColorCategory {
    for rule in RGB_RULES {
        if let Some(category) = (rule.apply)(r, g, b) {
            return category;
        }
    }
    classify_by_hue(r, g, b)
}

/// Convenience wrapper for a `[r, g, b]` mean sample.
pub fn classify_rgb(rgb: [f32; 3]) -> ColorCategory {
    classify_color(rgb[0], rgb[1], rgb[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorCategory::*;

    #[test]
    fn near_white_samples_are_white() {
        assert_eq!(classify_color(255.0, 255.0, 255.0), White);
        assert_eq!(classify_color(248.0, 246.0, 247.0), White);
        // Bright but flat gray.
        assert_eq!(classify_color(242.0, 243.0, 241.0), White);
    }

    #[test]
    fn pastel_fills_match_their_rules() {
        // Strict yellow: R and G high and close, B clearly lower.
        assert_eq!(classify_color(240.0, 235.0, 180.0), Yellow);
        // Loose yellow: lighter tone where only the R/G mean clears B.
        assert_eq!(classify_color(210.0, 205.0, 195.0), Yellow);
        // Pastel green.
        assert_eq!(classify_color(190.0, 230.0, 190.0), Green);
        // Pastel pink: R leads, B close behind, G trails.
        assert_eq!(classify_color(250.0, 200.0, 220.0), Pink);
    }

    #[test]
    fn hue_fallback_covers_saturated_colors() {
        // Saturated colors miss the pastel RGB rules and fall through to hue.
        assert_eq!(classify_color(120.0, 180.0, 60.0), Green); // hue ~90
        assert_eq!(classify_color(170.0, 60.0, 160.0), Pink); // hue ~305
        assert_eq!(classify_color(140.0, 60.0, 180.0), Pink); // hue ~280 (purple band)
        assert_eq!(classify_color(160.0, 140.0, 40.0), Yellow); // hue ~50
    }

    #[test]
    fn purple_band_is_capped_at_300_degrees() {
        // Hue 310 falls in the >300 pink branch either way, but 290 is only
        // pink because the band tops out at 300 rather than the older 330.
        let (h, _) = hue_saturation(150.0, 60.0, 200.0);
        assert!(h > 260.0 && h < 300.0, "expected purple-band hue, got {h}");
        assert_eq!(classify_color(150.0, 60.0, 200.0), Pink);
    }

    #[test]
    fn classification_is_total_and_deterministic() {
        for r in (0..=255).step_by(51) {
            for g in (0..=255).step_by(51) {
                for b in (0..=255).step_by(51) {
                    let first = classify_color(r as f32, g as f32, b as f32);
                    let second = classify_color(r as f32, g as f32, b as f32);
                    assert_eq!(first, second);
                }
            }
        }
    }
}
