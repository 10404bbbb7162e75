//! Hex color parsing and contrast derivation.
//!
//! The contrast function is total: malformed input yields the light default
//! instead of an error, so themed rendering can never fail on a bad color.

pub const CONTRAST_DARK: &str = "#000000";
pub const CONTRAST_LIGHT: &str = "#FFFFFF";
pub const LUMA_THRESHOLD: f64 = 128.0;

/// Parses a 3- or 6-digit hex color, with or without a leading `#`.
///
/// Shorthand digits expand by doubling (`#0f0` is `#00ff00`).
pub fn parse_hex_color(input: &str) -> Option<(u8, u8, u8)> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
    let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
    let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Perceptual luma via the Rec. 601 weighted sum.
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Picks a readable foreground color for the given background.
///
/// Backgrounds with luma at or above 128 get black text, darker ones get
/// white. Malformed input gets the light default.
#[must_use]
pub fn contrast_color(background: &str) -> &'static str {
    match parse_hex_color(background) {
        Some((r, g, b)) if luma(r, g, b) >= LUMA_THRESHOLD => CONTRAST_DARK,
        _ => CONTRAST_LIGHT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contrast_flips_at_the_128_boundary() {
        // Gray channels weight to exactly their value: 127 -> white, 128 -> black.
        assert_eq!(contrast_color("#7f7f7f"), CONTRAST_LIGHT);
        assert_eq!(contrast_color("#808080"), CONTRAST_DARK);
    }

    #[test]
    fn contrast_for_extremes() {
        assert_eq!(contrast_color("#FFFFFF"), CONTRAST_DARK);
        assert_eq!(contrast_color("#000000"), CONTRAST_LIGHT);
        assert_eq!(contrast_color("#3b82f6"), CONTRAST_LIGHT);
    }

    #[test]
    fn shorthand_is_equivalent_to_expanded_form() {
        for (short, long) in [("#0f0", "#00ff00"), ("#fff", "#ffffff"), ("abc", "aabbcc")] {
            assert_eq!(parse_hex_color(short), parse_hex_color(long));
            assert_eq!(contrast_color(short), contrast_color(long));
        }
    }

    #[test]
    fn malformed_input_never_fails() {
        for bad in ["", "#", "#12", "#12345", "#1234567", "#gggggg", "blue", "#00ff0z"] {
            assert_eq!(parse_hex_color(bad), None);
            assert_eq!(contrast_color(bad), CONTRAST_LIGHT);
        }
    }

    #[test]
    fn only_two_outputs_exist_over_valid_colors() {
        for r in (0u16..=255).step_by(51) {
            for g in (0u16..=255).step_by(51) {
                for b in (0u16..=255).step_by(51) {
                    let hex = format!("#{:02x}{:02x}{:02x}", r, g, b);
                    let out = contrast_color(&hex);
                    assert!(out == CONTRAST_DARK || out == CONTRAST_LIGHT);
                    let expected = if luma(r as u8, g as u8, b as u8) >= LUMA_THRESHOLD {
                        CONTRAST_DARK
                    } else {
                        CONTRAST_LIGHT
                    };
                    assert_eq!(out, expected, "monotonic boundary for {hex}");
                }
            }
        }
    }
}
