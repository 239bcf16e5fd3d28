//! Range expressions from the decision tree sheets.
//!
//! Thresholds are authored as free text: `"10-20"`, `"<5"`, `">30"`, `"25+"`,
//! often with units and encoding debris attached (`"20Â°C"`, `"80%"`,
//! `"5mm"`). Parsing is deliberately lenient: a bound that cannot be read is
//! zero, and an expression of unknown shape matches nothing. Nothing here
//! returns an error.

/// Characters dropped before reading a number: degree sign, `C`, `%`, `m`
/// (covers `mm`), and the `Â` left behind when `°` is decoded as Latin-1.
const UNIT_CHARS: [char; 5] = ['Â', '°', 'C', '%', 'm'];

/// Shape of a parsed range expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeExpr {
    /// `"a-b"`. `max` is `None` when the second segment is blank; `last` is
    /// the final `-`-separated segment, which only differs from `max` for
    /// malformed expressions such as `"10-20-30"`.
    Band { min: f64, max: Option<f64>, last: f64 },
    /// `"<t"`
    LessThan(f64),
    /// `">t"`
    GreaterThan(f64),
    /// `"t+"`
    Plus(f64),
    /// A bare number with no operator.
    Single(f64),
    Unrecognized,
}

/// Parse a range expression. Shapes are checked in the order `-`, `<`, `>`, `+`.
pub fn parse(expr: &str, unit: &str) -> RangeExpr {
    let expr = expr.trim();
    if expr.is_empty() {
        return RangeExpr::Unrecognized;
    }

    if expr.contains('-') {
        let segments: Vec<&str> = expr.split('-').map(str::trim).collect();
        let min = lenient_number(segments[0], unit);
        let max = segments
            .get(1)
            .filter(|s| !s.is_empty())
            .map(|s| lenient_number(s, unit));
        let last = lenient_number(segments[segments.len() - 1], unit);
        return RangeExpr::Band { min, max, last };
    }

    if expr.contains('<') {
        return RangeExpr::LessThan(lenient_number(&expr.replacen('<', "", 1), unit));
    }

    if expr.contains('>') {
        return RangeExpr::GreaterThan(lenient_number(&expr.replacen('>', "", 1), unit));
    }

    if expr.contains('+') {
        return RangeExpr::Plus(lenient_number(&expr.replacen('+', "", 1), unit));
    }

    match leading_number(&strip_units(expr, unit)) {
        Some(value) => RangeExpr::Single(value),
        None => RangeExpr::Unrecognized,
    }
}

/// Best-effort numeric read of a single bound. Unreadable input is `0.0`.
pub fn lenient_number(raw: &str, unit: &str) -> f64 {
    leading_number(&strip_units(raw, unit))
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Remove the rule's unit label and stray unit characters, then trim.
pub fn strip_units(raw: &str, unit: &str) -> String {
    let unit = unit.trim();
    let without_label = if unit.is_empty() {
        raw.to_string()
    } else {
        raw.replace(unit, "")
    };

    without_label
        .chars()
        .filter(|c| !UNIT_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Read the longest decimal number at the start of `s`, ignoring trailing text.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_band() {
        assert_eq!(
            parse("10-20", "mm"),
            RangeExpr::Band {
                min: 10.0,
                max: Some(20.0),
                last: 20.0
            }
        );
    }

    #[test]
    fn band_trims_whitespace_around_separator() {
        assert_eq!(
            parse("  18 - 24 ", "°C"),
            RangeExpr::Band {
                min: 18.0,
                max: Some(24.0),
                last: 24.0
            }
        );
    }

    #[test]
    fn band_with_blank_upper_bound() {
        assert_eq!(
            parse("25-", ""),
            RangeExpr::Band {
                min: 25.0,
                max: None,
                last: 0.0
            }
        );
    }

    #[test]
    fn malformed_band_keeps_last_segment() {
        assert_eq!(
            parse("10-20-30", ""),
            RangeExpr::Band {
                min: 10.0,
                max: Some(20.0),
                last: 30.0
            }
        );
    }

    #[test]
    fn parses_operators() {
        assert_eq!(parse("<5", "mm"), RangeExpr::LessThan(5.0));
        assert_eq!(parse("> 30", "°C"), RangeExpr::GreaterThan(30.0));
        assert_eq!(parse("25+", ""), RangeExpr::Plus(25.0));
        assert_eq!(parse("0.5", ""), RangeExpr::Single(0.5));
    }

    #[test]
    fn dash_takes_precedence_over_operators() {
        assert!(matches!(parse(">5-10", ""), RangeExpr::Band { .. }));
        assert!(matches!(parse("<5-10", ""), RangeExpr::Band { .. }));
    }

    #[test]
    fn unknown_shapes_are_unrecognized() {
        assert_eq!(parse("", "mm"), RangeExpr::Unrecognized);
        assert_eq!(parse("   ", "mm"), RangeExpr::Unrecognized);
        assert_eq!(parse("n/a", ""), RangeExpr::Unrecognized);
    }

    #[test]
    fn operator_with_garbage_reads_as_zero() {
        assert_eq!(parse("<abc", ""), RangeExpr::LessThan(0.0));
        assert_eq!(parse("<<5", ""), RangeExpr::LessThan(0.0));
    }

    #[test]
    fn lenient_number_strips_units_and_mojibake() {
        assert_eq!(lenient_number("20Â°C", "°C"), 20.0);
        assert_eq!(lenient_number("20°C", ""), 20.0);
        assert_eq!(lenient_number("80%", "%"), 80.0);
        assert_eq!(lenient_number("5mm", "mm"), 5.0);
        assert_eq!(lenient_number(" 12.5 mm ", ""), 12.5);
    }

    #[test]
    fn lenient_number_defaults_to_zero() {
        assert_eq!(lenient_number("", ""), 0.0);
        assert_eq!(lenient_number("none", ""), 0.0);
        assert_eq!(lenient_number(".", ""), 0.0);
        assert_eq!(lenient_number("-", ""), 0.0);
    }

    #[test]
    fn lenient_number_reads_leading_prefix() {
        assert_eq!(lenient_number("12abc", ""), 12.0);
        assert_eq!(lenient_number("-3.5 ratio", "ratio"), -3.5);
        assert_eq!(lenient_number("1e2", ""), 100.0);
        assert_eq!(lenient_number("2e", ""), 2.0);
        assert_eq!(lenient_number(".75", ""), 0.75);
    }

    #[test]
    fn strip_units_removes_label_then_characters() {
        assert_eq!(strip_units("30 days", "days"), "30");
        assert_eq!(strip_units("Â°30", ""), "30");
    }
}
