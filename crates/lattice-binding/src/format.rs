//! Display formatting of property values.
//!
//! [`format_value`] turns a value into the string a text widget shows. Numeric
//! kinds understand a small set of standard format codes, each an ASCII letter
//! optionally followed by a precision:
//!
//! | Code | Meaning                     | Default precision |
//! |------|-----------------------------|-------------------|
//! | `F`  | fixed point                 | 2                 |
//! | `N`  | fixed point, `,` grouping   | 2                 |
//! | `P`  | percent (value × 100, `%`)  | 2                 |
//! | `E`  | scientific, 3-digit exponent| 6                 |
//! | `D`  | integer, zero-padded        | none              |
//! | `X`  | hexadecimal, zero-padded    | none              |
//! | `G`  | default representation      | -                 |
//!
//! `e`/`x` select lowercase output. Everything else (an empty spec, an unknown
//! code, an integer-only code on a float, or any non-numeric value) falls back
//! to the value's `Display` output.

use crate::value::PropertyValue;

const MAX_PRECISION: usize = 99;

/// Format `value` for display using `spec`. `None` formats as an empty string.
pub fn format_value(value: Option<&PropertyValue>, spec: &str) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let formatted = match value {
        PropertyValue::Int32(v) => parse_spec(spec).and_then(|(code, p)| format_int(*v, code, p)),
        PropertyValue::Float(v) => {
            parse_spec(spec).and_then(|(code, p)| format_float(f64::from(*v), code, p))
        }
        _ => None,
    };

    formatted.unwrap_or_else(|| value.to_string())
}

fn parse_spec(spec: &str) -> Option<(char, Option<usize>)> {
    let mut chars = spec.trim().chars();
    let code = chars.next()?;
    if !code.is_ascii_alphabetic() {
        return None;
    }
    let digits = chars.as_str();
    if digits.is_empty() {
        return Some((code, None));
    }
    let precision = digits
        .parse::<usize>()
        .ok()
        .filter(|p| *p <= MAX_PRECISION)?;
    Some((code, Some(precision)))
}

fn format_int(value: i32, code: char, precision: Option<usize>) -> Option<String> {
    match code {
        'D' | 'd' => {
            let width = precision.unwrap_or(0);
            let digits = format!("{:0width$}", value.unsigned_abs());
            Some(if value < 0 { format!("-{digits}") } else { digits })
        }
        'X' => Some(format!("{:0width$X}", value, width = precision.unwrap_or(0))),
        'x' => Some(format!("{:0width$x}", value, width = precision.unwrap_or(0))),
        _ => format_float(f64::from(value), code, precision),
    }
}

fn format_float(value: f64, code: char, precision: Option<usize>) -> Option<String> {
    match code {
        'F' | 'f' => Some(format!("{:.*}", precision.unwrap_or(2), value)),
        'N' | 'n' => Some(group_thousands(&format!(
            "{:.*}",
            precision.unwrap_or(2),
            value
        ))),
        'P' | 'p' => Some(format!("{:.*}%", precision.unwrap_or(2), value * 100.0)),
        'E' | 'e' => Some(scientific(value, precision.unwrap_or(6), code == 'E')),
        _ => None,
    }
}

fn scientific(value: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, value);
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return raw;
    };
    let sign = if exponent < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{mantissa}{marker}{sign}{:03}", exponent.unsigned_abs())
}

fn group_thousands(fixed: &str) -> String {
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    if !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return fixed.to_string();
    }

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{EnumType, EnumValue};

    fn fmt(value: impl Into<PropertyValue>, spec: &str) -> String {
        format_value(Some(&value.into()), spec)
    }

    #[test]
    fn test_empty_spec_is_default_representation() {
        assert_eq!(fmt(42, ""), "42");
        assert_eq!(fmt(-7, ""), "-7");
        assert_eq!(fmt(1.5f32, ""), "1.5");
        assert_eq!(fmt(true, ""), "true");
    }

    #[test]
    fn test_none_is_empty() {
        assert_eq!(format_value(None, "F2"), "");
    }

    #[test]
    fn test_fixed_and_grouped() {
        assert_eq!(fmt(3.14159f32, "F2"), "3.14");
        assert_eq!(fmt(7, "F"), "7.00");
        assert_eq!(fmt(1234567, "N0"), "1,234,567");
        assert_eq!(fmt(-1234.5f32, "N1"), "-1,234.5");
        assert_eq!(fmt(999, "N0"), "999");
    }

    #[test]
    fn test_integer_codes() {
        assert_eq!(fmt(42, "D5"), "00042");
        assert_eq!(fmt(-42, "D4"), "-0042");
        assert_eq!(fmt(255, "X"), "FF");
        assert_eq!(fmt(255, "x4"), "00ff");
        assert_eq!(fmt(2.5f32, "D3"), "2.5");
    }

    #[test]
    fn test_percent_and_scientific() {
        assert_eq!(fmt(0.256f32, "P1"), "25.6%");
        assert_eq!(fmt(1234.5f32, "E2"), "1.23E+003");
        assert_eq!(fmt(0.00015f32, "e1"), "1.5e-004");
    }

    #[test]
    fn test_unknown_or_malformed_specs_fall_back() {
        assert_eq!(fmt(12, "Q"), "12");
        assert_eq!(fmt(12, "F-1"), "12");
        assert_eq!(fmt(12, "0.00"), "12");
        assert_eq!(fmt(12, "G"), "12");
    }

    #[test]
    fn test_non_numeric_kinds_ignore_spec() {
        let ty = EnumType::sequential("Mode", ["Off", "On"]);
        assert_eq!(fmt(EnumValue::new(&ty, 1), "F2"), "On");
        assert_eq!(fmt("label", "N2"), "label");
    }
}
