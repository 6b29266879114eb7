//! Numeric text handling shared by the state mutators and the summary renderer.
//!
//! User input arrives as free text with thousands separators. Parsing never fails:
//! anything that does not start with a number is worth zero.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serializer;

/// Parses a thousands-separated numeric string the way a lenient form field would.
///
/// Commas are stripped, leading whitespace is skipped and the longest numeric prefix
/// (sign, digits, fraction, exponent) is read. Unparseable input yields zero; numbers
/// too large for a `Decimal` saturate at its bounds.
pub fn parse_formatted_number(raw: &str) -> Decimal {
    let cleaned: String = raw.chars().filter(|ch| *ch != ',').collect();
    numeric_prefix(cleaned.trim_start()).unwrap_or(Decimal::ZERO)
}

/// [`parse_formatted_number`] clamped to zero or greater and narrowed to what a saved
/// file can carry.
pub fn parse_quantity(raw: &str) -> Decimal {
    sanitize_quantity(parse_formatted_number(raw))
}

/// Clamps at zero and narrows to a JSON-representable value. Idempotent.
pub fn sanitize_quantity(value: Decimal) -> Decimal {
    wire_representable(value.max(Decimal::ZERO))
}

/// The closest value that survives being written as a JSON (f64) number and read back.
pub fn wire_representable(value: Decimal) -> Decimal {
    let Ok(mut float) = value.to_string().parse::<f64>() else {
        return value;
    };

    // Values near Decimal::MAX can round up past it; step toward zero until one fits.
    for _ in 0..8 {
        if let Ok(exact) = Decimal::from_str(&float.to_string()) {
            return exact;
        }
        if float == 0.0 || !float.is_finite() {
            break;
        }
        float = f64::from_bits(float.to_bits() - 1);
    }
    value
}

/// Writes a stored quantity as the f64 nearest to its decimal text.
pub(crate) fn serialize_wire_number<S: Serializer>(
    value: &Decimal,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let float = value
        .to_string()
        .parse::<f64>()
        .ok()
        .or_else(|| value.to_f64())
        .unwrap_or_default();
    serializer.serialize_f64(float)
}

/// en-US grouping with at most two fraction digits: `1500` → `1,500`, `0.125` → `0.13`.
pub fn format_number(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    group_thousands(&rounded.normalize().to_string())
}

/// Dollar amount with exactly two fraction digits: `13` → `$13.00`.
pub fn format_currency(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    rounded.rescale(2);

    let text = group_thousands(&rounded.to_string());
    match text.strip_prefix('-') {
        Some(amount) => format!("-${amount}"),
        None => format!("${text}"),
    }
}

fn numeric_prefix(input: &str) -> Option<Decimal> {
    let bytes = input.as_bytes();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos = 1;
            true
        }
        Some(b'+') => {
            pos = 1;
            false
        }
        _ => false,
    };

    let integer_start = pos;
    while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
    }
    let integer = &input[integer_start..pos];

    let mut fraction = "";
    if bytes.get(pos) == Some(&b'.') {
        let fraction_start = pos + 1;
        let mut end = fraction_start;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        fraction = &input[fraction_start..end];
        pos = end;
    }

    if integer.is_empty() && fraction.is_empty() {
        return None;
    }

    let mut exponent = None;
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut end = pos + 1;
        if matches!(bytes.get(end), Some(b'+' | b'-')) {
            end += 1;
        }
        let digits_start = end;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        if end > digits_start {
            exponent = Some(&input[pos + 1..end]);
        }
    }

    let mut mantissa = String::with_capacity(integer.len() + fraction.len() + 3);
    if negative {
        mantissa.push('-');
    }
    mantissa.push_str(if integer.is_empty() { "0" } else { integer });
    if !fraction.is_empty() {
        mantissa.push('.');
        mantissa.push_str(fraction);
    }

    let exact = match exponent {
        Some(exponent) => Decimal::from_scientific(&format!("{mantissa}e{exponent}")).ok(),
        None => Decimal::from_str(&mantissa).ok(),
    };
    exact.or_else(|| Some(out_of_range(&mantissa, exponent, negative)))
}

/// A syntactically valid number `Decimal` cannot hold exactly: go through f64, then
/// saturate on overflow or flush to zero on underflow.
fn out_of_range(mantissa: &str, exponent: Option<&str>, negative: bool) -> Decimal {
    let text = match exponent {
        Some(exponent) => format!("{mantissa}e{exponent}"),
        None => mantissa.to_string(),
    };
    let float = text.parse::<f64>().unwrap_or(0.0);
    if let Ok(value) = Decimal::try_from(float) {
        return value;
    }

    match (float.abs() < 1.0, negative) {
        (true, _) => Decimal::ZERO,
        (false, true) => Decimal::MIN,
        (false, false) => Decimal::MAX,
    }
}

fn group_thousands(text: &str) -> String {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(text.len() + integer.len() / 3);
    grouped.push_str(sign);
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        format_currency, format_number, parse_formatted_number, parse_quantity,
        sanitize_quantity, wire_representable,
    };

    #[test]
    fn parses_thousands_separated_input() {
        assert_eq!(parse_formatted_number("1,234.5"), Decimal::new(12_345, 1));
        assert_eq!(parse_formatted_number("  200,000"), Decimal::from(200_000));
        assert_eq!(parse_formatted_number(".5"), Decimal::new(5, 1));
        assert_eq!(parse_formatted_number("12abc"), Decimal::from(12));
        assert_eq!(parse_formatted_number("1.5e3"), Decimal::from(1_500));
    }

    #[test]
    fn garbage_input_degrades_to_zero() {
        assert_eq!(parse_formatted_number(""), Decimal::ZERO);
        assert_eq!(parse_formatted_number("abc"), Decimal::ZERO);
        assert_eq!(parse_formatted_number("."), Decimal::ZERO);
        assert_eq!(parse_formatted_number("-"), Decimal::ZERO);
    }

    #[test]
    fn quantities_are_clamped_at_zero() {
        assert_eq!(parse_formatted_number("-42"), Decimal::from(-42));
        assert_eq!(parse_quantity("-42"), Decimal::ZERO);
        assert_eq!(parse_quantity("-0"), Decimal::ZERO);
        assert_eq!(parse_quantity("7"), Decimal::from(7));
    }

    #[test]
    fn oversized_numbers_saturate_instead_of_zeroing() {
        assert_eq!(parse_formatted_number("99999999999999999999999999999999"), Decimal::MAX);
        assert_eq!(parse_formatted_number("1e40"), Decimal::MAX);
        assert_eq!(parse_formatted_number("1e100000"), Decimal::MAX);
        assert_eq!(parse_formatted_number("-1e40"), Decimal::MIN);
        assert_eq!(parse_formatted_number("1e-100000"), Decimal::ZERO);

        let quantity = parse_quantity("1e40");
        assert!(quantity > Decimal::from(10_u64.pow(18)));
        assert_eq!(parse_quantity("-1e40"), Decimal::ZERO);
    }

    #[test]
    fn quantities_keep_only_json_representable_precision() {
        for raw in ["1234567890.123456789", "0.1", "1e40", "7.3", "123456789012345678901"] {
            let quantity = parse_quantity(raw);
            let through_json: f64 = quantity.to_string().parse().expect("float text");
            let reread = through_json.to_string().parse::<Decimal>().ok();
            assert_eq!(reread, Some(quantity), "input {raw}");
            assert_eq!(wire_representable(quantity), quantity, "input {raw}");
        }

        assert_eq!(parse_quantity("1,234.5"), Decimal::new(12_345, 1));
        assert_eq!(sanitize_quantity(Decimal::new(-5, 0)), Decimal::ZERO);
    }

    #[test]
    fn formats_numbers_with_grouping_and_two_digits_at_most() {
        assert_eq!(format_number(Decimal::from(1_500)), "1,500");
        assert_eq!(format_number(Decimal::new(12_345, 1)), "1,234.5");
        assert_eq!(format_number(Decimal::new(125, 3)), "0.13");
        assert_eq!(format_number(Decimal::from(1_000_000)), "1,000,000");
        assert_eq!(format_number(Decimal::ZERO), "0");
    }

    #[test]
    fn formats_currency_with_fixed_cents() {
        assert_eq!(format_currency(Decimal::from(13)), "$13.00");
        assert_eq!(format_currency(Decimal::new(1_234_567_891, 3)), "$1,234,567.89");
        assert_eq!(format_currency(Decimal::new(-4, 3)), "$0.00");
        assert_eq!(format_currency(Decimal::new(-1_250, 2)), "-$12.50");
    }
}
