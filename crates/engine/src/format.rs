//! Display formatting for the results table.

/// Placeholder shown for non-finite values (e.g., ratios against a zero supply).
pub const NOT_AVAILABLE: &str = "n/a";

/// Fixed number of decimals, e.g. `fixed(0.5291005, 6) == "0.529101"`.
pub fn fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    format!("{:.*}", decimals, value)
}

/// Dollar amount with a fixed number of decimals, e.g. `$1.2345`.
pub fn usd(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    format!("${:.*}", decimals, value)
}

/// Thousands-grouped number with at most `max_fraction_digits` decimals and
/// no trailing zeros, e.g. `grouped(1234.5678, 2) == "1,234.57"`.
pub fn grouped(value: f64, max_fraction_digits: usize) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    let rendered = format!("{:.*}", max_fraction_digits, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part.trim_end_matches('0')),
        None => (rendered.as_str(), ""),
    };

    let mut out = String::with_capacity(rendered.len() + int_part.len() / 3 + 1);
    let is_zero = int_part.bytes().all(|b| b == b'0') && frac_part.is_empty();
    if value.is_sign_negative() && !is_zero {
        out.push('-');
    }

    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}
