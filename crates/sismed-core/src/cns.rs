//! Cartão Nacional de Saúde (CNS) validation and formatting.
//!
//! A CNS is 15 digits. Numbers starting with 1 or 2 are definitive cards whose
//! last four digits are derived from the first eleven; numbers starting with
//! 7, 8 or 9 are provisional cards checked by a weighted sum modulo 11.
//!
//! Both functions are total: malformed input yields `false` or is echoed back,
//! never a panic.

/// Number of digits in a CNS.
pub const CNS_LENGTH: usize = 15;

/// Keep only the ASCII digits of `raw`.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Check a CNS against the official checksum rules.
///
/// Separators and other non-digit characters are ignored.
pub fn is_valid(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != CNS_LENGTH {
        return false;
    }

    match digits[0] {
        1 | 2 => is_valid_definitive(&digits),
        7..=9 => weighted_sum(&digits) % 11 == 0,
        _ => false,
    }
}

/// Definitive cards: rebuild the number from its first eleven digits.
fn is_valid_definitive(digits: &[u32]) -> bool {
    let pis = &digits[..11];
    let mut sum = weighted_sum(pis);
    let mut dv = 11 - sum % 11;
    if dv == 11 {
        dv = 0;
    }

    let middle: [u32; 3] = if dv == 10 {
        sum += 2;
        dv = 11 - sum % 11;
        [0, 0, 1]
    } else {
        [0, 0, 0]
    };

    digits[11..14] == middle && digits[14] == dv
}

/// Σ d[i] · (15 − i)
fn weighted_sum(digits: &[u32]) -> u32 {
    digits
        .iter()
        .zip((1..=CNS_LENGTH as u32).rev())
        .map(|(d, weight)| d * weight)
        .sum()
}

/// Group the digits of `raw` as `000 0000 0000 0000` for display.
///
/// Partial input is grouped as far as it goes, which suits echoing a field
/// while it is typed. Input holding more than 15 digits is returned unchanged.
pub fn format(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.len() > CNS_LENGTH {
        return raw.to_string();
    }

    let mut out = String::with_capacity(CNS_LENGTH + 3);
    for (i, c) in digits.chars().enumerate() {
        if i == 3 || i == 7 || i == 11 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
