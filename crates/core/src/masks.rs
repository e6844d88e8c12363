//! Display masks for the digit-only registration fields.
//!
//! Every mask is a pure function of the digits in its input: punctuation typed
//! by the user is discarded, digits beyond the field maximum are dropped, and
//! the result is re-punctuated from scratch. That makes `mask(unmask(v)) == v`
//! for any already-masked `v`.

pub const TAX_ID_DIGITS: usize = 11;
pub const PHONE_DIGITS: usize = 11;
pub const POSTAL_CODE_DIGITS: usize = 8;

/// Length of a fully masked CPF, `000.000.000-00`.
pub const MASKED_TAX_ID_LEN: usize = 14;
/// Length of a fully masked CEP, `00000-000`.
pub const MASKED_POSTAL_CODE_LEN: usize = 9;

pub fn unmask(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn bounded_digits(value: &str, max: usize) -> String {
    value.chars().filter(char::is_ascii_digit).take(max).collect()
}

pub fn mask_tax_id(value: &str) -> String {
    let digits = bounded_digits(value, TAX_ID_DIGITS);
    let mut masked = String::with_capacity(MASKED_TAX_ID_LEN);
    for (index, digit) in digits.chars().enumerate() {
        match index {
            3 | 6 => masked.push('.'),
            9 => masked.push('-'),
            _ => {}
        }
        masked.push(digit);
    }
    masked
}

pub fn mask_postal_code(value: &str) -> String {
    let digits = bounded_digits(value, POSTAL_CODE_DIGITS);
    let mut masked = String::with_capacity(MASKED_POSTAL_CODE_LEN);
    for (index, digit) in digits.chars().enumerate() {
        if index == 5 {
            masked.push('-');
        }
        masked.push(digit);
    }
    masked
}

/// Masks landline and mobile numbers alike: `(00) 0000-0000` up to ten digits,
/// `(00) 00000-0000` at eleven.
pub fn mask_phone(value: &str) -> String {
    let digits = bounded_digits(value, PHONE_DIGITS);
    if digits.is_empty() {
        return String::new();
    }

    let (area, rest) = digits.split_at(digits.len().min(2));
    let mut masked = format!("({area}");
    if rest.is_empty() {
        return masked;
    }
    masked.push_str(") ");

    let prefix_len = if digits.len() == PHONE_DIGITS { 5 } else { 4 };
    if rest.len() <= prefix_len {
        masked.push_str(rest);
        return masked;
    }

    let (prefix, line) = rest.split_at(prefix_len);
    masked.push_str(prefix);
    masked.push('-');
    masked.push_str(line);
    masked
}

pub fn is_complete_tax_id(masked: &str) -> bool {
    masked.len() == MASKED_TAX_ID_LEN && unmask(masked).len() == TAX_ID_DIGITS
}

pub fn is_complete_postal_code(value: &str) -> bool {
    unmask(value).len() == POSTAL_CODE_DIGITS
}

/// Verifies the two CPF check digits. Sequences of a single repeated digit pass
/// the arithmetic but are never issued, so they are rejected too.
pub fn tax_id_checksum_valid(value: &str) -> bool {
    let digits: Vec<u32> = unmask(value).chars().filter_map(|ch| ch.to_digit(10)).collect();
    if digits.len() != TAX_ID_DIGITS || digits.iter().all(|digit| *digit == digits[0]) {
        return false;
    }

    let check_digit = |len: usize| -> u32 {
        let weight_start = len as u32 + 1;
        let sum: u32 =
            digits[..len]
                .iter()
                .enumerate()
                .map(|(i, digit)| digit * (weight_start - i as u32))
                .sum();
        match (sum * 10) % 11 {
            10 => 0,
            remainder => remainder,
        }
    };

    check_digit(9) == digits[9] && check_digit(10) == digits[10]
}
