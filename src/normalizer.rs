//! Cleaning and formatting of raw identifiers and currency-like strings.
//!
//! Everything here is pure and total: malformed input degrades to an empty
//! digit string or `"0.00"`, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CPF_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{11}$").unwrap());
static CNPJ_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{14}$").unwrap());

/// Brazilian tax id class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxIdKind {
    /// Natural person, 11 digits.
    Cpf,
    /// Organization, 14 digits.
    Cnpj,
}

impl TaxIdKind {
    /// Classifies an already normalized digit string by its length pattern.
    ///
    /// Check digits are not verified.
    pub fn classify(digits: &str) -> Option<TaxIdKind> {
        if CPF_PATTERN.is_match(digits) {
            Some(TaxIdKind::Cpf)
        } else if CNPJ_PATTERN.is_match(digits) {
            Some(TaxIdKind::Cnpj)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxIdKind::Cpf => "cpf",
            TaxIdKind::Cnpj => "cnpj",
        }
    }
}

/// Strips every non-digit character. Does not validate length or checksum.
pub fn normalize_tax_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Reads the digits of `raw` as a cent amount and renders it with two decimals.
///
/// `"R$ 1.234,56"` becomes `"1234.56"`. The function is lossy: any value not
/// carrying exactly two decimals is reinterpreted as cents (`"1500"` becomes
/// `"15.00"`, `"10.5"` becomes `"1.05"`). Keep amounts numeric and format once,
/// at the presentation boundary.
pub fn format_currency_input(raw: &str) -> String {
    let digits = normalize_tax_id(raw);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return "0.00".to_string();
    }

    // Work on the digit string directly so arbitrarily long input cannot overflow.
    let padded = format!("{:0>3}", trimmed);
    let (units, cents) = padded.split_at(padded.len() - 2);
    format!("{}.{}", units, cents)
}

/// Progressive CNPJ mask `00.000.000/0000-00`, applied to whatever prefix of
/// digits is present. Digits beyond the 14th are dropped.
pub fn format_cnpj(raw: &str) -> String {
    let digits: String = normalize_tax_id(raw).chars().take(14).collect();
    let len = digits.len();

    if len > 12 {
        format!(
            "{}.{}.{}/{}-{}",
            &digits[..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..]
        )
    } else if len > 8 {
        format!(
            "{}.{}.{}/{}",
            &digits[..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..]
        )
    } else if len > 5 {
        format!("{}.{}.{}", &digits[..2], &digits[2..5], &digits[5..])
    } else if len > 2 {
        format!("{}.{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

/// CPF mask `000.000.000-00`. Returns the bare digits when not exactly 11.
pub fn format_cpf(raw: &str) -> String {
    let digits = normalize_tax_id(raw);
    if digits.len() != 11 {
        return digits;
    }
    format!(
        "{}.{}.{}-{}",
        &digits[..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..]
    )
}

/// Renders an amount the pt-BR way: `R$ 1.234.567,89`.
pub fn format_brl(amount: f64) -> String {
    if !amount.is_finite() {
        return "R$ 0,00".to_string();
    }

    let total_cents = (amount.abs() * 100.0).round() as u64;
    let units = (total_cents / 100).to_string();
    let cents = total_cents % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, c) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && total_cents > 0 { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, cents)
}
