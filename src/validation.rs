//! Field-level checks for pre-analysis input arriving over HTTP.
//!
//! The engine assumes clean input; this is the boundary that guarantees it.

use crate::errors::AppError;
use crate::models::{ApplicantFinancials, Collateral};
use crate::normalizer::TaxIdKind;

/// Smallest amount that can be requested (R$ 10.000,00).
pub const MIN_REQUESTED_AMOUNT: f64 = 10_000.0;

/// Terms offered, in months.
pub const ALLOWED_TERMS: [u32; 7] = [6, 12, 18, 24, 36, 48, 60];

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Lists every violated rule. Empty means valid.
pub fn violations(financials: &ApplicantFinancials) -> Vec<String> {
    let mut problems = Vec::new();

    if financials.legal_name.trim().is_empty() {
        problems.push("legal_name is required".to_string());
    }

    if financials.tax_id_kind().is_none() {
        problems.push(format!(
            "tax_id must have 11 (CPF) or 14 (CNPJ) digits, got {}",
            financials.tax_id_digits().len()
        ));
    }

    for (field, value) in [
        ("years_active", financials.years_active),
        ("annual_revenue", financials.annual_revenue),
        ("monthly_revenue", financials.monthly_revenue),
        ("current_debt", financials.current_debt),
    ] {
        if !non_negative(value) {
            problems.push(format!("{} must be a non-negative number", field));
        }
    }

    if !(financials.profit_margin_pct.is_finite()
        && (0.0..=100.0).contains(&financials.profit_margin_pct))
    {
        problems.push("profit_margin_pct must be between 0 and 100".to_string());
    }

    if !(financials.requested_amount.is_finite()
        && financials.requested_amount >= MIN_REQUESTED_AMOUNT)
    {
        problems.push(format!(
            "requested_amount must be at least {:.2}",
            MIN_REQUESTED_AMOUNT
        ));
    }

    if !ALLOWED_TERMS.contains(&financials.term_months) {
        problems.push(format!(
            "term_months must be one of {:?}",
            ALLOWED_TERMS
        ));
    }

    if financials.collateral.is_empty() {
        problems.push("collateral requires at least one option".to_string());
    } else if financials.collateral.len() > 1
        && financials.collateral.contains(&Collateral::NoCollateral)
    {
        problems.push("sem_garantia cannot be combined with other collateral".to_string());
    }

    problems
}

/// Rejects invalid financials with a `BadRequest` listing every violation.
pub fn validate_financials(financials: &ApplicantFinancials) -> Result<TaxIdKind, AppError> {
    let problems = violations(financials);
    if !problems.is_empty() {
        tracing::warn!("Rejected pre-analysis input: {}", problems.join("; "));
        return Err(AppError::BadRequest(problems.join("; ")));
    }

    financials
        .tax_id_kind()
        .ok_or_else(|| AppError::BadRequest("tax_id is invalid".to_string()))
}
