use serde::{Deserialize, Serialize};

use crate::models::ApplicantFinancials;

/// Share of monthly payment capacity an installment may take.
pub const MAX_CAPACITY_SHARE: f64 = 0.30;

/// Monthly amount left for a new installment:
/// `max(0, monthly_revenue * margin% - current_debt)`.
pub fn monthly_capacity(monthly_revenue: f64, profit_margin_pct: f64, current_debt: f64) -> f64 {
    let capacity = monthly_revenue * (profit_margin_pct / 100.0) - current_debt;
    if capacity.is_finite() && capacity > 0.0 {
        capacity
    } else {
        0.0
    }
}

/// Amortized (Price table) installment `PV * i(1+i)^n / ((1+i)^n - 1)`.
///
/// Returns 0 whenever the formula does not produce a finite number, which
/// covers `n = 0`, `i = 0`, terms beyond `i32::MAX` and overflow of `(1+i)^n`.
pub fn installment(requested_amount: f64, term_months: u32, monthly_rate: f64) -> f64 {
    let exponent = match i32::try_from(term_months) {
        Ok(n) if n > 0 => n,
        _ => return 0.0,
    };

    let growth = (1.0 + monthly_rate).powi(exponent);
    let payment = requested_amount * (monthly_rate * growth) / (growth - 1.0);

    if payment.is_finite() {
        payment
    } else {
        0.0
    }
}

/// True iff the installment fits within 30% of the capacity.
pub fn is_affordable(installment_amount: f64, capacity: f64) -> bool {
    installment_amount <= capacity * MAX_CAPACITY_SHARE
}

/// Affordability verdict for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityAssessment {
    pub monthly_capacity: f64,
    pub installment: f64,
    /// Largest installment the capacity allows.
    pub max_installment: f64,
    pub monthly_rate: f64,
    pub affordable: bool,
}

/// Runs capacity, installment and viability for `financials` at `monthly_rate`.
pub fn assess(financials: &ApplicantFinancials, monthly_rate: f64) -> AffordabilityAssessment {
    let capacity = monthly_capacity(
        financials.monthly_revenue,
        financials.profit_margin_pct,
        financials.current_debt,
    );
    let payment = installment(financials.requested_amount, financials.term_months, monthly_rate);

    AffordabilityAssessment {
        monthly_capacity: capacity,
        installment: payment,
        max_installment: capacity * MAX_CAPACITY_SHARE,
        monthly_rate,
        affordable: is_affordable(payment, capacity),
    }
}
