use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::ApplicantFinancials;

/// Minimum score for pre-approval.
pub const APPROVAL_THRESHOLD: u8 = 60;
/// Share of annual revenue that caps the approved limit.
pub const REVENUE_LIMIT_SHARE: f64 = 0.3;
/// Monthly surcharge, in basis points, when no collateral is offered.
pub const NO_COLLATERAL_SURCHARGE_BPS: u32 = 50;

pub const APPROVED_MESSAGE: &str = "Parabéns! Sua análise de crédito foi pré-aprovada.";
pub const DENIED_MESSAGE: &str = "Infelizmente seu crédito não foi aprovado neste momento.";

/// Outcome of one pre-analysis. Built only by [`resolve`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditDecision {
    id: Uuid,
    score: u8,
    approved: bool,
    interest_rate_monthly: f64,
    interest_rate_annual: f64,
    approved_limit: f64,
    message: &'static str,
    evaluated_at: DateTime<Utc>,
}

impl CreditDecision {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn approved(&self) -> bool {
        self.approved
    }

    /// Monthly rate as a fraction (0.015 = 1.5% a.m.). Reported even when denied.
    pub fn interest_rate_monthly(&self) -> f64 {
        self.interest_rate_monthly
    }

    /// Effective annual rate `(1 + i)^12 - 1`.
    pub fn interest_rate_annual(&self) -> f64 {
        self.interest_rate_annual
    }

    /// Zero when not approved.
    pub fn approved_limit(&self) -> f64 {
        self.approved_limit
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }
}

/// Base monthly rate in basis points for a score band.
fn base_rate_bps(score: u8) -> u32 {
    if score >= 80 {
        100
    } else if score >= 70 {
        120
    } else if score >= 60 {
        150
    } else {
        180
    }
}

/// Monthly interest rate for `score`, with the surcharge when nothing secures the loan.
pub fn interest_rate(score: u8, no_collateral: bool) -> f64 {
    let surcharge = if no_collateral {
        NO_COLLATERAL_SURCHARGE_BPS
    } else {
        0
    };
    f64::from(base_rate_bps(score) + surcharge) / 10_000.0
}

/// Effective annual rate compounding a monthly one.
pub fn annual_rate(monthly_rate: f64) -> f64 {
    (1.0 + monthly_rate).powi(12) - 1.0
}

/// `min(requested, annual_revenue * 0.3)`, never negative.
pub fn approved_limit(requested_amount: f64, annual_revenue: f64) -> f64 {
    let cap = annual_revenue * REVENUE_LIMIT_SHARE;
    let limit = requested_amount.min(cap);
    if limit.is_finite() && limit > 0.0 {
        limit
    } else {
        0.0
    }
}

/// Turns a score into a decision for `financials`. Never fails.
pub fn resolve(financials: &ApplicantFinancials, score: u8) -> CreditDecision {
    let approved = score >= APPROVAL_THRESHOLD;
    let monthly = interest_rate(score, financials.offers_no_collateral());

    let limit = if approved {
        approved_limit(financials.requested_amount, financials.annual_revenue)
    } else {
        0.0
    };

    CreditDecision {
        id: Uuid::new_v4(),
        score,
        approved,
        interest_rate_monthly: monthly,
        interest_rate_annual: annual_rate(monthly),
        approved_limit: limit,
        message: if approved {
            APPROVED_MESSAGE
        } else {
            DENIED_MESSAGE
        },
        evaluated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_table() {
        assert_eq!(interest_rate(100, false), 0.01);
        assert_eq!(interest_rate(80, false), 0.01);
        assert_eq!(interest_rate(79, false), 0.012);
        assert_eq!(interest_rate(70, false), 0.012);
        assert_eq!(interest_rate(60, false), 0.015);
        assert_eq!(interest_rate(59, false), 0.018);
        assert_eq!(interest_rate(0, true), 0.023);
        assert_eq!(interest_rate(85, true), 0.015);
    }

    #[test]
    fn test_annual_rate() {
        let annual = annual_rate(0.01);
        assert!((annual - 0.126825).abs() < 1e-6);
    }

    #[test]
    fn test_approved_limit() {
        assert_eq!(approved_limit(100_000.0, 1_200_000.0), 100_000.0);
        assert_eq!(approved_limit(100_000.0, 200_000.0), 60_000.0);
        assert_eq!(approved_limit(100_000.0, 0.0), 0.0);
    }
}
