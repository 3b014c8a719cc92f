//! Rule-based creditworthiness score.
//!
//! Five independent factors each contribute a fixed number of points; the sum
//! is clamped to [`MAX_SCORE`]. The table is deterministic and has no hidden
//! inputs, so the same financials always produce the same score.

use serde::{Deserialize, Serialize};

use crate::models::{ApplicantFinancials, CreditHistory};

/// Upper bound of the score scale.
pub const MAX_SCORE: u8 = 100;

/// Factor a score component was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    YearsActive,
    AnnualRevenue,
    ProfitMargin,
    RequestedToRevenue,
    CreditHistory,
}

impl ScoreFactor {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreFactor::YearsActive => "Tempo de atividade",
            ScoreFactor::AnnualRevenue => "Faturamento anual",
            ScoreFactor::ProfitMargin => "Margem de lucro",
            ScoreFactor::RequestedToRevenue => "Valor solicitado/faturamento",
            ScoreFactor::CreditHistory => "Histórico de crédito",
        }
    }
}

/// Points awarded by one factor, with a short audit note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: u8,
    pub note: String,
}

/// Per-factor contributions plus the clamped total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub components: Vec<ScoreComponent>,
    pub total: u8,
}

/// Computes the 0-100 score for `financials`.
pub fn compute_score(financials: &ApplicantFinancials) -> u8 {
    score_breakdown(financials).total
}

/// Computes every factor's contribution and the clamped total.
pub fn score_breakdown(financials: &ApplicantFinancials) -> ScoreBreakdown {
    let mut components = Vec::with_capacity(5);

    components.push(ScoreComponent {
        factor: ScoreFactor::YearsActive,
        points: years_active_points(financials.years_active),
        note: format!("{} years active", financials.years_active),
    });

    components.push(ScoreComponent {
        factor: ScoreFactor::AnnualRevenue,
        points: annual_revenue_points(financials.annual_revenue),
        note: format!("annual revenue {:.2}", financials.annual_revenue),
    });

    components.push(ScoreComponent {
        factor: ScoreFactor::ProfitMargin,
        points: profit_margin_points(financials.profit_margin_pct),
        note: format!("profit margin {}%", financials.profit_margin_pct),
    });

    let ratio = requested_to_revenue_ratio(financials.requested_amount, financials.annual_revenue);
    components.push(ScoreComponent {
        factor: ScoreFactor::RequestedToRevenue,
        points: ratio_points(ratio),
        note: match ratio {
            Some(r) => format!("requested/revenue ratio {:.3}", r),
            None => "requested/revenue ratio undefined (no revenue)".to_string(),
        },
    });

    components.push(ScoreComponent {
        factor: ScoreFactor::CreditHistory,
        points: credit_history_points(financials.credit_history),
        note: format!("credit history {:?}", financials.credit_history).to_lowercase(),
    });

    let sum: u32 = components.iter().map(|c| u32::from(c.points)).sum();
    let total = sum.min(u32::from(MAX_SCORE)) as u8;

    ScoreBreakdown { components, total }
}

fn years_active_points(years: f64) -> u8 {
    if years > 5.0 {
        20
    } else if years > 2.0 {
        15
    } else if years > 1.0 {
        10
    } else {
        5
    }
}

fn annual_revenue_points(revenue: f64) -> u8 {
    if revenue > 1_000_000.0 {
        20
    } else if revenue > 500_000.0 {
        15
    } else if revenue > 100_000.0 {
        10
    } else {
        5
    }
}

fn profit_margin_points(margin_pct: f64) -> u8 {
    if margin_pct > 30.0 {
        20
    } else if margin_pct > 20.0 {
        15
    } else if margin_pct > 10.0 {
        10
    } else {
        5
    }
}

/// `None` when revenue is zero, negative or not finite.
pub fn requested_to_revenue_ratio(requested: f64, annual_revenue: f64) -> Option<f64> {
    if !annual_revenue.is_finite() || annual_revenue <= 0.0 {
        return None;
    }
    let ratio = requested / annual_revenue;
    ratio.is_finite().then_some(ratio)
}

fn ratio_points(ratio: Option<f64>) -> u8 {
    match ratio {
        Some(r) if r < 0.10 => 15,
        Some(r) if r < 0.20 => 10,
        Some(r) if r < 0.30 => 5,
        _ => 0,
    }
}

fn credit_history_points(history: CreditHistory) -> u8 {
    match history {
        CreditHistory::Excellent => 25,
        CreditHistory::Good => 20,
        CreditHistory::Regular => 10,
        CreditHistory::Poor => 0,
        CreditHistory::None => 5,
    }
}
