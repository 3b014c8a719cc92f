//! Pre-analysis pipeline: score, resolve, check affordability.

use serde::Serialize;

use crate::affordability::{self, AffordabilityAssessment};
use crate::decision::{self, CreditDecision};
use crate::models::ApplicantFinancials;
use crate::scoring::{self, ScoreBreakdown};

/// Everything the presentation layer needs to render one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct PreAnalysisReport {
    pub decision: CreditDecision,
    pub affordability: AffordabilityAssessment,
    pub breakdown: ScoreBreakdown,
}

/// Stateless evaluator over already validated financials.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreAnalysisEngine;

impl PreAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Scores `financials`, resolves the decision and checks the installment
    /// at the resolved monthly rate.
    pub fn evaluate(&self, financials: &ApplicantFinancials) -> PreAnalysisReport {
        let breakdown = scoring::score_breakdown(financials);
        let decision = decision::resolve(financials, breakdown.total);
        let affordability =
            affordability::assess(financials, decision.interest_rate_monthly());

        tracing::info!(
            decision_id = %decision.id(),
            score = decision.score(),
            approved = decision.approved(),
            rate = decision.interest_rate_monthly(),
            affordable = affordability.affordable,
            "Pre-analysis evaluated"
        );
        if decision.approved() && !affordability.affordable {
            tracing::debug!(
                "Installment {:.2} exceeds {:.2} allowed by capacity",
                affordability.installment,
                affordability.max_installment
            );
        }

        PreAnalysisReport {
            decision,
            affordability,
            breakdown,
        }
    }
}
