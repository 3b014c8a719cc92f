use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Server-side id of a credit analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(pub i64);

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of the credit proposal an analysis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub i64);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status, driven by the server only.
///
/// `Pending -> Processing -> {Completed, Failed, Expired}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Expired,
}

impl AnalysisStatus {
    /// Completed, failed and expired admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisStatus::Completed | AnalysisStatus::Failed | AnalysisStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
            AnalysisStatus::Expired => "expired",
        }
    }
}

/// Bureau verdict, present only once the analysis completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisResult {
    Approved,
    Denied,
    ManualReview,
    InsufficientData,
}

impl AnalysisResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisResult::Approved => "approved",
            AnalysisResult::Denied => "denied",
            AnalysisResult::ManualReview => "manual_review",
            AnalysisResult::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalRef {
    pub id: ProposalId,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionType {
    Financial,
    Protest,
    Lawsuit,
    Bankruptcy,
    Default,
    #[serde(other)]
    Other,
}

/// Adverse finding reported by the bureau.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRestriction {
    pub id: i64,
    pub restriction_type: RestrictionType,
    pub description: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub creditor: Option<String>,
    /// Date as sent by the bureau (not always a full timestamp).
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub details: Value,
}

/// Audit trail entry on an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditEvent {
    pub id: i64,
    pub event_type: String,
    #[serde(default)]
    pub details: Value,
    #[serde(default)]
    pub user: Option<UserRef>,
    pub created_at: DateTime<Utc>,
}

/// A requested third-party credit analysis, as the server reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAnalysis {
    pub id: AnalysisId,
    pub proposal: ProposalRef,
    #[serde(default)]
    pub reference_id: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub result: Option<AnalysisResult>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub requested_by: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// In the order the bureau reported them.
    #[serde(default)]
    pub restrictions: Vec<CreditRestriction>,
    #[serde(default)]
    pub events: Vec<CreditEvent>,
}

impl CreditAnalysis {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Result, but only when the status says completed.
    pub fn outcome(&self) -> Option<AnalysisResult> {
        match self.status {
            AnalysisStatus::Completed => self.result,
            _ => None,
        }
    }
}

/// Response of the status probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCheck {
    pub status: AnalysisStatus,
    pub analysis: CreditAnalysis,
}

/// Filters accepted by the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<ProposalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AnalysisStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
}

impl AnalysisFilter {
    pub fn for_proposal(proposal_id: ProposalId) -> Self {
        Self {
            proposal_id: Some(proposal_id),
            ..Self::default()
        }
    }
}

/// Paginated list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisPage {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<CreditAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_record() {
        let json = serde_json::json!({
            "id": 1,
            "proposal": {"id": 123, "title": "Proposta de Teste"},
            "reference_id": "ABC123",
            "status": "completed",
            "result": "approved",
            "score": 750,
            "risk_level": "low",
            "requested_by": {"id": 1, "name": "João Silva"},
            "created_at": "2023-01-15T10:30:00Z",
            "updated_at": "2023-01-15T10:35:00Z",
            "completed_at": "2023-01-15T10:35:00Z",
            "restrictions": [{
                "id": 9,
                "restriction_type": "protest",
                "description": "Protesto em cartório",
                "value": 1500.0,
                "creditor": "Banco X",
                "date": "2022-11-02",
                "details": {}
            }],
            "events": []
        });

        let analysis: CreditAnalysis = serde_json::from_value(json).unwrap();
        assert_eq!(analysis.id, AnalysisId(1));
        assert_eq!(analysis.proposal.id, ProposalId(123));
        assert!(analysis.is_terminal());
        assert_eq!(analysis.outcome(), Some(AnalysisResult::Approved));
        assert_eq!(analysis.restrictions[0].restriction_type, RestrictionType::Protest);
    }

    #[test]
    fn test_result_hidden_until_completed() {
        let json = serde_json::json!({
            "id": 2,
            "proposal": {"id": 5},
            "status": "processing",
            "result": "denied",
            "created_at": "2023-01-15T10:30:00Z"
        });
        let analysis: CreditAnalysis = serde_json::from_value(json).unwrap();
        assert!(!analysis.is_terminal());
        assert_eq!(analysis.outcome(), None);
    }

    #[test]
    fn test_unknown_restriction_type_is_other() {
        let parsed: RestrictionType = serde_json::from_str("\"cheque\"").unwrap();
        assert_eq!(parsed, RestrictionType::Other);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!AnalysisStatus::Pending.is_terminal());
        assert!(!AnalysisStatus::Processing.is_terminal());
        assert!(AnalysisStatus::Completed.is_terminal());
        assert!(AnalysisStatus::Failed.is_terminal());
        assert!(AnalysisStatus::Expired.is_terminal());
    }
}
