use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::future::Future;
use std::time::Duration;

use crate::analysis_models::{
    AnalysisFilter, AnalysisId, AnalysisPage, AnalysisResult, CreditAnalysis, ProposalId,
    StatusCheck,
};
use crate::circuit_breaker::{create_api_circuit_breaker, ApiCircuitBreaker};
use crate::config::Config;
use crate::errors::AppError;

/// Operations the credit analysis backend exposes.
///
/// The lifecycle tracker only talks to this trait, so tests can swap the
/// HTTP client for an in-memory fake.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Requests a new analysis for a proposal. The server creates it as `pending`.
    async fn submit_analysis(&self, proposal_id: ProposalId) -> Result<CreditAnalysis, AppError>;

    async fn get_analysis(&self, analysis_id: AnalysisId) -> Result<CreditAnalysis, AppError>;

    /// Status probe used by polling.
    async fn get_analysis_status(&self, analysis_id: AnalysisId) -> Result<StatusCheck, AppError>;

    async fn list_analyses(&self, filter: &AnalysisFilter) -> Result<Vec<CreditAnalysis>, AppError>;

    /// Privileged manual override of the bureau result.
    async fn update_analysis_result(
        &self,
        analysis_id: AnalysisId,
        result: AnalysisResult,
    ) -> Result<CreditAnalysis, AppError>;
}

/// Client for the credit analysis REST API.
#[derive(Clone)]
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    breaker: ApiCircuitBreaker,
}

impl HttpAnalysisClient {
    /// Creates a new `HttpAnalysisClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the analysis API, without trailing slash.
    /// * `token` - Bearer token for authentication.
    /// * `timeout` - Per-request timeout; the only timeout status checks get.
    pub fn new(base_url: String, token: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create analysis client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            breaker: create_api_circuit_breaker(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.analysis_api_base_url.clone(),
            config.analysis_api_token.clone(),
            config.api_timeout(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/credit-analysis/analyses/{}", self.base_url, path)
    }

    /// Runs `call` through the circuit breaker; a rejection becomes a transport error.
    ///
    /// Only transport failures count against the breaker. A 404 or a request
    /// the server refused as invalid says nothing about its health.
    async fn guarded<T, F>(&self, operation: &str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match self.breaker.call_with(is_breaker_failure, call).await {
            Ok(value) => Ok(value),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("Circuit open, rejected {} call to analysis API", operation);
                Err(AppError::ExternalApiError(format!(
                    "{} rejected: analysis API circuit open",
                    operation
                )))
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, AppError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("{}: analysis not found", operation)));
        }
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::CONFLICT
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::BadRequest(format!(
                "{} refused by analysis API: {}",
                operation, error_text
            )));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "{} returned {}: {}",
                operation, status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse {} response: {}", operation, e))
        })
    }
}

fn is_breaker_failure(err: &AppError) -> bool {
    err.is_transport()
}

#[async_trait]
impl AnalysisApi for HttpAnalysisClient {
    async fn submit_analysis(&self, proposal_id: ProposalId) -> Result<CreditAnalysis, AppError> {
        let url = self.url("");
        tracing::info!("Requesting credit analysis for proposal {}", proposal_id);

        self.guarded("submit_analysis", async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&json!({ "proposal_id": proposal_id }))
                .send()
                .await
                .map_err(|e| {
                    AppError::ExternalApiError(format!("Analysis request failed: {}", e))
                })?;

            let analysis: CreditAnalysis = Self::read_json(response, "submit_analysis").await?;
            tracing::info!(
                "✓ Analysis {} created for proposal {} ({})",
                analysis.id,
                proposal_id,
                analysis.status.as_str()
            );
            Ok(analysis)
        })
        .await
    }

    async fn get_analysis(&self, analysis_id: AnalysisId) -> Result<CreditAnalysis, AppError> {
        let url = self.url(&format!("{}/", analysis_id));
        tracing::debug!("Fetching analysis {}", analysis_id);

        self.guarded("get_analysis", async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| AppError::ExternalApiError(format!("Analysis fetch failed: {}", e)))?;

            Self::read_json(response, "get_analysis").await
        })
        .await
    }

    async fn get_analysis_status(&self, analysis_id: AnalysisId) -> Result<StatusCheck, AppError> {
        let url = self.url(&format!("{}/check_status/", analysis_id));
        tracing::debug!("Checking status of analysis {}", analysis_id);

        self.guarded("check_status", async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| AppError::ExternalApiError(format!("Status check failed: {}", e)))?;

            Self::read_json(response, "check_status").await
        })
        .await
    }

    async fn list_analyses(&self, filter: &AnalysisFilter) -> Result<Vec<CreditAnalysis>, AppError> {
        let url = self.url("");
        tracing::debug!("Listing analyses with filter {:?}", filter);

        self.guarded("list_analyses", async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .query(filter)
                .send()
                .await
                .map_err(|e| AppError::ExternalApiError(format!("Analysis listing failed: {}", e)))?;

            let page: AnalysisPage = Self::read_json(response, "list_analyses").await?;
            if page.next.is_some() {
                tracing::debug!(
                    "Analysis listing has more pages ({:?} total); using first page",
                    page.count
                );
            }
            Ok(page.results)
        })
        .await
    }

    async fn update_analysis_result(
        &self,
        analysis_id: AnalysisId,
        result: AnalysisResult,
    ) -> Result<CreditAnalysis, AppError> {
        let url = self.url(&format!("{}/update_result/", analysis_id));
        tracing::info!(
            "Overriding result of analysis {} to {}",
            analysis_id,
            result.as_str()
        );

        self.guarded("update_result", async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&json!({ "result": result }))
                .send()
                .await
                .map_err(|e| AppError::ExternalApiError(format!("Result update failed: {}", e)))?;

            Self::read_json(response, "update_result").await
        })
        .await
    }
}
