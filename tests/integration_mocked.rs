/// Integration tests with a mocked credit analysis API
/// Exercises the HTTP client contract without hitting the real bureau backend
use rust_credit_api::analysis_client::{AnalysisApi, HttpAnalysisClient};
use rust_credit_api::analysis_models::{
    AnalysisFilter, AnalysisId, AnalysisResult, AnalysisStatus, ProposalId,
};
use rust_credit_api::errors::AppError;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create a client pointed at the mock server
fn create_test_client(base_url: String) -> HttpAnalysisClient {
    HttpAnalysisClient::new(base_url, "test_token".to_string(), Duration::from_secs(5))
        .expect("client builds")
}

fn analysis_json(id: i64, status: &str, result: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "proposal": {"id": 123, "title": "Capital de giro"},
        "reference_id": format!("REF{}", id),
        "status": status,
        "result": result,
        "score": result.map(|_| 720),
        "risk_level": null,
        "requested_by": {"id": 1, "name": "Analista"},
        "created_at": "2024-03-01T12:00:00Z",
        "updated_at": null,
        "completed_at": null,
        "restrictions": [],
        "events": []
    })
}

#[tokio::test]
async fn test_submit_analysis_posts_proposal_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/credit-analysis/analyses/"))
        .and(header("authorization", "Bearer test_token"))
        .and(body_json(serde_json::json!({"proposal_id": 123})))
        .respond_with(ResponseTemplate::new(201).set_body_json(analysis_json(7, "pending", None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let analysis = client.submit_analysis(ProposalId(123)).await.unwrap();

    assert_eq!(analysis.id, AnalysisId(7));
    assert_eq!(analysis.status, AnalysisStatus::Pending);
    assert_eq!(analysis.result, None);
}

#[tokio::test]
async fn test_check_status_parses_envelope() {
    let mock_server = MockServer::start().await;

    let body = serde_json::json!({
        "status": "completed",
        "analysis": analysis_json(7, "completed", Some("manual_review"))
    });

    Mock::given(method("GET"))
        .and(path("/credit-analysis/analyses/7/check_status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let check = client.get_analysis_status(AnalysisId(7)).await.unwrap();

    assert_eq!(check.status, AnalysisStatus::Completed);
    assert_eq!(check.analysis.outcome(), Some(AnalysisResult::ManualReview));
    assert_eq!(check.analysis.score, Some(720));
}

#[tokio::test]
async fn test_list_analyses_sends_filters() {
    let mock_server = MockServer::start().await;

    let body = serde_json::json!({
        "count": 2,
        "next": null,
        "results": [
            analysis_json(9, "processing", None),
            analysis_json(4, "failed", None)
        ]
    });

    Mock::given(method("GET"))
        .and(path("/credit-analysis/analyses/"))
        .and(query_param("proposal_id", "123"))
        .and(query_param("status", "processing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let filter = AnalysisFilter {
        status: Some(AnalysisStatus::Processing),
        ..AnalysisFilter::for_proposal(ProposalId(123))
    };
    let analyses = client.list_analyses(&filter).await.unwrap();

    assert_eq!(analyses.len(), 2);
    assert_eq!(analyses[0].id, AnalysisId(9));
    assert!(analyses[1].is_terminal());
}

#[tokio::test]
async fn test_update_result_posts_override() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/credit-analysis/analyses/7/update_result/"))
        .and(body_json(serde_json::json!({"result": "approved"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(analysis_json(7, "completed", Some("approved"))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let analysis = client
        .update_analysis_result(AnalysisId(7), AnalysisResult::Approved)
        .await
        .unwrap();

    assert_eq!(analysis.outcome(), Some(AnalysisResult::Approved));
}

#[tokio::test]
async fn test_get_analysis_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credit-analysis/analyses/404/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"detail": "Not found."})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let err = client.get_analysis(AnalysisId(404)).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/credit-analysis/analyses/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("bureau offline"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let err = client.submit_analysis(ProposalId(123)).await.unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("bureau offline"));
}

#[tokio::test]
async fn test_malformed_body_is_transport_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credit-analysis/analyses/7/check_status/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let err = client.get_analysis_status(AnalysisId(7)).await.unwrap_err();

    assert!(err.is_transport());
}

#[tokio::test]
async fn test_circuit_opens_after_repeated_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credit-analysis/analyses/7/check_status/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    for _ in 0..5 {
        assert!(client.get_analysis_status(AnalysisId(7)).await.is_err());
    }

    // Rejected without reaching the server
    let err = client.get_analysis_status(AnalysisId(7)).await.unwrap_err();
    assert!(err.is_transport());
    assert!(err.to_string().contains("circuit open"));
}

#[tokio::test]
async fn test_not_found_does_not_open_circuit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credit-analysis/analyses/999/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(6)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/credit-analysis/analyses/1/check_status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "processing",
            "analysis": analysis_json(1, "processing", None)
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    for _ in 0..6 {
        let err = client.get_analysis(AnalysisId(999)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    let check = client.get_analysis_status(AnalysisId(1)).await.unwrap();
    assert_eq!(check.status, AnalysisStatus::Processing);
}

#[tokio::test]
async fn test_refused_request_does_not_open_circuit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/credit-analysis/analyses/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"proposal_id": ["Invalid pk."]})),
        )
        .expect(6)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    for _ in 0..6 {
        let err = client.submit_analysis(ProposalId(404)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(!err.is_transport());
    }
}
