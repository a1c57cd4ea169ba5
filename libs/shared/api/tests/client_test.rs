use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_api::CrisisApiClient;
use shared_config::ClientConfig;
use shared_models::ClientError;

async fn client_for(server: &MockServer) -> CrisisApiClient {
    let config = ClientConfig {
        api_url: server.uri(),
        api_token: "test-token".to_string(),
        ..ClientConfig::default()
    };
    CrisisApiClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_get_sends_bearer_and_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "role": "doctor"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let body: Value = client.get("/api/auth/me", Some("test-token")).await.unwrap();
    assert_eq!(body["id"], 3);
}

#[tokio::test]
async fn test_coded_error_becomes_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/appointments/book"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": "time_conflict", "detail": "Overlaps another booking"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .post::<Value>("/api/appointments/book", Some("test-token"), json!({}))
        .await
        .unwrap_err();

    match err {
        ClientError::Rejected { status, code, detail } => {
            assert_eq!(status, 409);
            assert_eq!(code, "time_conflict");
            assert_eq!(detail.as_deref(), Some("Overlaps another booking"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_without_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/appointments/mine"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get::<Value>("/api/appointments/mine", None).await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_unexpected_payload_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/appointments/mine"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get::<Vec<Value>>("/api/appointments/mine", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}
