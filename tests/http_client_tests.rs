use athena_console::{
    ApiConfig, AthenaClient, ChannelManager, MemoryConnector, SessionOrchestrator, SubmitOutcome,
    WorkflowPhase,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: format!("{}/api/v1", server.uri()),
        ..ApiConfig::default()
    }
}

#[tokio::test]
async fn test_console_streams_workflow_started_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/stream"))
        .and(body_json(json!({
            "user_id": "user123",
            "session_id": "session1",
            "text": "hello"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflow_id": "w1",
            "websocket_url": "/ws/w1",
            "status": "started"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = api_config(&server);
    let client = Arc::new(AthenaClient::new(&config).unwrap());
    let (connector, mut channels) = MemoryConnector::pair();
    let channel = ChannelManager::new(Arc::new(connector), config.channel_base_url());
    let mut session = SessionOrchestrator::new(client, channel);

    let outcome = session.submit("hello", "user123", "session1").await;
    assert_eq!(
        outcome,
        SubmitOutcome::Started {
            workflow_id: "w1".to_string()
        }
    );

    let peer = channels.accept().await.unwrap();
    assert_eq!(peer.url(), format!("{}/ws/w1", config.channel_base_url()));
    assert!(peer.url().starts_with("ws://"));

    peer.push_json(&json!({
        "type": "workflow_complete",
        "workflow_id": "w1",
        "result": { "athena_response": "hi there", "crisis_mode": true, "metrics": {} }
    }));
    let done = session.wait_for_terminal().await;
    assert_eq!(done.phase, WorkflowPhase::Completed);
    assert!(done.session.crisis_mode());
}

#[tokio::test]
async fn test_backend_error_fails_the_session_with_status_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/stream"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = api_config(&server);
    let client = Arc::new(AthenaClient::new(&config).unwrap());
    let (connector, channels) = MemoryConnector::pair();
    let channel = ChannelManager::new(Arc::new(connector), config.channel_base_url());
    let mut session = SessionOrchestrator::new(client, channel);

    session.submit("hello", "user123", "session1").await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, WorkflowPhase::Failed);
    assert_eq!(
        snapshot.session.last_error.as_deref(),
        Some("request failed with status code 500")
    );
    assert!(channels.attempts().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:9/api/v1".to_string(),
        request_timeout_secs: 2,
        ..ApiConfig::default()
    };
    let client = AthenaClient::new(&config).unwrap();

    let err = client.research_metrics().await.unwrap_err();
    assert!(err.to_string().starts_with("network error"));
}
