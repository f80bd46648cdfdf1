#[cfg(test)]
mod tests {
    use crate::config::ApiConfig;
    use crate::http::{AthenaClient, ApiError, StartRequest};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AthenaClient {
        let config = ApiConfig {
            base_url: format!("{}/api/v1/", server.uri()),
            requests_per_second: 50,
            burst: 50,
            cache_ttl_secs: 60,
            ..ApiConfig::default()
        };
        AthenaClient::new(&config).unwrap()
    }

    fn hello() -> StartRequest {
        StartRequest {
            user_id: "user123".to_string(),
            session_id: "session1".to_string(),
            text: "hello".to_string(),
        }
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = ApiConfig {
            base_url: "localhost:8000".to_string(),
            ..ApiConfig::default()
        };
        let err = AthenaClient::new(&config).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_start_workflow_posts_identity_and_returns_ticket() {
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

        let ticket = client_for(&server).start_workflow(&hello()).await.unwrap();
        assert_eq!(ticket.workflow_id, "w1");
        assert_eq!(ticket.websocket_url.as_deref(), Some("/ws/w1"));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).start_workflow(&hello()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "request failed with status code 500");
    }

    #[tokio::test]
    async fn test_malformed_ticket_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "started" })))
            .mount(&server)
            .await;

        let err = client_for(&server).start_workflow(&hello()).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_send_message_returns_full_interaction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_id": "user123",
                "session_id": "session1",
                "user_input": "hello",
                "athena_response": "hi there",
                "workflow_steps": [
                    { "step_number": 1, "step_name": "emotion_analysis", "status": "completed" }
                ],
                "crisis_mode": false
            })))
            .mount(&server)
            .await;

        let response = client_for(&server).send_message(&hello()).await.unwrap();
        assert_eq!(response.athena_response, "hi there");
        assert_eq!(response.workflow_steps.len(), 1);
        assert_eq!(response.workflow_steps[0].display_name(), "Emotion Analysis");
    }

    #[tokio::test]
    async fn test_ego_state_is_cached_until_reset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/ego/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ego_strength": 0.7,
                "ego_fragility": 0.3,
                "consistency": 0.9,
                "evolution_trend": "stable",
                "dimensions": { "self_esteem": { "value": 0.6 } }
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/ego/reset"))
            .and(body_json(json!({ "initial_strength": 0.5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "reset" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let first = client.ego_state().await.unwrap();
        let second = client.ego_state().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.dimensions["self_esteem"]["value"], 0.6);

        let reset = client.reset_ego(Some(0.5)).await.unwrap();
        assert_eq!(reset.status, "reset");

        client.ego_state().await.unwrap();
    }

    #[tokio::test]
    async fn test_metrics_cache_can_be_cleared() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ego_metrics": { "strength": 0.7 },
                "interaction_count": 3
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.metrics().await.unwrap().interaction_count, 3);
        assert_eq!(client.metrics().await.unwrap().interaction_count, 3);
        client.clear_cache().await;
        assert_eq!(client.metrics().await.unwrap().interaction_count, 3);
    }
}
