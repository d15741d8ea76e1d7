use ocadvisor::config::SamplingConfig;
use ocadvisor::services::llm::{GenerationError, OllamaClient, TextGenerator, EMPTY_RESPONSE_TEXT};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, model: &str) -> OllamaClient {
    OllamaClient::new(&server.uri(), model, SamplingConfig::default())
}

#[tokio::test]
async fn test_generate_posts_one_shot_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "llama3", "stream": false })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "  Core +100MHz  ", "done": true })),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Trailing slash on the base URL is tolerated.
    let client = OllamaClient::new(
        &format!("{}/", server.uri()),
        "llama3",
        SamplingConfig::default(),
    );
    let text = client.generate("hello").await.unwrap();
    assert_eq!(text, "Core +100MHz");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["prompt"], "hello");
    assert_eq!(body["stream"], false);
    assert_eq!(body["options"]["temperature"], 0.5);
    assert_eq!(body["options"]["num_ctx"], 4096);
    assert_eq!(body["options"]["top_k"], 40);
    assert_eq!(body["options"]["num_gpu"], -1);
}

#[tokio::test]
async fn test_missing_response_field_yields_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
        .mount(&server)
        .await;

    let client = client_for(&server, "llama3");
    assert_eq!(client.generate("hi").await.unwrap(), EMPTY_RESPONSE_TEXT);
}

#[tokio::test]
async fn test_404_is_model_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "model 'nope' not found" })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, "nope").generate("hi").await.unwrap_err();
    assert!(matches!(err, GenerationError::ModelNotFound(ref m) if m == "nope"));
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "out of memory" })))
        .mount(&server)
        .await;

    match client_for(&server, "llama3").generate("hi").await.unwrap_err() {
        GenerationError::Server { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert!(body.contains("out of memory"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server, "llama3").generate("hi").await.unwrap_err();
    assert!(matches!(err, GenerationError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    // Start and stop a server to get an address with nothing listening.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let client = OllamaClient::new(&uri, "llama3", SamplingConfig::default());
    let err = client.generate("hi").await.unwrap_err();
    assert!(matches!(err, GenerationError::Connection { .. }));
}
