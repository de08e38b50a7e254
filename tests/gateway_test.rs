//! Functional tests for the gateway dispatch flows, using a wiremock Ollama

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modelhub_gateway::{
    backend::OllamaClient,
    classifier::{ClassifierEngine, ClassifierHandle, EngineError, EngineLoader, Prediction},
    config::Settings,
    gateway::{health::HealthAggregator, routes::create_router},
    AppState,
};

struct StubEngine;

#[async_trait]
impl ClassifierEngine for StubEngine {
    fn model_id(&self) -> &str {
        "stub/classifier"
    }

    async fn classify(
        &self,
        _image: image::RgbImage,
    ) -> Result<Vec<Prediction>, EngineError> {
        Ok(vec![
            Prediction {
                label: "tabby".to_string(),
                score: 0.91,
            },
            Prediction {
                label: "tiger cat".to_string(),
                score: 0.06,
            },
        ])
    }
}

struct StubLoader;

#[async_trait]
impl EngineLoader for StubLoader {
    async fn load(&self) -> Result<Arc<dyn ClassifierEngine>, EngineError> {
        Ok(Arc::new(StubEngine))
    }
}

fn test_settings(base_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.ollama.base_url = base_url.to_string();
    settings.ollama.timeout_secs = 1;
    settings.health.timeout_secs = 1;
    settings
}

/// Build an app whose classifier seam is a stub, against the given Ollama URL
fn test_app(base_url: &str) -> (Router, Arc<ClassifierHandle>) {
    let settings = test_settings(base_url);
    let ollama = OllamaClient::new(&settings.ollama).unwrap();
    let classifier = Arc::new(ClassifierHandle::new(Box::new(StubLoader)));
    let health =
        HealthAggregator::new(&settings.ollama, &settings.health, classifier.clone()).unwrap();

    let state = Arc::new(AppState {
        settings,
        ollama,
        classifier: classifier.clone(),
        health,
    });
    (create_router(state), classifier)
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn multipart_request(uri: &str, content_type: &str, payload: &[u8]) -> Request<Body> {
    let boundary = "test-upload-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn solid_color_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(64, 64, image::Rgb([200, 40, 40]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageOutputFormat::Jpeg(90))
        .unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_generate_uses_default_model_and_echoes_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "deepseek-r1:8b",
            "prompt": "hello",
            "stream": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "hi there",
            "done": true,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _) = test_app(&server.uri());
    let response = app
        .oneshot(json_request(
            "/api/v1/generate/text",
            serde_json::json!({"prompt": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["text"], "hi there");
    assert_eq!(body["model"], "deepseek-r1:8b");
}

#[tokio::test]
async fn test_generate_forwards_explicit_model_and_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3",
            "options": {"num_predict": 64},
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "ok"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (app, _) = test_app(&server.uri());
    let response = app
        .oneshot(json_request(
            "/api/v1/generate/text",
            serde_json::json!({"prompt": "hello", "model": "llama3", "max_tokens": 64}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["model"], "llama3");
}

#[tokio::test]
async fn test_generate_missing_response_field_is_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"done": true})))
        .mount(&server)
        .await;

    let (app, _) = test_app(&server.uri());
    let response = app
        .oneshot(json_request(
            "/api/v1/generate/text",
            serde_json::json!({"prompt": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["text"], "");
}

#[tokio::test]
async fn test_generate_upstream_error_passes_detail_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let (app, _) = test_app(&server.uri());
    let response = app
        .oneshot(json_request(
            "/api/v1/generate/text",
            serde_json::json!({"prompt": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "upstream_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_generate_timeout_yields_gateway_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"response": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let (app, _) = test_app(&server.uri());
    let response = app
        .oneshot(json_request(
            "/api/v1/generate/text",
            serde_json::json!({"prompt": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = response_json(response).await;
    assert_eq!(body["error"]["type"], "timeout_error");
}

#[tokio::test]
async fn test_generate_unreachable_backend() {
    // Nothing listens here.
    let (app, _) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(json_request(
            "/api/v1/generate/text",
            serde_json::json!({"prompt": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "backend_unreachable");
}

#[tokio::test]
async fn test_analyze_rejects_non_image_without_touching_classifier() {
    let (app, classifier) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(multipart_request(
            "/api/v1/analyze/image",
            "text/plain",
            b"not an image",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!classifier.is_loaded());
}

#[tokio::test]
async fn test_analyze_rejects_undecodable_image_bytes() {
    let (app, classifier) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(multipart_request(
            "/api/v1/analyze/image",
            "image/jpeg",
            b"definitely not jpeg bytes",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!classifier.is_loaded());
}

#[tokio::test]
async fn test_analyze_missing_file_field() {
    let (app, _) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/analyze/image")
                .header(CONTENT_TYPE, "multipart/form-data; boundary=empty")
                .body(Body::from("--empty--\r\n"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_round_trip_returns_predictions() {
    let (app, classifier) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(multipart_request(
            "/api/v1/analyze/image",
            "image/jpeg",
            &solid_color_jpeg(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["model"], "stub/classifier");

    let predictions = body["predictions"].as_array().unwrap();
    assert!(!predictions.is_empty());
    for prediction in predictions {
        assert!(prediction["label"].is_string());
        let score = prediction["score"].as_f64().unwrap();
        assert!(score.is_finite());
    }

    assert!(classifier.is_loaded());
}

#[tokio::test]
async fn test_health_healthy_when_probe_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})),
        )
        .mount(&server)
        .await;

    let (app, _) = test_app(&server.uri());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ollama_available"], true);
    assert_eq!(body["image_model_loaded"], false);
}

#[tokio::test]
async fn test_health_degraded_on_probe_failure_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (app, _) = test_app(&server.uri());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = response_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["ollama_available"], false);
}

#[tokio::test]
async fn test_health_degraded_when_backend_unreachable() {
    let (app, _) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = response_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["ollama_available"], false);
}

#[tokio::test]
async fn test_root_lists_capability_endpoints() {
    let (app, _) = test_app("http://127.0.0.1:9");
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["endpoints"]["health"], "/health");
    assert_eq!(body["endpoints"]["text_generation"], "/api/v1/generate/text");
    assert_eq!(body["endpoints"]["image_analysis"], "/api/v1/analyze/image");
}
