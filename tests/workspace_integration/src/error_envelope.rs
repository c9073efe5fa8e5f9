//! Callable error envelope tests.
//!
//! Both functions are served the way the binaries serve them and must
//! answer malformed calls with the same `{"error": {status, message}}` shape
//! and HTTP status mapping.

use axum::Router;
use lesson_helper_common::{Config, FunctionServerBuilder, SharedSecret};
use lesson_helper_speech::SpeechServer;
use lesson_helper_tutor::TutorServer;
use serde_json::Value;

/// Serve a router on an ephemeral port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Tutor and speech servers on one port, tutor pointed at `gemini_base`.
async fn serve_both(gemini_base: &str, secret: Option<&str>) -> String {
    let config = Config {
        gemini_api_key: Some("test-key".to_string()),
        gemini_api_base: gemini_base.to_string(),
        ..Default::default()
    };

    let tutor = TutorServer::new(config.clone()).unwrap();
    let speech = SpeechServer::new(config);

    let router = FunctionServerBuilder::new(tutor.clone())
        .with_routes(tutor.callable_routes())
        .with_routes(speech.callable_routes())
        .with_shared_secret(secret.map(SharedSecret::new))
        .http_router();

    serve(router).await
}

async fn post_raw(url: String, body: &'static str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

fn assert_envelope(body: &Value, status: &str) {
    let object = body.as_object().expect("body is an object");
    assert_eq!(object.len(), 1, "only the error member: {body}");

    let error = object["error"].as_object().expect("error is an object");
    assert_eq!(error.len(), 2, "status and message only: {body}");
    assert_eq!(error["status"], status);
    assert!(error["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_helper_common::secret::SHARED_SECRET_HEADER;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_invalid_argument_envelope_matches() {
        let gemini = MockServer::start().await;
        let base = serve_both(&gemini.uri(), None).await;

        let (tutor_status, tutor_body) = post_raw(format!("{base}/askTheTutor"), r#"{"data":{}}"#).await;
        let (speech_status, speech_body) =
            post_raw(format!("{base}/synthesizeSpeech"), r#"{"data":{}}"#).await;

        assert_eq!(tutor_status, 400);
        assert_eq!(speech_status, 400);
        assert_envelope(&tutor_body, "INVALID_ARGUMENT");
        assert_envelope(&speech_body, "INVALID_ARGUMENT");
        assert_ne!(tutor_body["error"]["message"], speech_body["error"]["message"]);
    }

    #[tokio::test]
    async fn test_bad_request_envelope_matches() {
        let gemini = MockServer::start().await;
        let base = serve_both(&gemini.uri(), None).await;

        for route in ["askTheTutor", "synthesizeSpeech"] {
            let (status, body) = post_raw(format!("{base}/{route}"), "not json").await;
            assert_eq!(status, 400, "{route}");
            assert_envelope(&body, "INVALID_ARGUMENT");
            assert_eq!(body["error"]["message"], "Bad Request", "{route}");
        }
    }

    #[tokio::test]
    async fn test_internal_envelope_for_tutor() {
        // Nothing mounted: the mock answers 404.
        let gemini = MockServer::start().await;
        let base = serve_both(&gemini.uri(), None).await;

        let (status, body) = post_raw(
            format!("{base}/askTheTutor"),
            r#"{"data":{"lessonContext":"Frogs jump.","userQuestion":"Do frogs jump?"}}"#,
        )
        .await;

        assert_eq!(status, 500);
        assert_envelope(&body, "INTERNAL");
    }

    #[tokio::test]
    async fn test_unauthenticated_envelope() {
        let gemini = MockServer::start().await;
        let base = serve_both(&gemini.uri(), Some("s3cret")).await;

        let (status, body) = post_raw(format!("{base}/askTheTutor"), r#"{"data":{}}"#).await;
        assert_eq!(status, 401);
        assert_envelope(&body, "UNAUTHENTICATED");

        let response = reqwest::Client::new()
            .post(format!("{base}/askTheTutor"))
            .header(SHARED_SECRET_HEADER, "s3cret")
            .json(&serde_json::json!({"data": {}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_cors_headers_on_errors() {
        let gemini = MockServer::start().await;
        let base = serve_both(&gemini.uri(), None).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/synthesizeSpeech"))
            .header("Origin", "https://lessons.example.com")
            .json(&serde_json::json!({"data": {"text": ""}}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }
}
