use std::io;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use dom6api::{ApiConfig, InMemoryBackend, LookupService, Value};
use http_body_util::BodyExt;
use serde_json::{json, Value as Json};
use server::error::ErrorResponse;
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

fn backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_table(
            "units",
            &["id", "name", "size"],
            vec![
                vec![Value::Integer(1), "Longbowman".into(), Value::Integer(2)],
                vec![Value::Integer(2), "Long Spearman".into(), Value::Integer(2)],
                vec![Value::Integer(3), "Militia".into(), Value::Integer(2)],
            ],
        )
        .unwrap()
        .with_table(
            "items",
            &["id", "name", "gcost"],
            vec![
                vec![Value::Integer(7), "Frost Brand".into(), Value::Float(10.0)],
                vec![Value::Integer(8), "Fire Brand".into(), Value::Float(10.0)],
            ],
        )
        .unwrap()
        .with_table(
            "sites",
            &["id", "name", "rarity"],
            vec![
                vec![Value::Integer(10), "Fountain of Youth".into(), "Rare".into()],
                vec![Value::Integer(11), "Iron Mine".into(), "Common".into()],
            ],
        )
        .unwrap()
}

fn app_with(server_config: ServerConfig, data_root: &str) -> Router {
    let config = ApiConfig {
        tables: vec!["units".into(), "items".into(), "sites".into()],
        data_root: data_root.to_string(),
        ..ApiConfig::default()
    };
    let service = LookupService::with_backend(&config, Arc::new(backend())).unwrap();
    build_router(Arc::new(ServerState::with_service(server_config, service)))
}

fn app() -> Router {
    app_with(
        ServerConfig {
            metrics_enabled: false,
            ..ServerConfig::default()
        },
        "Data",
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, Json) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Json::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

#[tokio::test]
async fn identifier_lookup_returns_single_record() {
    let (status, body) = get(app(), "/items/07").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "items": [{ "id": 7, "name": "Frost Brand", "gcost": 10.0, "image": "Data/Items/7.png" }] })
    );
}

#[tokio::test]
async fn missing_identifier_is_empty_ok() {
    let (status, body) = get(app(), "/items/404").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "items": [] }));
}

#[tokio::test]
async fn fuzzy_query_returns_all_matches() {
    let (status, body) = get(app(), "/units?name=long&match=fuzzy").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["units"]
        .as_array()
        .unwrap()
        .iter()
        .map(|unit| unit["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn best_mode_returns_lowest_id_on_tie() {
    let (status, body) = get(app(), "/units?name=long&match=fuzzy&mode=best").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["units"].as_array().unwrap().len(), 1);
    assert_eq!(body["units"][0]["name"], "Longbowman");
}

#[tokio::test]
async fn exact_query_is_case_insensitive() {
    let (status, body) = get(app(), "/sites?rarity=RARE").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sites"][0]["name"], "Fountain of Youth");
    assert_eq!(body["sites"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn path_identifier_overrides_query_id() {
    let (_, body) = get(app(), "/units/3?id=1").await;
    assert_eq!(body["units"][0]["name"], "Militia");
}

#[tokio::test]
async fn unknown_column_is_bad_request() {
    let (status, body) = get(app(), "/units?colour=red&match=fuzzy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(error.error.code, "UNKNOWN_COLUMN");
    assert!(error.error.message.contains("colour"));
}

#[tokio::test]
async fn unknown_table_is_bad_request() {
    let (status, body) = get(app(), "/spells/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNKNOWN_TABLE");
}

#[tokio::test]
async fn invalid_mode_is_bad_request() {
    let (status, body) = get(app(), "/units?mode=top").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");

    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn request_logs_carry_request_id() {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let response = app()
        .oneshot(
            Request::builder()
                .uri("/units/1")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    let request_lines: Vec<&str> = logs
        .lines()
        .filter(|line| line.contains("Request started") || line.contains("Request completed"))
        .collect();
    assert_eq!(request_lines.len(), 2, "{logs}");
    for line in request_lines {
        assert!(line.contains("request_id=abc-123"), "{line}");
    }
}

#[tokio::test]
async fn trailing_slash_lists_whole_table() {
    let (status, body) = get(app(), "/units/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["units"].as_array().unwrap().len(), 3);

    let (_, body) = get(app(), "/units/?size=2&mode=best").await;
    assert_eq!(body["units"][0]["name"], "Longbowman");
}

#[tokio::test]
async fn overlong_query_value_is_bad_request() {
    let uri = format!("/units?name={}&match=fuzzy", "x".repeat(dom6api::MAX_QUERY_CHARS + 1));
    let (status, body) = get(app(), &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn service_routes_report_tables() {
    let (status, body) = get(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(app(), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tables"], json!(["units", "items", "sites"]));

    let (status, body) = get(app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "dom6api");
    assert!(body["endpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("/units/{id}")));
}

#[tokio::test]
async fn metrics_disabled_is_not_found() {
    let (status, body) = get(app(), "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn verify_images_nulls_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let data_root = dir.path().to_str().unwrap().to_string();
    std::fs::create_dir_all(dir.path().join("Units")).unwrap();
    std::fs::write(dir.path().join("Units").join("1.png"), b"png").unwrap();

    let app = app_with(
        ServerConfig {
            metrics_enabled: false,
            verify_images: true,
            ..ServerConfig::default()
        },
        &data_root,
    );
    let (status, body) = get(app, "/units?name=long&match=fuzzy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["units"][0]["image"], format!("{data_root}/Units/1.png"));
    assert_eq!(body["units"][1]["image"], Json::Null);
}
