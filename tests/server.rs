#![cfg(feature = "server")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use axum::{Json, Router};
use http_body_util::BodyExt;
use og_image::config::UpstreamConfig;
use og_image::pipeline::CACHE_CONTROL;
use og_image::{Config, HttpRecordSource, Pipeline, Registry};
use serde_json::json;
use tower::ServiceExt;

/// Serves a fixed attendee listing on an ephemeral loopback port.
async fn spawn_record_service() -> String {
    let app = Router::new().route(
        "/api/attendees",
        get(|| async {
            Json(json!({
                "data": [
                    {"id": "a1", "createdAt": "2024-01-01T00:00:00Z", "index": 1, "name": "Grace", "email": "grace@x.co"},
                    {"id": "a3", "createdAt": "2024-01-01T00:00:00Z", "index": 3, "name": "Ada", "email": "ada@x.co"}
                ]
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn app(api_url: &str) -> Router {
    let upstream = UpstreamConfig {
        api_url: api_url.to_string(),
        timeout_secs: Some(5),
        ..UpstreamConfig::default()
    };
    let pipeline = Pipeline::new(
        Arc::new(Registry::builtin()),
        Arc::new(HttpRecordSource::new(&upstream)),
        &Config::default(),
    );
    og_image::server::router(Arc::new(pipeline))
}

async fn get_uri(app: Router, uri: &str) -> (StatusCode, header::HeaderMap, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test(flavor = "multi_thread")]
async fn image_binds_record_from_service() {
    let api_url = spawn_record_service().await;
    let (status, headers, body) =
        get_uri(app(&api_url), "/api/image?layoutName=onion&seed=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
    assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL);
    assert!(body.contains(">Ada<"));
    assert!(body.contains("ada@x.co"));
}

#[tokio::test(flavor = "multi_thread")]
async fn image_survives_unreachable_service() {
    let (status, _, body) = get_uri(
        app("http://127.0.0.1:1"),
        "/api/image?layoutName=onion&Title=Hack%20Night",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Hack Night"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_layout_returns_error_page() {
    let (status, headers, body) = get_uri(
        app("http://127.0.0.1:1"),
        "/api/image?layoutName=doesNotExist",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html");
    assert!(headers.get(header::CACHE_CONTROL).is_none());
    assert!(body.contains("doesNotExist"));
}

#[tokio::test]
async fn health_and_layouts() {
    let (status, _, body) = get_uri(app("http://127.0.0.1:1"), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);

    let (status, headers, body) = get_uri(app("http://127.0.0.1:1"), "/api/layouts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let layouts: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(layouts[0]["name"], "onion");
    assert_eq!(layouts[1]["name"], "simple");
}
