//! HTTP transport for the image pipeline.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::enrich::{HttpRecordSource, RecordSource};
use crate::layout::{LayoutSummary, Registry};
use crate::pipeline::{ImageResponse, Pipeline};
use crate::schema::RawParams;

/// Shared, read-only state for request handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

#[derive(Debug, Serialize)]
struct HealthRes {
    ok: bool,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/layouts", get(list_layouts))
        .route("/api/image", get(image))
        .layer(CorsLayer::permissive())
        .with_state(AppState { pipeline })
}

/// Binds `config.server.addr` and serves until the listener fails.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let source = HttpRecordSource::new(&config.upstream);
    tracing::info!(url = %source.url(), "record service");
    let records: Arc<dyn RecordSource> = Arc::new(source);
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(Registry::builtin()),
        records,
        &config,
    ));

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    tracing::info!("-- Starting og-image server on {}", listener.local_addr()?);
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

async fn health() -> Json<HealthRes> {
    Json(HealthRes { ok: true })
}

async fn list_layouts(State(state): State<AppState>) -> Json<Vec<LayoutSummary>> {
    Json(
        state
            .pipeline
            .registry()
            .iter()
            .map(|layout| layout.describe())
            .collect(),
    )
}

/// Rendering and the record lookup block, so the pipeline runs off the async workers.
async fn image(State(state): State<AppState>, Query(query): Query<RawParams>) -> Response {
    let pipeline = state.pipeline.clone();
    match tokio::task::spawn_blocking(move || pipeline.handle(query)).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "image task did not complete");
            ImageResponse::error_page("image task did not complete").into_response()
        }
    }
}

impl IntoResponse for ImageResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type),
        );
        if let Some(cache_control) = self.cache_control {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
        }
        (status, headers, self.body).into_response()
    }
}
