use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use reelforge_core::config::PipelineConfig;
use reelforge_core::error::ReelforgeError;
use reelforge_core::pipeline::{PipelineDeps, build_all_formats};
use reelforge_core::types::Script;

const DEFAULT_PORT: u16 = 8000;

struct AppState {
    config: PipelineConfig,
    deps: PipelineDeps,
    /// Fired on shutdown; in-flight builds stop at their next stage boundary.
    shutdown: CancellationToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reelforge_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env();
    let deps = PipelineDeps::from_config(&config, None)?;
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState {
        config,
        deps,
        shutdown: shutdown.clone(),
    });

    let app = Router::new()
        .route("/create-video", post(create_video))
        .route("/health", get(health))
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "reelforge server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested, cancelling in-flight builds");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

/// Accept a workflow script payload and render the standard format set.
async fn create_video(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let script = match Script::from_payload_value(payload) {
        Ok(script) => script,
        Err(err) => return error_response(&err),
    };
    tracing::info!(title = %script.title, points = script.main_points.len(), "build requested");

    match build_all_formats(&script, &state.config, &state.deps, &state.shutdown).await {
        Ok(videos) => {
            let videos: serde_json::Map<String, serde_json::Value> = videos
                .into_iter()
                .map(|(name, rendered)| {
                    (
                        name,
                        json!({
                            "path": rendered.path,
                            "thumbnail": rendered.thumbnail,
                            "quality_score": rendered.report.predicted_score,
                        }),
                    )
                })
                .collect();
            Json(json!({ "success": true, "videos": videos })).into_response()
        }
        Err(err) => {
            tracing::error!(%err, "build failed");
            error_response(&err)
        }
    }
}

fn error_response(err: &ReelforgeError) -> Response {
    let status = match err {
        ReelforgeError::Validation { .. } | ReelforgeError::InvalidDuration { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ReelforgeError::Synthesis { .. } => StatusCode::BAD_GATEWAY,
        ReelforgeError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
        .into_response()
}

/// Liveness plus a check that the external tools the renderer shells out to
/// are actually on PATH.
async fn health(State(state): State<Arc<AppState>>) -> Response {
    let ffmpeg = tool_available("ffmpeg", "-version").await;
    let edge_tts = tool_available("edge-tts", "--help").await;
    let output_writable = tokio::fs::create_dir_all(&state.config.output_dir)
        .await
        .is_ok();

    let healthy = ffmpeg && edge_tts && output_writable;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "ffmpeg": ffmpeg,
            "edge_tts": edge_tts,
            "output_writable": output_writable,
            "footage_provider_configured": state.config.pexels_api_key.is_some(),
        })),
    )
        .into_response()
}

async fn tool_available(bin: &str, probe_arg: &str) -> bool {
    Command::new(bin)
        .arg(probe_arg)
        .output()
        .await
        .map(|out| out.status.success())
        .unwrap_or(false)
}
