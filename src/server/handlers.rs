use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Html;
use std::sync::Arc;

use super::AppState;
use super::protocol::{ApiError, PredictRequest};
use crate::search::{RankedResult, resolve_top_k};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Liveness only; says nothing about whether the catalog loaded.
pub async fn healthz() -> &'static str {
    "OK"
}

pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<RankedResult>>, ApiError> {
    let request = PredictRequest::from_body(&body)?;
    let top_k = resolve_top_k(request.top_k, state.default_top_k);

    if !state.diagnoser.is_ready() {
        return Ok(Json(Vec::new()));
    }

    let permit = state
        .encode_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ApiError::internal(format!("encoder unavailable: {e}")))?;

    let diagnoser = Arc::clone(&state.diagnoser);
    let symptoms = request.symptoms;
    // The permit moves into the blocking task: a dropped request must not
    // free it while the encoder is still running.
    let outcome = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        diagnoser.find_top_diseases(&symptoms, top_k)
    })
    .await;

    match outcome {
        Ok(Ok(results)) => {
            tracing::debug!(top_k, returned = results.len(), "prediction served");
            Ok(Json(results))
        }
        Ok(Err(e)) => {
            tracing::error!(error = %format!("{e:#}"), "prediction failed");
            Err(ApiError::internal(format!("prediction failed: {e:#}")))
        }
        Err(e) => {
            tracing::error!(error = %e, "prediction task aborted");
            Err(ApiError::internal("prediction failed"))
        }
    }
}
