// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for provider push notifications.
//!
//! A push carries one already-normalized activity. It is handed to the
//! provider's live stream, so it goes through the same path as any other
//! live update.

use crate::error::AppError;
use crate::models::ActivityRecord;
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook/{uuid}", post(handle_push))
}

/// Push payload.
#[derive(Deserialize, Debug)]
struct PushPayload {
    /// Configured provider name the activity belongs to
    provider: String,
    activity: ActivityRecord,
}

/// Accept a pushed activity (POST).
async fn handle_push(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<StatusCode, AppError> {
    // Validate Path UUID
    if uuid != state.config.webhook_path_uuid {
        tracing::warn!(
            received_uuid = %uuid,
            "Security Alert: Webhook path UUID mismatch"
        );
        return Err(AppError::NotFound("Not found".to_string()));
    }

    let payload: PushPayload = serde_json::from_value(payload).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse push payload");
        AppError::BadRequest(format!("Invalid push payload: {}", e))
    })?;

    if payload.activity.id.is_empty() {
        return Err(AppError::BadRequest("Activity id must not be empty".to_string()));
    }

    tracing::info!(
        provider = %payload.provider,
        activity_id = %payload.activity.id,
        "Push received"
    );

    state.push.push(&payload.provider, payload.activity)?;

    Ok(StatusCode::ACCEPTED)
}
