//! Router for the push API

use std::sync::Arc;

use axum::{Json, Router, extract::State};

use super::public;
use crate::api::state::AppState;
use crate::notify::{DeliveryTarget, Message};

type SharedState = Arc<AppState>;

// Count the recipients currently on record
async fn recipients(
    State(state): State<SharedState>,
) -> Result<Json<public::RecipientCountResponse>, crate::api::public::ApiError> {
    let recipients = state.services.directory.list_all().await?;
    Ok(Json(public::RecipientCountResponse {
        count: recipients.len(),
    }))
}

// Register a device token with a broadcast topic
async fn subscribe(
    State(state): State<SharedState>,
    Json(request): Json<public::SubscribeRequest>,
) -> Result<Json<public::SubscribeResponse>, crate::api::public::ApiError> {
    let topic = request
        .topic
        .unwrap_or_else(|| state.config.default_topic.clone());
    let outcome = state
        .services
        .registrar
        .subscribe(&request.token, &topic)
        .await?;

    Ok(Json(public::SubscribeResponse {
        success: true,
        topic: outcome.topic,
    }))
}

// Send a notification and report how many deliveries succeeded
async fn send_notification(
    State(state): State<SharedState>,
    Json(request): Json<public::NotificationRequest>,
) -> Result<Json<public::NotificationResponse>, crate::api::public::ApiError> {
    let message = Message::new(&request.title, &request.body);
    let target = request.target.unwrap_or(DeliveryTarget::AllRecipients);
    let report = state
        .services
        .dispatcher
        .send(&message, &target, None)
        .await?;

    Ok(Json(public::NotificationResponse {
        status: report.status(),
        report,
    }))
}

/// Create the push router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/recipients", axum::routing::get(recipients))
        .route("/subscribe", axum::routing::post(subscribe))
        .route("/notification", axum::routing::post(send_notification))
}
