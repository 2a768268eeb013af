//! Public types for the push API
use serde::{Deserialize, Serialize};

use crate::notify::{DeliveryTarget, DispatchReport, DispatchStatus};

#[derive(Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    // Everyone on record when omitted
    #[serde(default)]
    pub target: Option<DeliveryTarget>,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub status: DispatchStatus,
    #[serde(flatten)]
    pub report: DispatchReport,
}

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub token: String,
    pub topic: Option<String>,
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub topic: String,
}

#[derive(Serialize)]
pub struct RecipientCountResponse {
    pub count: usize,
}
