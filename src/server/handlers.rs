// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 请求处理

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::ApiError;
use super::provider::ProviderError;
use super::state::AppState;
use crate::alert::{normalize_phone, CooldownState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub to_phone_number: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<i64>,
}

impl CallResponse {
    fn initiated(call_sid: String) -> Self {
        Self {
            status: "initiated",
            message: "Call initiated",
            call_sid: Some(call_sid),
            retry_after_ms: None,
        }
    }

    fn suppressed(retry_after_ms: i64) -> Self {
        Self {
            status: "suppressed",
            message: "Call already initiated recently",
            call_sid: None,
            retry_after_ms: Some(retry_after_ms),
        }
    }
}

/// `POST /api/call-caregiver`
pub async fn call_caregiver(
    State(state): State<AppState>,
    body: Result<Json<CallRequest>, JsonRejection>,
) -> Result<Json<CallResponse>, ApiError> {
    let Json(request) = body.map_err(|e| {
        debug!("请求体无法解析: {}", e);
        ApiError::phone_required()
    })?;
    let phone = request
        .to_phone_number
        .as_deref()
        .and_then(normalize_phone)
        .ok_or_else(ApiError::phone_required)?;

    let now = state.clock.now_ms();
    {
        let mut debouncer = state.debouncer.lock();
        debouncer.prune(now);
        if !debouncer.should_dispatch(&phone, now) {
            let retry_after_ms = match debouncer.cooldown_state(&phone, now) {
                CooldownState::Cooling { remaining_ms } => remaining_ms,
                CooldownState::Idle => 0,
            };
            info!("⏳ 冷却中, 忽略重复呼叫 → {} ({}ms 后可再次呼叫)", phone, retry_after_ms);
            return Ok(Json(CallResponse::suppressed(retry_after_ms)));
        }
    }

    let provider = state.provider.clone();
    let announcement = state.announcement.clone();
    let to = phone.clone();
    let result = tokio::task::spawn_blocking(move || provider.place_call(&to, &announcement))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match result {
        Ok(call_sid) => {
            info!("📞 已发起呼叫 → {} (sid={})", phone, call_sid);
            Ok(Json(CallResponse::initiated(call_sid)))
        }
        Err(ProviderError::Rejected { status, message }) => {
            Err(ApiError::Rejected(format!("HTTP {}: {}", status, message)))
        }
        Err(ProviderError::Unavailable(message)) => Err(ApiError::Internal(message)),
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let tracked = state.debouncer.lock().state().len();
    Json(json!({ "status": "ok", "trackedRecipients": tracked }))
}
