// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 接口错误 → HTTP 状态码 + JSON `{"error": ...}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// 缺少或无效号码时返回给客户端的固定提示
pub const PHONE_REQUIRED: &str = "Phone number is required";

#[derive(Debug, Error)]
pub enum ApiError {
    /// 请求不合法 (400)
    #[error("{0}")]
    BadRequest(String),

    /// 服务商拒绝了号码 (400)
    #[error("call rejected by provider: {0}")]
    Rejected(String),

    /// 服务商不可用或内部错误 (500)
    #[error("Error initiating call: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn phone_required() -> Self {
        Self::BadRequest(PHONE_REQUIRED.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("❌ {}", self);
        } else {
            warn!("⚠️ {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
