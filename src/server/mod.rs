// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 呼叫看护人服务 (Caregiver call endpoint)
//!
//! - `POST /api/call-caregiver`  body: `{"toPhoneNumber": "+15551234567"}`
//! - `GET  /health`
//!
//! 服务端独立执行冷却窗口, 客户端重复请求不会产生重复外呼。

pub mod error;
pub mod handlers;
pub mod provider;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use provider::{ProviderError, TwilioProvider, VoiceCallProvider};
pub use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/call-caregiver", post(handlers::call_caregiver))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
