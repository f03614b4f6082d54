// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 服务端共享状态 (每个请求克隆一份, 内部共享)

use std::sync::Arc;

use super::provider::VoiceCallProvider;
use crate::alert::{AlertDebouncer, Clock, SharedDebouncer, SystemClock};

#[derive(Clone)]
pub struct AppState {
    /// 服务端冷却窗口 (权威)
    pub debouncer: SharedDebouncer,
    pub provider: Arc<dyn VoiceCallProvider>,
    pub clock: Arc<dyn Clock>,
    /// 电话播报内容
    pub announcement: Arc<str>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn VoiceCallProvider>,
        cooldown_ms: i64,
        announcement: impl Into<Arc<str>>,
    ) -> Self {
        Self::with_clock(provider, cooldown_ms, announcement, Arc::new(SystemClock))
    }

    pub fn with_clock(
        provider: Arc<dyn VoiceCallProvider>,
        cooldown_ms: i64,
        announcement: impl Into<Arc<str>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            debouncer: AlertDebouncer::new(cooldown_ms).shared(),
            provider,
            clock,
            announcement: announcement.into(),
        }
    }
}
