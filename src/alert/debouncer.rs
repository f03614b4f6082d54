// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 告警去抖 (Alert Debouncer)
//!
//! 每个接收人一个冷却窗口:
//!
//! ```text
//!   Idle ──should_dispatch=true──▶ Cooling ──now-last >= cooldown──▶ Idle
//! ```
//!
//! 放行即记录时间,无论后续呼叫成败 (避免反复冲击故障中的服务商)。

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

static PHONE_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-().]").expect("separator pattern is valid"));
static PHONE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?\d{7,15}$").expect("phone pattern is valid"));

/// 去掉分隔符并校验号码格式, 结果作为冷却键 (客户端与服务端一致)
pub fn normalize_phone(raw: &str) -> Option<String> {
    let phone = PHONE_SEPARATORS.replace_all(raw.trim(), "");
    PHONE_SHAPE.is_match(&phone).then(|| phone.into_owned())
}

/// 各接收人最近一次放行时间 (进程内, 不持久化)
#[derive(Debug, Clone, Default)]
pub struct NotificationState {
    last_notified_at: HashMap<String, i64>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_notified_at(&self, recipient: &str) -> Option<i64> {
        self.last_notified_at.get(recipient).copied()
    }

    pub fn record(&mut self, recipient: &str, at_ms: i64) {
        self.last_notified_at.insert(recipient.to_string(), at_ms);
    }

    pub fn len(&self) -> usize {
        self.last_notified_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_notified_at.is_empty()
    }
}

/// 冷却状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    Idle,
    Cooling { remaining_ms: i64 },
}

#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    state: NotificationState,
    cooldown_ms: i64,
}

/// 多个处理者共享 (HTTP 服务端)
pub type SharedDebouncer = Arc<Mutex<AlertDebouncer>>;

impl AlertDebouncer {
    pub fn new(cooldown_ms: i64) -> Self {
        Self::with_state(NotificationState::new(), cooldown_ms)
    }

    pub fn with_state(state: NotificationState, cooldown_ms: i64) -> Self {
        Self {
            state,
            cooldown_ms: cooldown_ms.max(0),
        }
    }

    pub fn shared(self) -> SharedDebouncer {
        Arc::new(Mutex::new(self))
    }

    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_ms
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    /// 查询,不改变状态
    pub fn cooldown_state(&self, recipient: &str, now_ms: i64) -> CooldownState {
        match self.state.last_notified_at(recipient) {
            None => CooldownState::Idle,
            Some(last) => {
                // 时钟回拨时 elapsed 为负, 仍视为冷却中
                let elapsed = now_ms.saturating_sub(last);
                if elapsed >= self.cooldown_ms {
                    CooldownState::Idle
                } else {
                    CooldownState::Cooling {
                        remaining_ms: self.cooldown_ms - elapsed.max(0),
                    }
                }
            }
        }
    }

    /// Idle 时返回 true 并立即进入 Cooling (记录 now_ms)
    pub fn should_dispatch(&mut self, recipient: &str, now_ms: i64) -> bool {
        match self.cooldown_state(recipient, now_ms) {
            CooldownState::Idle => {
                self.state.record(recipient, now_ms);
                true
            }
            CooldownState::Cooling { .. } => false,
        }
    }

    /// 清理已过期记录, 返回清理条数
    pub fn prune(&mut self, now_ms: i64) -> usize {
        let cooldown = self.cooldown_ms;
        let before = self.state.last_notified_at.len();
        self.state.last_notified_at.retain(|_, last| {
            let elapsed = now_ms.saturating_sub(*last);
            elapsed < cooldown
        });
        before - self.state.last_notified_at.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: i64 = 60_000;

    #[test]
    fn test_cooldown_window() {
        let mut d = AlertDebouncer::new(COOLDOWN);
        let t0 = 1_700_000_000_000;
        assert!(d.should_dispatch("A", t0));
        assert!(!d.should_dispatch("A", t0 + 1));
        assert!(!d.should_dispatch("A", t0 + COOLDOWN - 1));
        assert!(d.should_dispatch("A", t0 + COOLDOWN + 1));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut d = AlertDebouncer::new(COOLDOWN);
        assert!(d.should_dispatch("A", 0));
        assert!(d.should_dispatch("A", COOLDOWN));
    }

    #[test]
    fn test_recipient_isolation() {
        let mut d = AlertDebouncer::new(COOLDOWN);
        assert!(d.should_dispatch("A", 10));
        assert!(!d.should_dispatch("A", 20));
        assert!(d.should_dispatch("B", 20));
        assert!(!d.should_dispatch("B", 30));
    }

    #[test]
    fn test_suppressed_call_does_not_extend_window() {
        let mut d = AlertDebouncer::new(COOLDOWN);
        assert!(d.should_dispatch("A", 0));
        assert!(!d.should_dispatch("A", 59_000));
        assert_eq!(d.state().last_notified_at("A"), Some(0));
        assert!(d.should_dispatch("A", 60_000));
    }

    #[test]
    fn test_clock_going_backwards_stays_cooling() {
        let mut d = AlertDebouncer::new(COOLDOWN);
        assert!(d.should_dispatch("A", 100_000));
        assert_eq!(
            d.cooldown_state("A", 50_000),
            CooldownState::Cooling { remaining_ms: COOLDOWN }
        );
        assert!(!d.should_dispatch("A", 50_000));
    }

    #[test]
    fn test_injected_state_and_prune() {
        let mut state = NotificationState::new();
        state.record("old", 0);
        state.record("fresh", 100_000);
        let mut d = AlertDebouncer::with_state(state, COOLDOWN);
        assert_eq!(
            d.cooldown_state("fresh", 110_000),
            CooldownState::Cooling { remaining_ms: 50_000 }
        );
        assert_eq!(d.prune(110_000), 1);
        assert_eq!(d.state().len(), 1);
        assert_eq!(d.cooldown_state("old", 110_000), CooldownState::Idle);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+1 (555) 123-4567").as_deref(), Some("+15551234567"));
        assert_eq!(normalize_phone(" 555.123.4567 ").as_deref(), Some("5551234567"));
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("   "), None);
        assert_eq!(normalize_phone("call me"), None);
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("+1234567890123456"), None);
    }

    #[test]
    fn test_shared_debouncer() {
        let shared = AlertDebouncer::new(COOLDOWN).shared();
        assert!(shared.lock().should_dispatch("A", 0));
        assert!(!shared.clone().lock().should_dispatch("A", 1));
    }
}
