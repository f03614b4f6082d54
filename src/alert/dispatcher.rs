// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 通知分发 (Notification Dispatcher)
//! 职责: 接收CallEvent → 独立工作线程发起一次呼叫请求 → 回报结果
//!
//! 不重试: 失败只上报。下一次重试只能来自下一帧的跌倒判定,并受冷却窗口约束。
//! 监控循环只等待 "是否分发" 的决定,不等待服务商响应。

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{Result, SentinelError};

/// 分发队列容量
pub const DISPATCH_QUEUE_CAPACITY: usize = 4;
const OUTCOME_QUEUE_CAPACITY: usize = 32;

/// 一次跌倒事件 → 一次呼叫请求
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    #[serde(rename = "toPhoneNumber")]
    pub recipient: String,
    pub severity: String,
    pub angle_degrees: Option<f32>,
    pub detected_at_ms: i64,
}

impl CallEvent {
    pub fn fall(recipient: impl Into<String>, angle_degrees: Option<f32>, detected_at_ms: i64) -> Self {
        Self {
            recipient: recipient.into(),
            severity: "fall-detected".to_string(),
            angle_degrees,
            detected_at_ms,
        }
    }
}

/// 呼叫结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 服务端已受理 (包括服务端冷却去重)
    Dispatched,
    /// 客户端错误 (如号码无效), 不可重试, 需要提示操作员
    Rejected(String),
    /// 服务不可达或服务端错误
    Unavailable(String),
}

/// 工作线程回报
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub event: CallEvent,
    pub outcome: DispatchOutcome,
    pub elapsed_ms: f64,
}

/// 呼叫通道 (外部协作者)
pub trait Notifier: Send {
    fn notify(&self, event: &CallEvent) -> DispatchOutcome;
}

// ========== HTTP 实现 ==========

/// 通过 `POST /api/call-caregiver` 请求后端拨号
pub struct HttpNotifier {
    url: String,
    agent: ureq::Agent,
}

impl HttpNotifier {
    /// `endpoint`: 服务根地址, 如 `http://localhost:5001`
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let url = format!("{}/api/call-caregiver", endpoint.trim_end_matches('/'));
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { url, agent }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for HttpNotifier {
    fn notify(&self, event: &CallEvent) -> DispatchOutcome {
        match self.agent.post(&self.url).send_json(event) {
            Ok(_) => DispatchOutcome::Dispatched,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                map_status(code, body)
            }
            Err(ureq::Error::Transport(transport)) => {
                DispatchOutcome::Unavailable(transport.to_string())
            }
        }
    }
}

/// HTTP 状态码 → 结果
fn map_status(code: u16, body: String) -> DispatchOutcome {
    match code {
        200..=299 => DispatchOutcome::Dispatched,
        400..=499 => DispatchOutcome::Rejected(if body.is_empty() {
            format!("HTTP {}", code)
        } else {
            body
        }),
        _ => DispatchOutcome::Unavailable(format!("HTTP {}: {}", code, body)),
    }
}

// ========== 分发器 ==========

pub struct Dispatcher {
    tx: Option<Sender<CallEvent>>,
    outcomes: Receiver<DispatchReport>,
    worker: Option<JoinHandle<()>>,
    submitted: u64,
}

impl Dispatcher {
    /// 启动分发工作线程
    pub fn spawn<N: Notifier + 'static>(notifier: N) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded::<CallEvent>(DISPATCH_QUEUE_CAPACITY);
        let (tx_outcome, outcomes) = crossbeam_channel::bounded(OUTCOME_QUEUE_CAPACITY);

        let worker = std::thread::Builder::new()
            .name("dispatcher".into())
            .spawn(move || {
                info!("📞 分发线程启动");
                while let Ok(event) = rx.recv() {
                    let start = Instant::now();
                    let outcome = notifier.notify(&event);
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

                    match &outcome {
                        DispatchOutcome::Dispatched => {
                            info!("✅ 呼叫请求已受理 → {} ({:.0}ms)", event.recipient, elapsed_ms)
                        }
                        DispatchOutcome::Rejected(reason) => {
                            error!("❌ 呼叫请求被拒绝 → {}: {}", event.recipient, reason)
                        }
                        DispatchOutcome::Unavailable(reason) => {
                            warn!("⚠️ 呼叫服务不可用 → {}: {}", event.recipient, reason)
                        }
                    }

                    let report = DispatchReport {
                        event,
                        outcome,
                        elapsed_ms,
                    };
                    if tx_outcome.try_send(report).is_err() {
                        warn!("⚠️ 分发结果队列已满, 丢弃一条结果");
                    }
                }
                info!("📞 分发线程退出");
            })?;

        Ok(Self {
            tx: Some(tx),
            outcomes,
            worker: Some(worker),
            submitted: 0,
        })
    }

    /// 非阻塞提交
    pub fn submit(&mut self, event: CallEvent) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(SentinelError::DispatcherClosed)?;
        match tx.try_send(event) {
            Ok(()) => {
                self.submitted += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(SentinelError::DispatchQueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SentinelError::DispatcherClosed),
        }
    }

    /// 取出目前已完成的结果
    pub fn drain_outcomes(&self) -> Vec<DispatchReport> {
        self.outcomes.try_iter().collect()
    }

    /// 累计成功提交数
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// 关闭队列, 等待在途请求结束, 返回剩余结果
    pub fn shutdown(mut self) -> Vec<DispatchReport> {
        self.close();
        self.drain_outcomes()
    }

    fn close(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("❌ 分发线程异常退出");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingNotifier {
        calls: Arc<AtomicUsize>,
        outcome: DispatchOutcome,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, _event: &CallEvent) -> DispatchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct GatedNotifier {
        started: Sender<()>,
        gate: Receiver<()>,
    }

    impl Notifier for GatedNotifier {
        fn notify(&self, _event: &CallEvent) -> DispatchOutcome {
            let _ = self.started.send(());
            let _ = self.gate.recv();
            DispatchOutcome::Dispatched
        }
    }

    #[test]
    fn test_one_request_per_submit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::spawn(CountingNotifier {
            calls: calls.clone(),
            outcome: DispatchOutcome::Dispatched,
        })
        .unwrap();

        dispatcher.submit(CallEvent::fall("+15551234567", Some(3.0), 0)).unwrap();
        assert_eq!(dispatcher.submitted(), 1);

        let reports = dispatcher.shutdown();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, DispatchOutcome::Dispatched);
    }

    #[test]
    fn test_failure_is_reported_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::spawn(CountingNotifier {
            calls: calls.clone(),
            outcome: DispatchOutcome::Unavailable("HTTP 500".into()),
        })
        .unwrap();

        dispatcher.submit(CallEvent::fall("+15551234567", None, 0)).unwrap();
        let reports = dispatcher.shutdown();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(reports[0].outcome, DispatchOutcome::Unavailable(_)));
    }

    #[test]
    fn test_full_queue_is_reported() {
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let mut dispatcher = Dispatcher::spawn(GatedNotifier {
            started: started_tx,
            gate: gate_rx,
        })
        .unwrap();

        dispatcher.submit(CallEvent::fall("a", None, 0)).unwrap();
        started_rx.recv().unwrap(); // 工作线程正在处理第一条
        for _ in 0..DISPATCH_QUEUE_CAPACITY {
            dispatcher.submit(CallEvent::fall("a", None, 0)).unwrap();
        }
        assert!(matches!(
            dispatcher.submit(CallEvent::fall("a", None, 0)),
            Err(SentinelError::DispatchQueueFull)
        ));

        for _ in 0..=DISPATCH_QUEUE_CAPACITY {
            gate_tx.send(()).unwrap();
        }
        let reports = dispatcher.shutdown();
        assert_eq!(reports.len(), DISPATCH_QUEUE_CAPACITY + 1);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status(200, String::new()), DispatchOutcome::Dispatched);
        assert_eq!(
            map_status(400, "Phone number is required".into()),
            DispatchOutcome::Rejected("Phone number is required".into())
        );
        assert_eq!(map_status(404, String::new()), DispatchOutcome::Rejected("HTTP 404".into()));
        assert!(matches!(map_status(500, String::new()), DispatchOutcome::Unavailable(_)));
        assert!(matches!(map_status(503, String::new()), DispatchOutcome::Unavailable(_)));
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(CallEvent::fall("+15551234567", Some(12.5), 42)).unwrap();
        assert_eq!(json["toPhoneNumber"], "+15551234567");
        assert_eq!(json["severity"], "fall-detected");
        assert_eq!(json["angleDegrees"], 12.5);
        assert_eq!(json["detectedAtMs"], 42);
    }

    #[test]
    fn test_unreachable_endpoint_is_unavailable() {
        // 端口 9 (discard) 通常无人监听
        let notifier = HttpNotifier::new("http://127.0.0.1:9/", Duration::from_millis(500));
        assert_eq!(notifier.url(), "http://127.0.0.1:9/api/call-caregiver");
        let outcome = notifier.notify(&CallEvent::fall("+15551234567", None, 0));
        assert!(matches!(outcome, DispatchOutcome::Unavailable(_)));
    }
}
