// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 监控循环 (Detection Loop Driver)
//! 职责: 采集一帧 → 适配 → 分类 → 去抖 → 分发 → 渲染, 循环直到停止
//!
//! 同一时刻只有一个周期在执行。`MonitorHandle::stop()` 返回时,
//! 在途周期已经结束, 之后不会再开始新周期, 也不会再发起任何呼叫。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::scheduler::FrameScheduler;
use super::source::{PoseFrame, PoseSource};
use crate::alert::{
    normalize_phone, AlertDebouncer, CallEvent, Clock, DispatchOutcome, Dispatcher,
};
use crate::config::SentinelConfig;
use crate::detection::{FallClassifier, FallThresholds, FallVerdict};
use crate::error::Result;
use crate::pose::{KeypointAdapter, PoseSnapshot};

// ========== 外部协作者接口 ==========

/// 渲染 (外部协作者)
pub trait FrameRenderer {
    fn render(
        &mut self,
        frame: &PoseFrame,
        snapshot: &PoseSnapshot,
        verdict: &FallVerdict,
    ) -> Result<()>;
}

// ========== 运行状态 ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

struct MonitorShared {
    running: AtomicBool,
    cycle_gate: Mutex<()>, // 周期执行期间持有
    stop_reason: Mutex<Option<String>>,
}

/// 启停控制 (可跨线程克隆)
#[derive(Clone)]
pub struct MonitorHandle {
    shared: Arc<MonitorShared>,
}

impl Default for MonitorHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorHandle {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MonitorShared {
                running: AtomicBool::new(false),
                cycle_gate: Mutex::new(()),
                stop_reason: Mutex::new(None),
            }),
        }
    }

    /// Stopped → Running, 已在运行时返回 false
    pub fn start(&self) -> bool {
        let _gate = self.shared.cycle_gate.lock();
        let started = !self.shared.running.swap(true, Ordering::SeqCst);
        if started {
            *self.shared.stop_reason.lock() = None;
        }
        started
    }

    /// Running → Stopped, 等待在途周期结束后返回
    ///
    /// 不能在渲染回调内部调用 (会等待自己持有的周期锁)
    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            *self.shared.stop_reason.lock() = Some("stopped by operator".to_string());
        }
        let _gate = self.shared.cycle_gate.lock();
    }

    pub fn state(&self) -> MonitorState {
        if self.is_running() {
            MonitorState::Running
        } else {
            MonitorState::Stopped
        }
    }

    pub fn stop_reason(&self) -> Option<String> {
        self.shared.stop_reason.lock().clone()
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// 循环内部停止 (调用方已持有周期锁)
    fn halt(&self, reason: String) {
        self.shared.running.store(false, Ordering::SeqCst);
        *self.shared.stop_reason.lock() = Some(reason);
    }
}

// ========== 统计 ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub falls: u64,
    pub dispatches: u64,
    pub suppressed: u64,
    pub rejected: u64,
    pub unavailable: u64,
    pub failures: u64,
}

/// 单个周期的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CycleStatus {
    /// 循环未运行, 周期没有开始
    NotRunning,
    Processed {
        frame_id: u64,
        verdict: FallVerdict,
        dispatched: bool,
    },
    /// 本帧失败, 循环继续
    Skipped(String),
    /// 采集不可恢复, 循环已停止
    Halted(String),
}

/// 循环退出原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    Stopped,
    SourceEnded(String),
}

/// 循环参数
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub thresholds: FallThresholds,
    pub cooldown_ms: i64,
    pub recipient: Option<String>,
    pub stats_interval: u64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&SentinelConfig::default())
    }
}

impl From<&SentinelConfig> for LoopSettings {
    fn from(config: &SentinelConfig) -> Self {
        Self {
            thresholds: config.thresholds(),
            cooldown_ms: config.cooldown_ms,
            recipient: config.recipient.as_deref().and_then(normalize_phone),
            stats_interval: config.stats_interval.max(1),
        }
    }
}

// ========== 监控循环 ==========

pub struct DetectionLoop<S: PoseSource, R: FrameRenderer, K: FrameScheduler> {
    source: S,
    renderer: R,
    scheduler: K,
    adapter: KeypointAdapter,
    classifier: FallClassifier,
    debouncer: AlertDebouncer,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    recipient: Option<String>,
    handle: MonitorHandle,

    // 统计
    stats: LoopStats,
    stats_interval: u64,
    warned_no_recipient: bool,
    count: u64,
    last: Instant,
    current_fps: f64,
}

impl<S: PoseSource, R: FrameRenderer, K: FrameScheduler> DetectionLoop<S, R, K> {
    pub fn new(
        source: S,
        renderer: R,
        scheduler: K,
        dispatcher: Dispatcher,
        clock: Arc<dyn Clock>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            renderer,
            scheduler,
            adapter: KeypointAdapter::new(),
            classifier: FallClassifier::new(settings.thresholds),
            debouncer: AlertDebouncer::new(settings.cooldown_ms),
            dispatcher,
            clock,
            recipient: settings.recipient,
            handle: MonitorHandle::new(),
            stats: LoopStats::default(),
            stats_interval: settings.stats_interval.max(1),
            warned_no_recipient: false,
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// 启动并阻塞运行, 直到 stop() 或采集不可恢复
    pub fn run(&mut self) -> LoopExit {
        self.handle.start();
        info!("🔍 监控循环启动");

        let exit = loop {
            match self.run_cycle() {
                CycleStatus::NotRunning => break LoopExit::Stopped,
                CycleStatus::Halted(reason) => break LoopExit::SourceEnded(reason),
                CycleStatus::Processed { .. } | CycleStatus::Skipped(_) => {}
            }
            self.scheduler.wait_next_frame();
        };

        self.collect_outcomes();
        info!(
            "🛑 监控已停止: {} | 共{}帧, 跌倒{}帧, 呼叫{}次",
            self.handle.stop_reason().unwrap_or_else(|| "stopped".into()),
            self.stats.cycles,
            self.stats.falls,
            self.stats.dispatches
        );
        exit
    }

    /// 执行一个周期
    pub fn run_cycle(&mut self) -> CycleStatus {
        let handle = self.handle.clone();
        let _gate = handle.shared.cycle_gate.lock();
        if !handle.is_running() {
            return CycleStatus::NotRunning;
        }

        // 1. 采集
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) if e.is_unrecoverable() => {
                let reason = e.to_string();
                error!("❌ 姿态采集失败, 停止监控: {}", reason);
                handle.halt(reason.clone());
                return CycleStatus::Halted(reason);
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!("⚠️ 跳过本帧: {}", e);
                return CycleStatus::Skipped(e.to_string());
            }
        };
        self.stats.cycles += 1;

        // 2. 适配 + 分类
        let snapshot = self.adapter.select_subject(&frame.subjects);
        let verdict = self.classifier.classify(&snapshot);

        // 3. 去抖 + 分发
        let mut dispatched = false;
        if verdict.is_fall {
            self.stats.falls += 1;
            match self.try_dispatch(&handle, &verdict) {
                Ok(d) => dispatched = d,
                Err(e) => {
                    self.stats.failures += 1;
                    warn!("⚠️ 呼叫请求提交失败: {}", e);
                }
            }
        }

        // 4. 渲染
        if let Err(e) = self.renderer.render(&frame, &snapshot, &verdict) {
            self.stats.failures += 1;
            warn!("⚠️ 渲染失败: {}", e);
        }

        self.collect_outcomes();
        self.update_fps();

        CycleStatus::Processed {
            frame_id: frame.frame_id,
            verdict,
            dispatched,
        }
    }

    fn try_dispatch(&mut self, handle: &MonitorHandle, verdict: &FallVerdict) -> Result<bool> {
        let Some(recipient) = self.recipient.as_deref() else {
            if !self.warned_no_recipient {
                warn!("⚠️ 检测到跌倒, 但未设置看护人电话, 不会呼叫");
                self.warned_no_recipient = true;
            }
            return Ok(false);
        };

        // 周期进行中收到停止请求
        if !handle.is_running() {
            return Ok(false);
        }

        let now = self.clock.now_ms();
        if !self.debouncer.should_dispatch(recipient, now) {
            self.stats.suppressed += 1;
            debug!("⏳ 冷却中, 本次不呼叫 → {}", recipient);
            return Ok(false);
        }

        self.dispatcher
            .submit(CallEvent::fall(recipient, verdict.angle_degrees, now))?;
        self.stats.dispatches += 1;
        info!("📞 呼叫看护人 → {}", recipient);
        Ok(true)
    }

    /// 汇总分发线程的结果
    fn collect_outcomes(&mut self) {
        for report in self.dispatcher.drain_outcomes() {
            match report.outcome {
                DispatchOutcome::Dispatched => {}
                DispatchOutcome::Rejected(reason) => {
                    self.stats.rejected += 1;
                    error!("❌ 呼叫被拒绝, 请检查看护人电话 {}: {}", report.event.recipient, reason);
                }
                DispatchOutcome::Unavailable(_) => self.stats.unavailable += 1,
            }
        }
    }

    fn update_fps(&mut self) {
        self.count += 1;
        let now = Instant::now();
        if now.duration_since(self.last).as_secs() >= 1 {
            self.current_fps = self.count as f64 / now.duration_since(self.last).as_secs_f64();
            self.count = 0;
            self.last = now;
        }

        // 每N帧打印一次简洁信息
        if self.stats.cycles % self.stats_interval == 0 {
            info!(
                "🎯 监控: {}帧 | 跌倒{} | 呼叫{} | 抑制{} | 失败{} | {:.1}fps",
                self.stats.cycles,
                self.stats.falls,
                self.stats.dispatches,
                self.stats.suppressed,
                self.stats.failures,
                self.current_fps
            );
        }
    }
}
