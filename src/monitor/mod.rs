/// 监控系统 (Monitor)
///
/// 采集 → 分类 → 去抖 → 分发 → 渲染 的主循环:
/// - Source:    姿态数据源 (JSON lines)
/// - Driver:    监控循环与启停控制
/// - Overlay:   骨架叠加渲染与跌倒截图
/// - Scheduler: 帧节奏
pub mod driver;
pub mod overlay;
pub mod scheduler;
pub mod source;

pub use driver::{
    CycleStatus, DetectionLoop, FrameRenderer, LoopExit, LoopSettings, LoopStats, MonitorHandle,
    MonitorState,
};
pub use overlay::OverlayRenderer;
pub use scheduler::{FixedRateScheduler, FrameScheduler, ImmediateScheduler};
pub use source::{JsonLinesSource, PoseFrame, PoseSource};
