// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 错误类型 (Error types)
//!
//! 分类与去抖路径上没有致命错误: 关键点缺失是合法的 "证据不足" 结果,
//! 不在这里建模。只有视频/姿态采集失败才会停止监控循环。

use thiserror::Error;

/// 全局错误类型
#[derive(Debug, Error)]
pub enum SentinelError {
    /// 配置参数不合法
    #[error("invalid configuration: {0}")]
    Config(String),

    /// 跌倒角度阈值不一致
    #[error("invalid fall thresholds: low={low}°, high={high}° (need 0 <= low <= high <= 180)")]
    InvalidThresholds { low: f32, high: f32 },

    /// 接收人号码为空或格式不对
    #[error("invalid recipient phone number: {0:?}")]
    InvalidRecipient(String),

    /// 分发队列已满 (上一次呼叫还没处理完)
    #[error("dispatch queue is full")]
    DispatchQueueFull,

    /// 分发线程已退出
    #[error("dispatcher worker has shut down")]
    DispatcherClosed,

    /// 渲染失败 (单帧失败,不终止循环)
    #[error("render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// 姿态采集错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 单帧失败,跳过本帧继续
    #[error("transient acquisition failure: {0}")]
    Transient(String),

    /// 不可恢复,监控循环停止
    #[error("acquisition failed: {0}")]
    Fatal(String),

    /// 输入流结束
    #[error("pose feed ended")]
    Exhausted,
}

impl SourceError {
    /// 是否需要停止监控循环
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, SourceError::Fatal(_) | SourceError::Exhausted)
    }
}

pub type Result<T, E = SentinelError> = std::result::Result<T, E>;
