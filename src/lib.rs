// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod alert; // 告警去抖与呼叫分发
pub mod config; // 配置参数
pub mod detection; // 跌倒判定
pub mod error; // 错误类型
pub mod monitor; // 监控循环
pub mod pose; // 关键点模型与适配
pub mod server; // 呼叫看护人服务

pub use crate::alert::{AlertDebouncer, CallEvent, Dispatcher, HttpNotifier};
pub use crate::config::{MonitorArgs, SentinelConfig, ServerArgs};
pub use crate::detection::{FallClassifier, FallThresholds, FallVerdict};
pub use crate::error::{Result, SentinelError, SourceError};
pub use crate::monitor::{DetectionLoop, LoopExit, MonitorHandle};
pub use crate::pose::{BodyPart, Keypoint, KeypointAdapter, PoseSnapshot};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// 本地时间字符串, 用于文件命名
pub fn gen_time_string(delimiter: &str) -> String {
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    chrono::Local::now().format(&fmt).to_string()
}

/// 初始化日志 (`RUST_LOG` 优先于 `--log-level`)
pub fn init_tracing(level: &str) {
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    // 重复初始化 (测试) 时忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_time_string() {
        let s = gen_time_string("-");
        assert_eq!(s.split('-').count(), 7);
        assert!(s.starts_with(&chrono::Local::now().format("%Y").to_string()));
    }
}
