// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 跌倒监控 (Fall Sentinel)
///
/// 系统架构:
/// 1. 主线程:   采集姿态 → 跌倒判定 → 去抖 → 渲染 (固定帧率)
/// 2. 分发线程: 向呼叫服务发起 `POST /api/call-caregiver`
/// 3. 输入 "stop" 或数据源结束: 停止循环, 等待在途呼叫请求结束
use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fall_sentinel::alert::{Dispatcher, HttpNotifier, SystemClock};
use fall_sentinel::config::{MonitorArgs, SentinelConfig};
use fall_sentinel::monitor::{
    DetectionLoop, FixedRateScheduler, JsonLinesSource, LoopExit, LoopSettings, OverlayRenderer,
    PoseSource,
};
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let args = MonitorArgs::parse();
    fall_sentinel::init_tracing(&args.log_level);

    // ========== 配置 ==========
    let config_path = args.config.clone().unwrap_or_else(SentinelConfig::default_path);
    let mut config = SentinelConfig::load(&config_path);
    args.apply(&mut config);
    config.validate().context("配置不合法")?;

    info!("🚀 跌倒监控启动");
    info!("📹 姿态数据源: {}", args.source);
    config.print_summary();

    // ========== 数据源 ==========
    let source: Box<dyn PoseSource> = if args.source == "-" {
        Box::new(JsonLinesSource::new(io::stdin().lock()))
    } else {
        let file = File::open(&args.source)
            .with_context(|| format!("无法打开姿态数据源 {}", args.source))?;
        Box::new(JsonLinesSource::new(BufReader::new(file)))
    };

    // ========== 启动分发线程 ==========
    let notifier = HttpNotifier::new(
        &config.endpoint,
        Duration::from_millis(config.request_timeout_ms),
    );
    info!("📞 呼叫服务: {}", notifier.url());
    let dispatcher = Dispatcher::spawn(notifier).context("无法启动分发线程")?;

    let renderer = OverlayRenderer::new(config.min_confidence, config.snapshot_dir.clone());
    let mut detection_loop = DetectionLoop::new(
        source,
        renderer,
        FixedRateScheduler::new(config.fps),
        dispatcher,
        Arc::new(SystemClock),
        LoopSettings::from(&config),
    );

    // ========== 停止控制 ==========
    // 数据来自文件时, 在终端输入 "stop" 停止监控
    if args.source != "-" {
        let handle = detection_loop.handle();
        std::thread::Builder::new()
            .name("stop-control".into())
            .spawn(move || {
                for line in io::stdin().lines().map_while(Result::ok) {
                    if line.trim() == "stop" {
                        info!("🛑 收到停止指令");
                        handle.stop();
                        break;
                    }
                }
            })
            .context("无法启动停止控制线程")?;
    }

    let exit = detection_loop.run();
    let stats = detection_loop.stats();
    match exit {
        LoopExit::Stopped => info!("✅ 监控已停止"),
        LoopExit::SourceEnded(reason) => warn!("⚠️ 姿态数据源结束: {}", reason),
    }
    info!(
        "📊 共{}帧 | 跌倒{}帧 | 呼叫{}次 | 抑制{}次 | 拒绝{} | 服务不可用{} | 失败{}",
        stats.cycles,
        stats.falls,
        stats.dispatches,
        stats.suppressed,
        stats.rejected,
        stats.unavailable,
        stats.failures
    );
    Ok(())
}
