// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 呼叫看护人服务 (Caregiver call endpoint)
///
/// `POST /api/call-caregiver` → Twilio 外呼, 同一号码在冷却窗口内只呼叫一次
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fall_sentinel::config::ServerArgs;
use fall_sentinel::server::{create_router, AppState, TwilioProvider};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    fall_sentinel::init_tracing(&args.log_level);

    anyhow::ensure!(args.cooldown_ms > 0, "cooldown_ms must be positive");

    let provider = TwilioProvider::new(
        &args.twilio_api_base,
        &args.twilio_account_sid,
        &args.twilio_auth_token,
        &args.twilio_phone_number,
    );
    let state = AppState::new(Arc::new(provider), args.cooldown_ms, args.announcement.as_str());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;

    info!("🚀 呼叫服务启动: http://{}", addr);
    info!("📞 主叫号码: {}", args.twilio_phone_number);
    info!("⏳ 冷却窗口: {}ms", args.cooldown_ms);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务异常退出")?;

    info!("🛑 呼叫服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // 无法监听信号时一直运行
        std::future::pending::<()>().await;
    }
}
