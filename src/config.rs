// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 配置 - 命令行参数 + JSON 参数文件
//!
//! 所有阈值与冷却时间只在这里定义一次,客户端与服务端共用。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::alert::normalize_phone;
use crate::detection::FallThresholds;
use crate::error::{Result, SentinelError};

// ========== 公共常量 ==========

/// 关键点最低置信度
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.2;
/// |躯干角度| 低于此值判为跌倒
pub const DEFAULT_FALL_LOW_DEG: f32 = 80.0;
/// |躯干角度| 高于此值判为跌倒
pub const DEFAULT_FALL_HIGH_DEG: f32 = 110.0;
/// 同一接收人两次呼叫的最短间隔 (客户端/服务端统一)
pub const DEFAULT_COOLDOWN_MS: i64 = 60_000;
pub const DEFAULT_SERVER_PORT: u16 = 5001;
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5001";
pub const DEFAULT_ANNOUNCEMENT: &str = "Fall Detected! Please check immediately.";

/// 监控端参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    // === 分类参数 ===
    pub min_confidence: f32, // 关键点置信度阈值
    pub fall_low_deg: f32,   // 跌倒下限角度
    pub fall_high_deg: f32,  // 跌倒上限角度

    // === 告警参数 ===
    pub cooldown_ms: i64,             // 冷却窗口
    pub endpoint: String,             // 呼叫服务地址
    pub recipient: Option<String>,    // 看护人电话
    pub request_timeout_ms: u64,      // 呼叫请求超时

    // === 循环参数 ===
    pub fps: u32,                     // 目标帧率
    pub stats_interval: u64,          // 每N帧打印一次统计
    pub snapshot_dir: Option<PathBuf>, // 跌倒截图目录
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            fall_low_deg: DEFAULT_FALL_LOW_DEG,
            fall_high_deg: DEFAULT_FALL_HIGH_DEG,

            cooldown_ms: DEFAULT_COOLDOWN_MS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            recipient: None,
            request_timeout_ms: 5_000,

            fps: 30,
            stats_interval: 60,
            snapshot_dir: None,
        }
    }
}

impl SentinelConfig {
    /// 默认配置文件位置
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("fall-sentinel").join("sentinel.json"))
            .unwrap_or_else(|| PathBuf::from("sentinel.json"))
    }

    /// 从JSON文件加载配置 (不存在则写出默认配置, 读取或解析失败则使用默认值且不改动文件)
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                // 文件存在但读不了 (权限 / 非UTF-8), 不覆盖
                warn!("⚠️  配置文件读取失败: {}, 使用默认值 ({})", e, path.display());
                Self::default()
            }
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ 保存配置失败: {}", e);
                }
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    pub fn thresholds(&self) -> FallThresholds {
        FallThresholds {
            min_confidence: self.min_confidence,
            low_deg: self.fall_low_deg,
            high_deg: self.fall_high_deg,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds().validate()?;
        if self.cooldown_ms <= 0 {
            return Err(SentinelError::Config(format!(
                "cooldown_ms must be positive, got {}",
                self.cooldown_ms
            )));
        }
        if self.fps == 0 {
            return Err(SentinelError::Config("fps must be positive".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(SentinelError::Config("request_timeout_ms must be positive".into()));
        }
        if let Some(phone) = &self.recipient {
            if normalize_phone(phone).is_none() {
                return Err(SentinelError::InvalidRecipient(phone.clone()));
            }
        }
        if self.endpoint.trim().is_empty() {
            return Err(SentinelError::Config("endpoint must not be empty".into()));
        }
        Ok(())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前监控配置:");
        info!("  置信度阈值: {:.2}", self.min_confidence);
        info!(
            "  跌倒角度: |angle| < {:.0}° 或 > {:.0}°",
            self.fall_low_deg, self.fall_high_deg
        );
        info!("  冷却窗口: {}ms", self.cooldown_ms);
        info!("  呼叫服务: {}", self.endpoint);
        match &self.recipient {
            Some(phone) => info!("  看护人电话: {}", phone),
            None => warn!("  看护人电话: 未设置 (检测到跌倒也不会呼叫)"),
        }
    }
}

// ========== 命令行参数 ==========

/// 跌倒监控参数
#[derive(Parser, Debug)]
#[command(author, version, about = "跌倒监控 - Fall detection monitor", long_about = None)]
pub struct MonitorArgs {
    /// 姿态数据源 (JSON lines, 每行一帧; "-" 表示标准输入)
    #[arg(short, long, default_value = "-")]
    pub source: String,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 看护人电话号码
    #[arg(short, long)]
    pub phone: Option<String>,

    /// 呼叫服务地址
    #[arg(long)]
    pub endpoint: Option<String>,

    /// 目标帧率
    #[arg(long)]
    pub fps: Option<u32>,

    /// 跌倒截图目录
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// 日志级别 (trace/debug/info/warn/error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl MonitorArgs {
    /// 命令行覆盖配置文件
    pub fn apply(&self, config: &mut SentinelConfig) {
        if let Some(phone) = &self.phone {
            config.recipient = Some(phone.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(dir) = &self.snapshot_dir {
            config.snapshot_dir = Some(dir.clone());
        }
    }
}

/// 呼叫服务参数 (也可通过环境变量提供)
#[derive(Parser, Debug)]
#[command(author, version, about = "呼叫看护人服务 - Caregiver call endpoint", long_about = None)]
pub struct ServerArgs {
    /// 监听端口
    #[arg(long, env = "PORT", default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,

    /// 服务端冷却窗口 (毫秒)
    #[arg(long, env = "SENTINEL_COOLDOWN_MS", default_value_t = DEFAULT_COOLDOWN_MS)]
    pub cooldown_ms: i64,

    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    pub twilio_account_sid: String,

    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub twilio_auth_token: String,

    /// 主叫号码
    #[arg(long, env = "TWILIO_PHONE_NUMBER")]
    pub twilio_phone_number: String,

    #[arg(long, default_value = "https://api.twilio.com")]
    pub twilio_api_base: String,

    /// 电话播报内容
    #[arg(long, default_value = DEFAULT_ANNOUNCEMENT)]
    pub announcement: String,

    /// 日志级别 (trace/debug/info/warn/error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
