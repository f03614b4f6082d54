// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 跌倒分类器 (Fall Classifier)
//!
//! 躯干角度启发式: 取肩中点 → 髋中点的向量,
//! 向量接近水平 (角度接近 0° 或 ±180°) 判为跌倒,接近竖直 (±90°) 判为站立。
//!
//! 这只是几何近似,不是训练出来的模型。已知误报场景:
//! - 弯腰 / 俯身捡东西
//! - 主动躺下 (床上、沙发)
//! - 摄像头横置或大俯角安装
//!
//! 阈值在历史版本中反复调整过 (45° / 90° / 80°-110°),因此全部做成配置项。

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_FALL_HIGH_DEG, DEFAULT_FALL_LOW_DEG, DEFAULT_MIN_CONFIDENCE};
use crate::error::{Result, SentinelError};
use crate::pose::{BodyPart, PoseSnapshot};

/// 分类阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallThresholds {
    pub min_confidence: f32, // 关键点最低置信度
    pub low_deg: f32,        // |angle| < low  → 跌倒
    pub high_deg: f32,       // |angle| > high → 跌倒
}

impl Default for FallThresholds {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            low_deg: DEFAULT_FALL_LOW_DEG,
            high_deg: DEFAULT_FALL_HIGH_DEG,
        }
    }
}

impl FallThresholds {
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f32| (0.0..=180.0).contains(&v);
        if !in_range(self.low_deg) || !in_range(self.high_deg) || self.low_deg > self.high_deg {
            return Err(SentinelError::InvalidThresholds {
                low: self.low_deg,
                high: self.high_deg,
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(SentinelError::Config(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

/// 单帧判定结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallVerdict {
    pub is_fall: bool,
    pub angle_degrees: Option<f32>,
}

impl FallVerdict {
    /// 证据不足: 永远不判为跌倒
    pub fn insufficient() -> Self {
        Self {
            is_fall: false,
            angle_degrees: None,
        }
    }
}

/// 躯干角度 (度), 范围 (-180, 180]
///
/// 四个躯干关键点任一缺失或置信度不足时返回 None
pub fn torso_angle(snapshot: &PoseSnapshot, min_confidence: f32) -> Option<f32> {
    let ls = snapshot.confident(BodyPart::LeftShoulder, min_confidence)?;
    let rs = snapshot.confident(BodyPart::RightShoulder, min_confidence)?;
    let lh = snapshot.confident(BodyPart::LeftHip, min_confidence)?;
    let rh = snapshot.confident(BodyPart::RightHip, min_confidence)?;

    let shoulder_x = (ls.x + rs.x) / 2.0;
    let shoulder_y = (ls.y + rs.y) / 2.0;
    let hip_x = (lh.x + rh.x) / 2.0;
    let hip_y = (lh.y + rh.y) / 2.0;

    let angle = (hip_y - shoulder_y).atan2(hip_x - shoulder_x).to_degrees();
    // atan2 可能给出 -180, 统一折到 +180
    Some(if angle <= -180.0 { 180.0 } else { angle })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FallClassifier {
    thresholds: FallThresholds,
}

impl FallClassifier {
    pub fn new(thresholds: FallThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &FallThresholds {
        &self.thresholds
    }

    /// 纯函数: 相同输入 + 相同阈值 → 相同结果
    pub fn classify(&self, snapshot: &PoseSnapshot) -> FallVerdict {
        let Some(angle) = torso_angle(snapshot, self.thresholds.min_confidence) else {
            return FallVerdict::insufficient();
        };

        let tilt = angle.abs();
        FallVerdict {
            is_fall: tilt < self.thresholds.low_deg || tilt > self.thresholds.high_deg,
            angle_degrees: Some(angle),
        }
    }
}
