/// 检测系统 (Detection System)
///
/// 负责单帧智能分析
/// - Classifier: 躯干角度跌倒判定 (纯函数,无状态)
pub mod classifier;

pub use classifier::{torso_angle, FallClassifier, FallThresholds, FallVerdict};
