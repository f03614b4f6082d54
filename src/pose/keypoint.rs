// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 姿态关键点数据结构
//! Keypoint data model (one subject, one frame)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ========== 身体部位 ==========

/// 身体部位 (BodyPart)
///
/// 覆盖 PoseNet / MoveNet (COCO 17点) 与 BlazePose 面部细节点的并集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyPart {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftElbow,
    LeftWrist,
    RightElbow,
    RightWrist,
    LeftKnee,
    LeftAnkle,
    RightKnee,
    RightAnkle,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftEyeInner,
    LeftEyeOuter,
    RightEyeInner,
    RightEyeOuter,
    LeftCheek,
    RightCheek,
    MouthLeft,
    MouthRight,
}

/// COCO 17点顺序 (MoveNet / YOLOv8-pose)
const COCO17: [BodyPart; 17] = [
    BodyPart::Nose,
    BodyPart::LeftEye,
    BodyPart::RightEye,
    BodyPart::LeftEar,
    BodyPart::RightEar,
    BodyPart::LeftShoulder,
    BodyPart::RightShoulder,
    BodyPart::LeftElbow,
    BodyPart::RightElbow,
    BodyPart::LeftWrist,
    BodyPart::RightWrist,
    BodyPart::LeftHip,
    BodyPart::RightHip,
    BodyPart::LeftKnee,
    BodyPart::RightKnee,
    BodyPart::LeftAnkle,
    BodyPart::RightAnkle,
];

impl BodyPart {
    pub const ALL: [BodyPart; 25] = [
        BodyPart::Nose,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftElbow,
        BodyPart::LeftWrist,
        BodyPart::RightElbow,
        BodyPart::RightWrist,
        BodyPart::LeftKnee,
        BodyPart::LeftAnkle,
        BodyPart::RightKnee,
        BodyPart::RightAnkle,
        BodyPart::LeftEye,
        BodyPart::RightEye,
        BodyPart::LeftEar,
        BodyPart::RightEar,
        BodyPart::LeftEyeInner,
        BodyPart::LeftEyeOuter,
        BodyPart::RightEyeInner,
        BodyPart::RightEyeOuter,
        BodyPart::LeftCheek,
        BodyPart::RightCheek,
        BodyPart::MouthLeft,
        BodyPart::MouthRight,
    ];

    /// camelCase 名称 (PoseNet 风格)
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::LeftShoulder => "leftShoulder",
            BodyPart::RightShoulder => "rightShoulder",
            BodyPart::LeftHip => "leftHip",
            BodyPart::RightHip => "rightHip",
            BodyPart::LeftElbow => "leftElbow",
            BodyPart::LeftWrist => "leftWrist",
            BodyPart::RightElbow => "rightElbow",
            BodyPart::RightWrist => "rightWrist",
            BodyPart::LeftKnee => "leftKnee",
            BodyPart::LeftAnkle => "leftAnkle",
            BodyPart::RightKnee => "rightKnee",
            BodyPart::RightAnkle => "rightAnkle",
            BodyPart::LeftEye => "leftEye",
            BodyPart::RightEye => "rightEye",
            BodyPart::LeftEar => "leftEar",
            BodyPart::RightEar => "rightEar",
            BodyPart::LeftEyeInner => "leftEyeInner",
            BodyPart::LeftEyeOuter => "leftEyeOuter",
            BodyPart::RightEyeInner => "rightEyeInner",
            BodyPart::RightEyeOuter => "rightEyeOuter",
            BodyPart::LeftCheek => "leftCheek",
            BodyPart::RightCheek => "rightCheek",
            BodyPart::MouthLeft => "mouthLeft",
            BodyPart::MouthRight => "mouthRight",
        }
    }

    /// COCO 17点索引 → 身体部位
    pub fn from_coco17_index(index: usize) -> Option<Self> {
        COCO17.get(index).copied()
    }

    /// BlazePose 33点索引 → 身体部位 (手指/脚跟等没有对应部位,返回 None)
    pub fn from_blazepose_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(BodyPart::Nose),
            1 => Some(BodyPart::LeftEyeInner),
            2 => Some(BodyPart::LeftEye),
            3 => Some(BodyPart::LeftEyeOuter),
            4 => Some(BodyPart::RightEyeInner),
            5 => Some(BodyPart::RightEye),
            6 => Some(BodyPart::RightEyeOuter),
            7 => Some(BodyPart::LeftEar),
            8 => Some(BodyPart::RightEar),
            9 => Some(BodyPart::MouthLeft),
            10 => Some(BodyPart::MouthRight),
            11 => Some(BodyPart::LeftShoulder),
            12 => Some(BodyPart::RightShoulder),
            13 => Some(BodyPart::LeftElbow),
            14 => Some(BodyPart::RightElbow),
            15 => Some(BodyPart::LeftWrist),
            16 => Some(BodyPart::RightWrist),
            23 => Some(BodyPart::LeftHip),
            24 => Some(BodyPart::RightHip),
            25 => Some(BodyPart::LeftKnee),
            26 => Some(BodyPart::RightKnee),
            27 => Some(BodyPart::LeftAnkle),
            28 => Some(BodyPart::RightAnkle),
            _ => None,
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知部位名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBodyPart(pub String);

impl fmt::Display for UnknownBodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown body part {:?}", self.0)
    }
}

impl std::error::Error for UnknownBodyPart {}

impl FromStr for BodyPart {
    type Err = UnknownBodyPart;

    /// 同时接受 camelCase / snake_case / kebab-case,大小写不敏感
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        BodyPart::ALL
            .iter()
            .copied()
            .find(|part| part.as_str().eq_ignore_ascii_case(&compact))
            .ok_or_else(|| UnknownBodyPart(s.to_string()))
    }
}

// ========== 关键点 ==========

/// 单个关键点 (图像像素坐标 + 置信度)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: BodyPart,
    pub x: f32,
    pub y: f32,
    pub confidence: f32, // 0.0 ~ 1.0
}

impl Keypoint {
    pub fn new(part: BodyPart, x: f32, y: f32, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            part,
            x,
            y,
            confidence,
        }
    }

    /// 置信度是否达到阈值
    pub fn is_valid(&self, min_confidence: f32) -> bool {
        self.confidence >= min_confidence
    }
}

// ========== 单帧姿态 ==========

/// 单个目标在单帧中的全部关键点
///
/// 每帧重新生成,不跨帧追踪身份。缺失的部位视为置信度 0。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseSnapshot {
    keypoints: Vec<Keypoint>,
}

impl PoseSnapshot {
    /// 重复部位只保留第一次出现的
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        let mut unique: Vec<Keypoint> = Vec::with_capacity(keypoints.len());
        for kp in keypoints {
            if !unique.iter().any(|k| k.part == kp.part) {
                unique.push(kp);
            }
        }
        Self { keypoints: unique }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn get(&self, part: BodyPart) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.part == part)
    }

    /// 置信度 >= min_confidence 的关键点
    pub fn confident(&self, part: BodyPart, min_confidence: f32) -> Option<&Keypoint> {
        self.get(part).filter(|k| k.is_valid(min_confidence))
    }

    /// 缺失部位按 0 计入
    pub fn confidence_of(&self, part: BodyPart) -> f32 {
        self.get(part).map(|k| k.confidence).unwrap_or(0.0)
    }

    pub fn mean_confidence(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.keypoints.iter().map(|k| k.confidence).sum();
        sum / self.keypoints.len() as f32
    }
}

/// 骨架连线 (与 COCO 17点骨架一致,按部位名表示)
pub const SKELETON_EDGES: [(BodyPart, BodyPart); 16] = [
    (BodyPart::Nose, BodyPart::LeftEye),
    (BodyPart::Nose, BodyPart::RightEye),
    (BodyPart::LeftEye, BodyPart::LeftEar),
    (BodyPart::RightEye, BodyPart::RightEar),
    (BodyPart::LeftShoulder, BodyPart::RightShoulder),
    (BodyPart::LeftShoulder, BodyPart::LeftHip),
    (BodyPart::RightShoulder, BodyPart::RightHip),
    (BodyPart::LeftHip, BodyPart::RightHip),
    (BodyPart::LeftShoulder, BodyPart::LeftElbow),
    (BodyPart::RightShoulder, BodyPart::RightElbow),
    (BodyPart::LeftElbow, BodyPart::LeftWrist),
    (BodyPart::RightElbow, BodyPart::RightWrist),
    (BodyPart::LeftHip, BodyPart::LeftKnee),
    (BodyPart::RightHip, BodyPart::RightKnee),
    (BodyPart::LeftKnee, BodyPart::LeftAnkle),
    (BodyPart::RightKnee, BodyPart::RightAnkle),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_naming_styles() {
        assert_eq!("leftShoulder".parse::<BodyPart>(), Ok(BodyPart::LeftShoulder));
        assert_eq!("left_shoulder".parse::<BodyPart>(), Ok(BodyPart::LeftShoulder));
        assert_eq!("LEFT-SHOULDER".parse::<BodyPart>(), Ok(BodyPart::LeftShoulder));
        assert_eq!("mouth_right".parse::<BodyPart>(), Ok(BodyPart::MouthRight));
        assert_eq!("left_eye_inner".parse::<BodyPart>(), Ok(BodyPart::LeftEyeInner));
        assert!("left_pinky".parse::<BodyPart>().is_err());
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_string(&BodyPart::RightEyeOuter).unwrap();
        assert_eq!(json, "\"rightEyeOuter\"");
        assert_eq!(BodyPart::RightEyeOuter.to_string(), "rightEyeOuter");
    }

    #[test]
    fn test_index_tables() {
        assert_eq!(BodyPart::from_coco17_index(5), Some(BodyPart::LeftShoulder));
        assert_eq!(BodyPart::from_coco17_index(12), Some(BodyPart::RightHip));
        assert_eq!(BodyPart::from_coco17_index(17), None);
        assert_eq!(BodyPart::from_blazepose_index(11), Some(BodyPart::LeftShoulder));
        assert_eq!(BodyPart::from_blazepose_index(24), Some(BodyPart::RightHip));
        assert_eq!(BodyPart::from_blazepose_index(19), None); // 食指
    }

    #[test]
    fn test_snapshot_first_duplicate_wins() {
        let snap = PoseSnapshot::new(vec![
            Keypoint::new(BodyPart::Nose, 1.0, 2.0, 0.9),
            Keypoint::new(BodyPart::Nose, 5.0, 5.0, 0.1),
        ]);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get(BodyPart::Nose).map(|k| k.x), Some(1.0));
    }

    #[test]
    fn test_confidence_clamped_and_absent_is_zero() {
        let snap = PoseSnapshot::new(vec![Keypoint::new(BodyPart::LeftHip, 0.0, 0.0, 1.7)]);
        assert_eq!(snap.confidence_of(BodyPart::LeftHip), 1.0);
        assert_eq!(snap.confidence_of(BodyPart::RightHip), 0.0);
        assert!(snap.confident(BodyPart::LeftHip, 0.2).is_some());
        assert!(snap.confident(BodyPart::RightHip, 0.0).is_none());
    }
}
