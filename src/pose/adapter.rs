// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 关键点适配器 (Keypoint Snapshot Adapter)
//!
//! 把各种姿态后端的输出统一成 [`PoseSnapshot`]:
//! - PoseNet:   `{score, keypoints:[{part, score, position:{x,y}}]}`
//! - MoveNet / BlazePose (tfjs): `{keypoints:[{name, x, y, score}]}`
//! - 位置数组:  `[[x,y,score], ...]` / `[[x,y], ...]`,长度 17 (COCO) 或 33 (BlazePose)
//!
//! 永不报错: 格式不对时返回空快照 (所有部位置信度为 0),由分类器当作证据不足处理。

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::keypoint::{BodyPart, Keypoint, PoseSnapshot};

/// 只有位置、没有分数的关键点按此置信度处理
const IMPLICIT_CONFIDENCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeypointAdapter;

impl KeypointAdapter {
    pub fn new() -> Self {
        Self
    }

    /// 单个目标 → 快照
    pub fn adapt(&self, subject: &Value) -> PoseSnapshot {
        let keypoints = match subject {
            Value::Object(obj) => match obj.get("keypoints") {
                Some(Value::Array(items)) => Self::adapt_items(items),
                _ => None,
            },
            Value::Array(items) => Self::adapt_items(items),
            _ => None,
        };

        match keypoints {
            Some(kps) => PoseSnapshot::new(kps),
            None => {
                warn!("⚠️ 无法识别的姿态数据格式, 按空快照处理");
                PoseSnapshot::empty()
            }
        }
    }

    /// 多个目标时取最可信的一个 (顶层 score 优先,否则取关键点平均置信度)
    pub fn select_subject(&self, subjects: &[Value]) -> PoseSnapshot {
        let mut best: Option<(f32, PoseSnapshot)> = None;

        for subject in subjects {
            let snapshot = self.adapt(subject);
            let score = subject
                .get("score")
                .and_then(Value::as_f64)
                .map(|s| s as f32)
                .unwrap_or_else(|| snapshot.mean_confidence());

            let better = best.as_ref().map_or(true, |(best_score, _)| score > *best_score);
            if better {
                best = Some((score, snapshot));
            }
        }

        if subjects.len() > 1 {
            debug!("👥 检测到 {} 个目标, 只分析置信度最高的一个", subjects.len());
        }

        best.map(|(_, snap)| snap).unwrap_or_default()
    }

    /// 进程内姿态模型输出 (YOLOv8-pose 的 (x, y, conf) 元组, COCO 17点顺序)
    pub fn from_coco17(&self, points: &[(f32, f32, f32)]) -> PoseSnapshot {
        let keypoints = points
            .iter()
            .enumerate()
            .filter_map(|(i, &(x, y, c))| {
                let part = BodyPart::from_coco17_index(i)?;
                finite(x, y).then(|| Keypoint::new(part, x, y, c))
            })
            .collect();
        PoseSnapshot::new(keypoints)
    }

    fn adapt_items(items: &[Value]) -> Option<Vec<Keypoint>> {
        if items.is_empty() {
            return Some(Vec::new());
        }

        // 位置数组: 按索引确定部位
        if items.iter().all(Value::is_array) {
            let lookup: fn(usize) -> Option<BodyPart> = match items.len() {
                17 => BodyPart::from_coco17_index,
                33 => BodyPart::from_blazepose_index,
                n => {
                    warn!("⚠️ 位置数组长度 {} 无法映射到部位 (需要 17 或 33)", n);
                    return None;
                }
            };
            let kps = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    let part = lookup(i)?;
                    Self::indexed_point(part, item.as_array()?)
                })
                .collect();
            return Some(kps);
        }

        if items.iter().all(Value::is_object) {
            let kps = items
                .iter()
                .filter_map(|item| item.as_object().and_then(Self::named_point))
                .collect();
            return Some(kps);
        }

        None
    }

    fn indexed_point(part: BodyPart, values: &[Value]) -> Option<Keypoint> {
        let x = values.first()?.as_f64()? as f32;
        let y = values.get(1)?.as_f64()? as f32;
        let c = values
            .get(2)
            .and_then(Value::as_f64)
            .map(|c| c as f32)
            .unwrap_or(IMPLICIT_CONFIDENCE);
        finite(x, y).then(|| Keypoint::new(part, x, y, c))
    }

    fn named_point(obj: &Map<String, Value>) -> Option<Keypoint> {
        let name = obj
            .get("part")
            .or_else(|| obj.get("name"))
            .and_then(Value::as_str)?;
        let part = match name.parse::<BodyPart>() {
            Ok(p) => p,
            Err(e) => {
                debug!("跳过关键点: {}", e);
                return None;
            }
        };

        let (x, y) = match obj.get("position") {
            Some(Value::Object(pos)) => (
                pos.get("x").and_then(Value::as_f64)?,
                pos.get("y").and_then(Value::as_f64)?,
            ),
            Some(Value::Array(pos)) => (pos.first()?.as_f64()?, pos.get(1)?.as_f64()?),
            _ => (
                obj.get("x").and_then(Value::as_f64)?,
                obj.get("y").and_then(Value::as_f64)?,
            ),
        };
        let (x, y) = (x as f32, y as f32);

        let confidence = obj
            .get("score")
            .or_else(|| obj.get("confidence"))
            .and_then(Value::as_f64)
            .map(|c| c as f32)
            .unwrap_or(IMPLICIT_CONFIDENCE);

        finite(x, y).then(|| Keypoint::new(part, x, y, confidence))
    }
}

fn finite(x: f32, y: f32) -> bool {
    x.is_finite() && y.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_posenet_shape() {
        let subject = json!({
            "score": 0.8,
            "keypoints": [
                {"part": "leftShoulder", "score": 0.9, "position": {"x": 100.0, "y": 50.0}},
                {"part": "rightHip", "score": 0.7, "position": {"x": 120.0, "y": 150.0}}
            ]
        });
        let snap = KeypointAdapter::new().adapt(&subject);
        assert_eq!(snap.len(), 2);
        let ls = snap.get(BodyPart::LeftShoulder).unwrap();
        assert_eq!((ls.x, ls.y, ls.confidence), (100.0, 50.0, 0.9));
    }

    #[test]
    fn test_movenet_snake_case_shape() {
        let subject = json!({
            "keypoints": [
                {"name": "left_hip", "x": 10.0, "y": 20.0, "score": 0.5},
                {"name": "left_pinky", "x": 1.0, "y": 1.0, "score": 0.5}
            ]
        });
        let snap = KeypointAdapter::new().adapt(&subject);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.confidence_of(BodyPart::LeftHip), 0.5);
    }

    #[test]
    fn test_indexed_coco_pairs_without_score() {
        let points: Vec<Value> = (0..17).map(|i| json!([i as f64, 2.0 * i as f64])).collect();
        let snap = KeypointAdapter::new().adapt(&Value::Array(points));
        assert_eq!(snap.len(), 17);
        let rh = snap.get(BodyPart::RightHip).unwrap();
        assert_eq!((rh.x, rh.y, rh.confidence), (12.0, 24.0, 1.0));
    }

    #[test]
    fn test_indexed_blazepose_skips_fingers() {
        let points: Vec<Value> = (0..33).map(|i| json!([i as f64, 0.0, 0.9])).collect();
        let snap = KeypointAdapter::new().adapt(&json!({ "keypoints": points }));
        assert_eq!(snap.len(), 23);
        assert_eq!(snap.get(BodyPart::LeftHip).map(|k| k.x), Some(23.0));
    }

    #[test]
    fn test_malformed_returns_empty() {
        let adapter = KeypointAdapter::new();
        assert!(adapter.adapt(&json!("garbage")).is_empty());
        assert!(adapter.adapt(&json!({"keypoints": 3})).is_empty());
        assert!(adapter.adapt(&json!([[1.0, 2.0], [3.0, 4.0]])).is_empty());
        assert!(adapter.adapt(&json!([{"part": "nose"}])).is_empty());
    }

    #[test]
    fn test_select_highest_scoring_subject() {
        let subjects = vec![
            json!({"score": 0.3, "keypoints": [{"part": "nose", "score": 0.3, "position": {"x": 1.0, "y": 1.0}}]}),
            json!({"score": 0.9, "keypoints": [{"part": "nose", "score": 0.9, "position": {"x": 9.0, "y": 9.0}}]}),
        ];
        let snap = KeypointAdapter::new().select_subject(&subjects);
        assert_eq!(snap.get(BodyPart::Nose).map(|k| k.x), Some(9.0));
        assert!(KeypointAdapter::new().select_subject(&[]).is_empty());
    }

    #[test]
    fn test_position_array_alias() {
        let subject = json!({"keypoints": [
            {"part": "leftShoulder", "score": 0.6, "position": [11.0, 22.0]}
        ]});
        let snap = KeypointAdapter::new().adapt(&subject);
        let ls = snap.get(BodyPart::LeftShoulder).unwrap();
        assert_eq!((ls.x, ls.y, ls.confidence), (11.0, 22.0, 0.6));
    }

    #[test]
    fn test_confidence_field_alias() {
        let subject = json!({"keypoints": [
            {"name": "rightHip", "x": 5.0, "y": 6.0, "confidence": 0.35}
        ]});
        let snap = KeypointAdapter::new().adapt(&subject);
        assert_eq!(snap.confidence_of(BodyPart::RightHip), 0.35);
    }

    #[test]
    fn test_select_falls_back_to_mean_confidence() {
        let subjects = vec![
            json!({"keypoints": [
                {"part": "nose", "score": 0.2, "position": {"x": 1.0, "y": 1.0}},
                {"part": "leftEye", "score": 0.4, "position": {"x": 1.0, "y": 1.0}}
            ]}),
            json!({"keypoints": [
                {"part": "nose", "score": 0.8, "position": {"x": 9.0, "y": 9.0}},
                {"part": "leftEye", "score": 0.6, "position": {"x": 9.0, "y": 9.0}}
            ]}),
        ];
        let snap = KeypointAdapter::new().select_subject(&subjects);
        assert_eq!(snap.get(BodyPart::Nose).map(|k| k.x), Some(9.0));
    }

    #[test]
    fn test_mixed_keypoint_items_yield_empty() {
        let subject = json!({"keypoints": [
            [1.0, 2.0, 0.9],
            {"part": "nose", "score": 0.9, "position": {"x": 1.0, "y": 2.0}}
        ]});
        assert!(KeypointAdapter::new().adapt(&subject).is_empty());
        assert!(KeypointAdapter::new().adapt(&subject["keypoints"]).is_empty());
    }

    #[test]
    fn test_from_coco17_drops_non_finite() {
        let mut pts = vec![(0.0, 0.0, 0.9); 17];
        pts[5] = (f32::NAN, 1.0, 0.9);
        let snap = KeypointAdapter::new().from_coco17(&pts);
        assert_eq!(snap.len(), 16);
        assert!(snap.get(BodyPart::LeftShoulder).is_none());
    }
}
