/// 姿态数据系统 (Pose Data)
///
/// 姿态模型本身是外部黑盒,这里只负责把它的输出规整成统一结构
/// - Keypoint / PoseSnapshot: 单帧单目标的关键点
/// - KeypointAdapter:        多后端格式适配 (PoseNet / MoveNet / BlazePose / YOLOv8-pose)
pub mod adapter;
pub mod keypoint;

pub use adapter::KeypointAdapter;
pub use keypoint::{BodyPart, Keypoint, PoseSnapshot, UnknownBodyPart, SKELETON_EDGES};
