// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 姿态数据源 (Pose source)
//!
//! 姿态模型在进程外运行 (浏览器 tfjs / Python / ONNX), 通过 JSON lines 把
//! 每帧检测到的目标送进来。每行一帧, 支持三种写法:
//! - 单个目标:    `{"keypoints": [...]}`
//! - 目标数组:    `[{"keypoints": [...]}, ...]`
//! - 带画面尺寸:  `{"width": 640, "height": 480, "poses": [...]}`

use std::io::BufRead;

use serde_json::Value;
use tracing::warn;

use crate::error::SourceError;

/// 默认画面尺寸 (与网页端摄像头输入一致)
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;
/// 画面宽高上限, 超出时按默认尺寸处理
pub const MAX_FRAME_DIMENSION: u32 = 8192;

/// 一帧姿态模型输出 (原始格式, 交给 KeypointAdapter 规整)
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    pub frame_id: u64,
    pub width: u32,
    pub height: u32,
    pub subjects: Vec<Value>,
}

/// 姿态数据源 (外部协作者)
pub trait PoseSource {
    fn next_frame(&mut self) -> Result<PoseFrame, SourceError>;
}

impl<S: PoseSource + ?Sized> PoseSource for Box<S> {
    fn next_frame(&mut self) -> Result<PoseFrame, SourceError> {
        (**self).next_frame()
    }
}

pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    frame_id: u64,
    line: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            frame_id: 0,
            line: String::new(),
        }
    }

    fn parse_line(&self, line: &str) -> PoseFrame {
        let mut frame = PoseFrame {
            frame_id: self.frame_id,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            subjects: Vec::new(),
        };

        match serde_json::from_str::<Value>(line) {
            Ok(Value::Array(subjects)) => frame.subjects = subjects,
            Ok(Value::Object(mut obj)) => {
                let frame_id = self.frame_id;
                let dim = |v: Option<&Value>, default: u32| match v.and_then(Value::as_u64) {
                    Some(d) if (1..=MAX_FRAME_DIMENSION as u64).contains(&d) => d as u32,
                    Some(d) => {
                        warn!("⚠️ 第{}帧画面尺寸 {} 超出范围, 使用默认值 {}", frame_id, d, default);
                        default
                    }
                    None => default,
                };
                frame.width = dim(obj.get("width"), DEFAULT_FRAME_WIDTH);
                frame.height = dim(obj.get("height"), DEFAULT_FRAME_HEIGHT);
                match obj.remove("poses") {
                    Some(Value::Array(poses)) => frame.subjects = poses,
                    Some(other) => {
                        warn!("⚠️ 第{}帧 poses 字段不是数组: {}", self.frame_id, other)
                    }
                    None => frame.subjects = vec![Value::Object(obj)],
                }
            }
            Ok(other) => warn!("⚠️ 第{}帧格式无法识别: {}", self.frame_id, other),
            Err(e) => warn!("⚠️ 第{}帧 JSON 解析失败: {}", self.frame_id, e),
        }

        frame
    }
}

impl<R: BufRead> PoseSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<PoseFrame, SourceError> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|e| SourceError::Fatal(e.to_string()))?;
            if read == 0 {
                return Err(SourceError::Exhausted);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.frame_id += 1;
            return Ok(self.parse_line(trimmed));
        }
    }
}
