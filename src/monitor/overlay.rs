// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 骨架叠加渲染 (Skeleton overlay)
//!
//! 实时画面由前端负责绘制; 这里负责状态横幅日志, 以及在跌倒发生时
//! 把骨架画到一张 RGBA 画布上存档 (可选)。

use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use tracing::{info, warn};

use super::driver::FrameRenderer;
use super::source::{PoseFrame, MAX_FRAME_DIMENSION};
use crate::detection::FallVerdict;
use crate::error::{Result, SentinelError};
use crate::gen_time_string;
use crate::pose::{PoseSnapshot, SKELETON_EDGES};

const AQUA: Rgba<u8> = Rgba([0, 255, 255, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const KEYPOINT_RADIUS: i32 = 5;

pub struct OverlayRenderer {
    min_confidence: f32,
    snapshot_dir: Option<PathBuf>,
    fall_active: bool,
    saved: Vec<PathBuf>,
}

impl OverlayRenderer {
    pub fn new(min_confidence: f32, snapshot_dir: Option<PathBuf>) -> Self {
        Self {
            min_confidence,
            snapshot_dir,
            fall_active: false,
            saved: Vec::new(),
        }
    }

    /// 已保存的跌倒截图
    pub fn saved_snapshots(&self) -> &[PathBuf] {
        &self.saved
    }

    /// 绘制关键点与骨架 (跌倒时关键点为红色, 否则为青色; 骨架始终为红色)
    ///
    /// 宽高为 0 或超过 `MAX_FRAME_DIMENSION` 时返回 `SentinelError::Render`
    pub fn draw(
        &self,
        width: u32,
        height: u32,
        snapshot: &PoseSnapshot,
        is_fall: bool,
    ) -> Result<RgbaImage> {
        let valid = 1..=MAX_FRAME_DIMENSION;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(SentinelError::Render(format!(
                "canvas {}x{} out of range (max {})",
                width, height, MAX_FRAME_DIMENSION
            )));
        }
        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
        let point_color = if is_fall { RED } else { AQUA };

        // 绘制骨架连接
        for (a, b) in SKELETON_EDGES.iter() {
            if let (Some(p1), Some(p2)) = (
                snapshot.confident(*a, self.min_confidence),
                snapshot.confident(*b, self.min_confidence),
            ) {
                draw_line_segment_mut(&mut canvas, (p1.x, p1.y), (p2.x, p2.y), RED);
            }
        }

        // 绘制关键点
        for kp in snapshot.keypoints() {
            if kp.is_valid(self.min_confidence) {
                draw_filled_circle_mut(
                    &mut canvas,
                    (kp.x.round() as i32, kp.y.round() as i32),
                    KEYPOINT_RADIUS,
                    point_color,
                );
            }
        }

        Ok(canvas)
    }

    fn save_snapshot(&mut self, frame: &PoseFrame, snapshot: &PoseSnapshot) -> Result<()> {
        let Some(dir) = &self.snapshot_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("fall_{}_{}.png", gen_time_string("-"), frame.frame_id));
        self.draw(frame.width, frame.height, snapshot, true)?.save(&path)?;
        info!("📸 跌倒截图已保存: {}", path.display());
        self.saved.push(path);
        Ok(())
    }
}

impl FrameRenderer for OverlayRenderer {
    fn render(&mut self, frame: &PoseFrame, snapshot: &PoseSnapshot, verdict: &FallVerdict) -> Result<()> {
        match (self.fall_active, verdict.is_fall) {
            (false, true) => {
                self.fall_active = true;
                warn!(
                    "🚨 Fall Detected! Calling caregiver... (第{}帧, 躯干角度 {:.1}°)",
                    frame.frame_id,
                    verdict.angle_degrees.unwrap_or_default()
                );
                self.save_snapshot(frame, snapshot)?;
            }
            (true, false) => {
                self.fall_active = false;
                info!("✅ 跌倒状态解除 (第{}帧)", frame.frame_id);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{BodyPart, Keypoint};

    fn snapshot() -> PoseSnapshot {
        PoseSnapshot::new(vec![
            Keypoint::new(BodyPart::LeftShoulder, 10.0, 10.0, 0.9),
            Keypoint::new(BodyPart::RightShoulder, 50.0, 10.0, 0.9),
            Keypoint::new(BodyPart::Nose, 30.0, 40.0, 0.05),
        ])
    }

    fn frame(id: u64) -> PoseFrame {
        PoseFrame {
            frame_id: id,
            width: 64,
            height: 48,
            subjects: Vec::new(),
        }
    }

    #[test]
    fn test_draw_colors_and_confidence_filter() {
        let renderer = OverlayRenderer::new(0.2, None);
        let normal = renderer.draw(64, 48, &snapshot(), false).unwrap();
        assert_eq!(normal.dimensions(), (64, 48));
        assert_eq!(*normal.get_pixel(10, 10), AQUA);
        assert_eq!(*normal.get_pixel(30, 10), RED); // 肩膀连线
        assert_eq!(*normal.get_pixel(30, 40), BACKGROUND); // 低置信度鼻子不画

        let fall = renderer.draw(64, 48, &snapshot(), true).unwrap();
        assert_eq!(*fall.get_pixel(50, 10), RED);
    }

    #[test]
    fn test_oversized_canvas_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = OverlayRenderer::new(0.2, Some(dir.path().to_path_buf()));
        let huge = PoseFrame {
            frame_id: 1,
            width: u32::MAX,
            height: u32::MAX,
            subjects: Vec::new(),
        };
        let fall = FallVerdict {
            is_fall: true,
            angle_degrees: Some(2.0),
        };

        assert!(matches!(
            renderer.draw(u32::MAX, u32::MAX, &snapshot(), true),
            Err(SentinelError::Render(_))
        ));
        assert!(matches!(renderer.draw(0, 48, &snapshot(), true), Err(SentinelError::Render(_))));
        assert!(matches!(
            renderer.render(&huge, &snapshot(), &fall),
            Err(SentinelError::Render(_))
        ));
        assert!(renderer.saved_snapshots().is_empty());
    }

    #[test]
    fn test_saves_snapshot_on_rising_edge_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = OverlayRenderer::new(0.2, Some(dir.path().to_path_buf()));
        let fall = FallVerdict {
            is_fall: true,
            angle_degrees: Some(2.0),
        };
        let upright = FallVerdict {
            is_fall: false,
            angle_degrees: Some(90.0),
        };

        renderer.render(&frame(1), &snapshot(), &fall).unwrap();
        renderer.render(&frame(2), &snapshot(), &fall).unwrap();
        assert_eq!(renderer.saved_snapshots().len(), 1);
        assert!(renderer.saved_snapshots()[0].exists());

        renderer.render(&frame(3), &snapshot(), &upright).unwrap();
        renderer.render(&frame(4), &snapshot(), &fall).unwrap();
        assert_eq!(renderer.saved_snapshots().len(), 2);
    }
}
