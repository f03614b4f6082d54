// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 帧节奏调度 (每个周期结束后等待下一帧时机)

use std::time::{Duration, Instant};

pub trait FrameScheduler {
    /// 阻塞到下一帧可以开始
    fn wait_next_frame(&mut self);
}

/// 固定帧率: 周期用时不足帧预算时睡眠补齐
pub struct FixedRateScheduler {
    frame_budget: Duration,
    last: Instant,
    deadline_misses: u64,
}

impl FixedRateScheduler {
    pub fn new(fps: u32) -> Self {
        let frame_budget = Duration::from_millis(1000 / fps.max(1) as u64);
        Self {
            frame_budget,
            last: Instant::now(),
            deadline_misses: 0,
        }
    }

    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// 周期超出帧预算的次数
    pub fn deadline_misses(&self) -> u64 {
        self.deadline_misses
    }
}

impl FrameScheduler for FixedRateScheduler {
    fn wait_next_frame(&mut self) {
        let elapsed = self.last.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        } else {
            self.deadline_misses += 1;
        }
        self.last = Instant::now();
    }
}

/// 不等待 (测试 / 离线回放)
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl FrameScheduler for ImmediateScheduler {
    fn wait_next_frame(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_budget() {
        assert_eq!(FixedRateScheduler::new(30).frame_budget(), Duration::from_millis(33));
        assert_eq!(FixedRateScheduler::new(0).frame_budget(), Duration::from_millis(1000));
    }

    #[test]
    fn test_paces_to_budget() {
        let mut scheduler = FixedRateScheduler::new(100);
        let start = Instant::now();
        scheduler.wait_next_frame();
        scheduler.wait_next_frame();
        assert!(start.elapsed() >= Duration::from_millis(18));
        assert_eq!(scheduler.deadline_misses(), 0);
    }

    #[test]
    fn test_counts_deadline_misses() {
        let mut scheduler = FixedRateScheduler::new(1000);
        std::thread::sleep(Duration::from_millis(5));
        scheduler.wait_next_frame();
        assert_eq!(scheduler.deadline_misses(), 1);
    }
}
