//! 轨迹插值与后台播放
//!
//! 插值目标按 100Hz 写入电机目标位置，由独立线程驱动；
//! 调用方既可以阻塞等待（`wait`），也可以随时取消（`stop`）。
//! `stop()` 在下一次写入之前生效：取消后插值器不会再推动目标。

use crossbeam_channel::{Receiver, bounded};
use magpie_bus::MotorHandle;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// 目标写入周期（100Hz）
pub const UPDATE_RATE_HZ: f64 = 100.0;

/// 插值方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// 线性插值
    Linear,
    /// 最小加加速度（minimum jerk）：端点速度/加速度为 0 的五次多项式
    #[default]
    MinimumJerk,
}

impl InterpolationMode {
    /// 在归一化时间 t ∈ [0, 1] 处计算位置
    pub fn interpolate(&self, start: f64, goal: f64, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let profile = match self {
            InterpolationMode::Linear => t,
            InterpolationMode::MinimumJerk => {
                // 10t³ - 15t⁴ + 6t⁵
                let t3 = t * t * t;
                t3 * (10.0 - 15.0 * t + 6.0 * t * t)
            }
        };
        start + (goal - start) * profile
    }
}

/// 插值写入的目标端
pub trait GoalSink: Send + Sync {
    /// 写入一个目标位置（本地坐标，度）
    fn write_goal(&self, goal: f64);
}

impl GoalSink for MotorHandle {
    fn write_goal(&self, goal: f64) {
        self.set_target_position(goal);
    }
}

/// 轨迹播放器
///
/// 后台线程以绝对时间锚点按 [`UPDATE_RATE_HZ`] 写目标，
/// 最后一拍写入终点值后退出。
pub struct TrajectoryPlayer {
    stopped: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
    done_rx: Receiver<()>,
}

impl TrajectoryPlayer {
    /// 启动一段从 `start` 到 `goal` 的插值运动
    pub fn start(
        sink: Arc<dyn GoalSink>,
        start: f64,
        goal: f64,
        duration: Duration,
        mode: InterpolationMode,
    ) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let playing = Arc::new(AtomicBool::new(true));
        let (done_tx, done_rx) = bounded(1);

        {
            let stopped = stopped.clone();
            let playing = playing.clone();
            std::thread::spawn(move || {
                let period = Duration::from_secs_f64(1.0 / UPDATE_RATE_HZ);
                let begin = Instant::now();
                let mut next_tick = Instant::now();

                loop {
                    // 取消在任何一次写入之前生效
                    if stopped.load(Ordering::Acquire) {
                        trace!("trajectory stopped before completion");
                        break;
                    }

                    let t = if duration.is_zero() {
                        1.0
                    } else {
                        (begin.elapsed().as_secs_f64() / duration.as_secs_f64()).min(1.0)
                    };
                    sink.write_goal(mode.interpolate(start, goal, t));
                    if t >= 1.0 {
                        break;
                    }

                    next_tick += period;
                    let now = Instant::now();
                    if next_tick > now {
                        spin_sleep::sleep(next_tick - now);
                    } else {
                        next_tick = now;
                    }
                }

                playing.store(false, Ordering::Release);
                let _ = done_tx.send(());
            });
        }

        Self {
            stopped,
            playing,
            done_rx,
        }
    }

    /// 取消运动（非阻塞；已写出的最后一个目标保持不变）
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// 阻塞到运动结束（自然完成或被取消）
    pub fn wait(&self) {
        let _ = self.done_rx.recv();
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minjerk_endpoints_and_midpoint() {
        let mode = InterpolationMode::MinimumJerk;
        assert_eq!(mode.interpolate(-20.0, 30.0, 0.0), -20.0);
        assert_eq!(mode.interpolate(-20.0, 30.0, 1.0), 30.0);
        // 对称性：t=0.5 时恰好在中点
        let mid = mode.interpolate(-20.0, 30.0, 0.5);
        assert!((mid - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_minjerk_is_monotone_for_this_profile() {
        let mode = InterpolationMode::MinimumJerk;
        let mut last = f64::NEG_INFINITY;
        for i in 0..=100 {
            let v = mode.interpolate(0.0, 1.0, i as f64 / 100.0);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn test_player_reaches_goal() {
        let motor = MotorHandle::new("m");
        let player = TrajectoryPlayer::start(
            Arc::new(motor.clone()),
            0.0,
            50.0,
            Duration::from_millis(80),
            InterpolationMode::MinimumJerk,
        );
        player.wait();
        assert!(!player.is_playing());
        assert_eq!(motor.target_position(), 50.0);
    }

    #[test]
    fn test_stop_freezes_target() {
        let motor = MotorHandle::new("m");
        let player = TrajectoryPlayer::start(
            Arc::new(motor.clone()),
            0.0,
            100.0,
            Duration::from_millis(500),
            InterpolationMode::Linear,
        );
        std::thread::sleep(Duration::from_millis(50));
        player.stop();
        player.wait();

        let frozen = motor.target_position();
        assert!(frozen < 100.0, "stop() should interrupt the motion");
        std::thread::sleep(Duration::from_millis(50));
        // 取消之后插值器不再推动目标
        assert_eq!(motor.target_position(), frozen);
    }

    #[test]
    fn test_zero_duration_jumps_to_goal() {
        let motor = MotorHandle::new("m");
        let player = TrajectoryPlayer::start(
            Arc::new(motor.clone()),
            5.0,
            25.0,
            Duration::ZERO,
            InterpolationMode::Linear,
        );
        player.wait();
        assert_eq!(motor.target_position(), 25.0);
    }
}
