//! 闭环归零标定
//!
//! 把三盘轨道执行器从任意上电姿态驱动到可复现的机械零位。
//! 上电时绝对位置不可信，唯一可靠的反馈是转速：
//! 盘被压向机械限位后转速回到非负，即判定到位（堵转检测）。
//!
//! 状态机顺序执行，对调用方阻塞；所有等待都是固定间隔轮询，
//! 阈值与这些间隔是配套整定的，不要改动节拍。

use crate::error::PartError;
use crate::orbita::OrbitaActuator;
use nalgebra::UnitQuaternion;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 归零标定配置
///
/// 默认值是整机整定结果；测试可以压缩各时长。
#[derive(Debug, Clone)]
pub struct HomingConfig {
    /// 压向限位的目标角（刻意超出物理行程）
    pub limit_position: f64,
    /// 离开限位的回退角（标定后的工作零位）
    pub back_off_position: f64,
    /// 堵转检测采样间隔
    pub sample_interval: Duration,
    /// 滚动窗口长度（采样数）
    pub window: usize,
    /// 置零后的沉降时间
    pub zero_settle: Duration,
    /// 退出柔顺后的驱动器生效时间
    pub engage_settle: Duration,
    /// 压限位指令发出后的预热时间（预热期内不做检测）
    pub seek_warmup: Duration,
    /// 限位处置零后的沉降时间
    pub limit_settle: Duration,
    /// 回退运动的固定等待（不做反馈判定，标定容差内）
    pub back_off_wait: Duration,
    /// 工作零位置零后的沉降时间
    pub final_settle: Duration,
    /// 基准姿态指令的运动时长
    pub reference_duration: Duration,
    /// 基准姿态指令后的等待
    pub reference_wait: Duration,
    /// 堵转检测的最长等待；`None` 表示无限等待
    pub max_stall_wait: Option<Duration>,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            limit_position: -270.0,
            back_off_position: 102.0,
            sample_interval: Duration::from_millis(10),
            window: 10,
            zero_settle: Duration::from_millis(100),
            engage_settle: Duration::from_millis(100),
            seek_warmup: Duration::from_secs(1),
            limit_settle: Duration::from_secs(1),
            back_off_wait: Duration::from_millis(2500),
            final_settle: Duration::from_millis(500),
            reference_duration: Duration::from_secs(1),
            reference_wait: Duration::from_secs(2),
            max_stall_wait: None,
        }
    }
}

/// 标定状态机的各阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    Idle,
    /// 以当前原始读数为基准置零
    ZeroEncoders,
    Settle,
    /// 退出柔顺，进入位置控制
    Engage,
    /// 压向机械限位
    SeekLimit,
    /// 转速堵转检测
    DetectStall,
    /// 在共同的物理基准（限位）处再次置零
    ZeroAtLimit,
    /// 回退到工作零位
    BackOff,
    /// 在工作零位最终置零
    FinalZero,
    /// 清除模型累计角并命令基准姿态
    ModelReset,
    Calibrated,
}

/// 堵转检测器
///
/// 每盘维护最近 K 个转速样本的滚动均值。
/// 全部盘的均值 ≥ 0 即认为都已顶到限位
/// （被驱动向负方向的盘，堵转后转速回弹到非负）。
pub struct StallDetector {
    window: VecDeque<[f64; 3]>,
    capacity: usize,
}

impl StallDetector {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 追加一组三盘转速样本
    pub fn push(&mut self, speeds: [f64; 3]) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(speeds);
    }

    /// 当前各盘滚动均值（无样本时为 NaN）
    pub fn rolling_means(&self) -> [f64; 3] {
        if self.window.is_empty() {
            return [f64::NAN; 3];
        }
        let n = self.window.len() as f64;
        let mut sums = [0.0f64; 3];
        for sample in &self.window {
            for (sum, v) in sums.iter_mut().zip(sample) {
                *sum += v;
            }
        }
        sums.map(|s| s / n)
    }

    /// 所有盘的滚动均值都 ≥ 0？
    ///
    /// NaN 均值（无样本或样本含 NaN）不满足条件：
    /// 读数失败被当作"条件尚未达成"，继续轮询。
    pub fn all_stalled(&self) -> bool {
        self.rolling_means().iter().all(|mean| *mean >= 0.0)
    }
}

/// 归零标定控制器
pub struct CalibrationController {
    config: HomingConfig,
    phase: Mutex<HomingPhase>,
}

impl CalibrationController {
    pub fn new(config: HomingConfig) -> Self {
        Self {
            config,
            phase: Mutex::new(HomingPhase::Idle),
        }
    }

    /// 当前阶段（可从其他线程观察）
    pub fn phase(&self) -> HomingPhase {
        *self.phase.lock()
    }

    fn enter(&self, phase: HomingPhase) {
        debug!(?phase, "homing phase");
        *self.phase.lock() = phase;
    }

    /// 执行完整标定流程（阻塞到 Calibrated 或出错）
    pub fn run(&self, orbita: &OrbitaActuator) -> Result<(), PartError> {
        let cfg = &self.config;
        info!(actuator = orbita.name(), "starting homing calibration");

        self.enter(HomingPhase::ZeroEncoders);
        orbita.disks().set_to_zero_all();

        self.enter(HomingPhase::Settle);
        spin_sleep::sleep(cfg.zero_settle);

        self.enter(HomingPhase::Engage);
        orbita.set_compliant(false);
        spin_sleep::sleep(cfg.engage_settle);

        // 直接写盘目标，绕过姿态模型
        self.enter(HomingPhase::SeekLimit);
        for disk in orbita.disks().iter() {
            disk.set_target_position(cfg.limit_position);
        }
        spin_sleep::sleep(cfg.seek_warmup);

        self.enter(HomingPhase::DetectStall);
        let mut detector = StallDetector::new(cfg.window);
        let started = Instant::now();
        loop {
            detector.push(orbita.disks().speeds());
            if detector.all_stalled() {
                break;
            }
            if let Some(max_wait) = cfg.max_stall_wait {
                if started.elapsed() >= max_wait {
                    return Err(PartError::CalibrationTimeout {
                        waited: started.elapsed(),
                    });
                }
            }
            spin_sleep::sleep(cfg.sample_interval);
        }
        debug!(elapsed = ?started.elapsed(), "all disks reached the hard stop");

        self.enter(HomingPhase::ZeroAtLimit);
        orbita.disks().set_to_zero_all();
        spin_sleep::sleep(cfg.limit_settle);

        self.enter(HomingPhase::BackOff);
        for disk in orbita.disks().iter() {
            disk.set_target_position(cfg.back_off_position);
        }
        spin_sleep::sleep(cfg.back_off_wait);

        self.enter(HomingPhase::FinalZero);
        orbita.disks().set_to_zero_all();
        spin_sleep::sleep(cfg.final_settle);

        self.enter(HomingPhase::ModelReset);
        orbita.model().reset_last_angles();
        let players = orbita.orient(UnitQuaternion::identity(), cfg.reference_duration, false);
        for player in &players {
            player.wait();
        }
        spin_sleep::sleep(cfg.reference_wait);

        self.enter(HomingPhase::Calibrated);
        info!(actuator = orbita.name(), "homing calibration complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbita::{OrbitaActuator, OrbitaConfig};
    use magpie_bus::{DiskGroup, MotorHandle};
    use nalgebra::Rotation3;
    use std::sync::Arc;

    fn fast_config() -> HomingConfig {
        HomingConfig {
            sample_interval: Duration::from_millis(1),
            zero_settle: Duration::from_millis(2),
            engage_settle: Duration::from_millis(2),
            seek_warmup: Duration::from_millis(5),
            limit_settle: Duration::from_millis(2),
            back_off_wait: Duration::from_millis(5),
            final_settle: Duration::from_millis(2),
            reference_duration: Duration::from_millis(10),
            reference_wait: Duration::from_millis(2),
            ..HomingConfig::default()
        }
    }

    fn test_orbita() -> (OrbitaActuator, DiskGroup) {
        let disks = DiskGroup {
            bottom: MotorHandle::new("disk_bottom"),
            middle: MotorHandle::new("disk_middle"),
            top: MotorHandle::new("disk_top"),
        };
        let orbita = OrbitaActuator::new(
            "neck",
            disks.clone(),
            &OrbitaConfig {
                r: 36.7,
                wheel_size: 62.0,
                reduction: 77.35,
                pid: [10.0, 0.04, 90.0],
                r0: Rotation3::identity(),
            },
        );
        (orbita, disks)
    }

    /// 滚动均值恰好在第一个满足条件的样本处翻转
    #[test]
    fn test_detector_exits_exactly_when_mean_crosses_zero() {
        let mut detector = StallDetector::new(10);
        for _ in 0..10 {
            detector.push([-10.0; 3]);
            assert!(!detector.all_stalled());
        }
        // 窗口 [-10 ×(10-k), 1.0 ×k]：均值 (11k-100)/10，k=10 时才翻正
        for k in 1..=9 {
            detector.push([1.0; 3]);
            assert!(!detector.all_stalled(), "must not trigger at sample {}", k);
        }
        detector.push([1.0; 3]);
        assert!(detector.all_stalled());
    }

    /// 任何一盘未堵转都不能触发
    #[test]
    fn test_detector_requires_all_disks() {
        let mut detector = StallDetector::new(10);
        detector.push([1.0, 1.0, -0.5]);
        assert!(!detector.all_stalled());
        detector.push([1.0, 1.0, 0.5]);
        assert!(detector.all_stalled());
    }

    /// 空窗口与 NaN 样本都视为"条件尚未达成"
    #[test]
    fn test_detector_nan_and_empty() {
        let detector = StallDetector::new(10);
        assert!(!detector.all_stalled());

        let mut detector = StallDetector::new(10);
        detector.push([f64::NAN, 1.0, 1.0]);
        assert!(!detector.all_stalled());
    }

    #[test]
    fn test_full_homing_sequence() {
        let (orbita, disks) = test_orbita();
        // 盘上电停在任意原始位置
        disks.bottom.store_raw_position(310.0);
        disks.middle.store_raw_position(-42.0);
        disks.top.store_raw_position(127.5);
        // 压限位期间转速为负
        for d in disks.iter() {
            d.store_speed(-25.0);
        }

        let controller = Arc::new(CalibrationController::new(fast_config()));
        let runner = {
            let controller = controller.clone();
            let orbita = Arc::new(orbita);
            let orbita_ref = orbita.clone();
            std::thread::spawn(move || controller.run(&orbita_ref))
        };

        // 等进入堵转检测阶段，再让盘逐个"顶住"
        while controller.phase() != HomingPhase::DetectStall {
            std::thread::sleep(Duration::from_millis(1));
        }
        std::thread::sleep(Duration::from_millis(30));
        disks.bottom.store_speed(0.0);
        disks.middle.store_speed(0.0);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(controller.phase(), HomingPhase::DetectStall);
        disks.top.store_speed(0.0);

        runner.join().unwrap().unwrap();
        assert_eq!(controller.phase(), HomingPhase::Calibrated);

        // 最终零位：工作位置读数为 0，压限位目标已被回退/基准指令覆盖
        for d in disks.iter() {
            assert!(d.position().abs() < 1e-9);
            assert!(d.target_position() > -270.0);
            assert!(!d.compliant());
        }
    }

    #[test]
    fn test_homing_timeout_when_disks_never_stall() {
        let (orbita, disks) = test_orbita();
        for d in disks.iter() {
            d.store_speed(-25.0);
        }

        let controller = CalibrationController::new(HomingConfig {
            max_stall_wait: Some(Duration::from_millis(40)),
            ..fast_config()
        });
        let err = controller.run(&orbita).unwrap_err();
        assert!(matches!(err, PartError::CalibrationTimeout { .. }));
    }
}
