//! 手部部件与力控夹爪
//!
//! 抓握是一个离散时间的力反馈调节器（带迟滞），不是连续控制器：
//! 步长、死区宽度和轮询节拍都编码了机械整定结果，保持原样。

use crate::error::PartError;
use crate::motor::{Direction, DxlMotor, MotorConfig};
use crate::part::Part;
use crate::trajectory::InterpolationMode;
use magpie_bus::{IoBackend, SensorHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 抓握调节器参数（默认值为整机整定结果）
#[derive(Debug, Clone)]
pub struct GripConfig {
    /// 位置安全阈值：空抓时防止过行程
    pub safety_position: f64,
    /// 过冲死区宽度：力超出 `目标 + band` 才回退
    pub overshoot_band: f64,
    /// 回退步长（度/拍）
    pub release_step: f64,
    /// 回退节拍
    pub release_tick: Duration,
    /// 触发轮询间隔
    pub poll_interval: Duration,
    /// 取消运动后的沉降时间
    pub trigger_settle: Duration,
    /// 钉住目标后的沉降时间
    pub pin_settle: Duration,
}

impl Default for GripConfig {
    fn default() -> Self {
        Self {
            safety_position: 15.0,
            overshoot_band: 30.0,
            release_step: 0.1,
            release_tick: Duration::from_millis(20),
            poll_interval: Duration::from_millis(10),
            trigger_settle: Duration::from_millis(100),
            pin_settle: Duration::from_millis(250),
        }
    }
}

/// 手部基类部件
pub struct Hand {
    part: Part,
}

impl Hand {
    pub fn new(backend: Arc<dyn IoBackend>) -> Self {
        Self {
            part: Part::new("hand", backend),
        }
    }

    pub fn part(&self) -> &Part {
        &self.part
    }
}

/// 力控夹爪（腕部两轴 + 夹爪 + 力传感器）
pub struct ForceGripper {
    part: Part,
    gripper: DxlMotor,
    load_sensor: SensorHandle,
    grip: GripConfig,
}

impl ForceGripper {
    /// 默认张开位置
    pub const DEFAULT_OPEN_POS: f64 = -20.0;
    /// 默认闭合位置
    pub const DEFAULT_CLOSE_POS: f64 = 30.0;
    /// 默认目标握力
    pub const DEFAULT_GRIP_FORCE: f64 = 50.0;

    pub fn new(backend: Arc<dyn IoBackend>) -> Result<Self, PartError> {
        Self::with_grip_config(backend, GripConfig::default())
    }

    pub fn with_grip_config(
        backend: Arc<dyn IoBackend>,
        grip: GripConfig,
    ) -> Result<Self, PartError> {
        let mut part = Part::new("hand", backend);
        part.attach_motor("wrist_pitch", MotorConfig::new(15, 0.0, Direction::Indirect))?;
        part.attach_motor("wrist_roll", MotorConfig::new(16, 0.0, Direction::Indirect))?;
        let gripper = part.attach_motor("gripper", MotorConfig::new(17, 0.0, Direction::Direct))?;

        let load_sensor = part.backend().resolve_sensor("force_gripper")?;
        load_sensor.set_offset(4.0);
        load_sensor.set_scale(10_000.0);

        info!("force gripper ready");
        Ok(Self {
            part,
            gripper,
            load_sensor,
            grip,
        })
    }

    pub fn part(&self) -> &Part {
        &self.part
    }

    pub fn gripper(&self) -> &DxlMotor {
        &self.gripper
    }

    /// 当前握力读数（无数据时为 NaN）
    pub fn grip_force(&self) -> f64 {
        self.load_sensor.reading()
    }

    /// 张开夹爪：最小加加速度插值，阻塞到运动结束
    pub fn open(&self, end_pos: f64, duration: Duration) {
        self.gripper
            .goto(end_pos, duration, InterpolationMode::MinimumJerk, true);
    }

    /// 闭合抓握
    ///
    /// 非阻塞地向 `end_pos` 插值，同时以固定间隔轮询握力；
    /// 力达到 `target_grip_force` 或位置越过安全阈值即触发：
    /// 取消插值 -> 沉降 -> 把目标钉在当前实测位置（从轨迹控制转为
    /// 静态保持，防止插值器继续推）。若力超出 `目标 + 死区`，
    /// 以固定小步回退目标直到回到死区内。
    ///
    /// NaN 力读数不满足任何触发比较，轮询会继续等待。
    pub fn close(&self, end_pos: f64, duration: Duration, target_grip_force: f64) {
        let motion = self
            .gripper
            .goto(end_pos, duration, InterpolationMode::MinimumJerk, false);

        loop {
            let force = self.grip_force();
            let position = self.gripper.present_position();
            if force >= target_grip_force || position >= self.grip.safety_position {
                debug!(force, position, "grip trigger");
                break;
            }
            spin_sleep::sleep(self.grip.poll_interval);
        }

        motion.stop();
        spin_sleep::sleep(self.grip.trigger_settle);

        self.gripper.set_goal_position(self.gripper.present_position());
        spin_sleep::sleep(self.grip.pin_settle);

        while self.grip_force() > target_grip_force + self.grip.overshoot_band {
            self.gripper
                .set_goal_position(self.gripper.goal_position() - self.grip.release_step);
            spin_sleep::sleep(self.grip.release_tick);
        }
    }

    pub fn teardown(&self) {
        self.part.teardown();
    }
}
