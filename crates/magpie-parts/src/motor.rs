//! 动力电机封装
//!
//! 在原始电机句柄之上叠加装配参数（零偏、安装方向），
//! 对外暴露统一的本地角度坐标，并提供轨迹 goto。

use crate::trajectory::{GoalSink, InterpolationMode, TrajectoryPlayer};
use magpie_bus::MotorHandle;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// 安装方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// 正装：电机角度与部件角度同向
    #[default]
    Direct,
    /// 反装：电机角度取反
    Indirect,
}

/// 电机装配配置
#[derive(Debug, Clone, Copy)]
pub struct MotorConfig {
    /// 总线 ID
    pub id: u8,
    /// 装配零偏（度）
    pub offset: f64,
    /// 安装方向
    pub direction: Direction,
}

impl MotorConfig {
    pub fn new(id: u8, offset: f64, direction: Direction) -> Self {
        Self {
            id,
            offset,
            direction,
        }
    }
}

/// 带坐标换算的电机封装（可克隆，克隆共享同一底层句柄）
#[derive(Clone)]
pub struct DxlMotor {
    handle: MotorHandle,
    local_name: String,
    offset: f64,
    direct: bool,
}

impl DxlMotor {
    pub fn new(handle: MotorHandle, local_name: impl Into<String>, config: &MotorConfig) -> Self {
        Self {
            handle,
            local_name: local_name.into(),
            offset: config.offset,
            direct: matches!(config.direction, Direction::Direct),
        }
    }

    /// 全名（如 `hand.gripper`）
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// 部件内的局部名（如 `gripper`）
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// 底层句柄
    pub fn handle(&self) -> &MotorHandle {
        &self.handle
    }

    fn as_local(&self, motor_pos: f64) -> f64 {
        (if self.direct { motor_pos } else { -motor_pos }) - self.offset
    }

    fn to_motor(&self, local_pos: f64) -> f64 {
        (local_pos + self.offset) * if self.direct { 1.0 } else { -1.0 }
    }

    /// 当前位置（装配坐标，度）
    pub fn present_position(&self) -> f64 {
        self.as_local(self.handle.position())
    }

    /// 当前目标位置（装配坐标，度）
    pub fn goal_position(&self) -> f64 {
        self.as_local(self.handle.target_position())
    }

    /// 设置目标位置；柔顺状态下忽略
    pub fn set_goal_position(&self, goal: f64) {
        if !self.compliant() {
            self.handle.set_target_position(self.to_motor(goal));
        }
    }

    pub fn compliant(&self) -> bool {
        self.handle.compliant()
    }

    pub fn set_compliant(&self, compliant: bool) {
        self.handle.set_compliant(compliant);
    }

    /// 从当前位置向 `goal` 插值运动
    pub fn goto(
        &self,
        goal: f64,
        duration: Duration,
        mode: InterpolationMode,
        wait: bool,
    ) -> TrajectoryPlayer {
        let player = TrajectoryPlayer::start(
            Arc::new(self.clone()),
            self.present_position(),
            goal,
            duration,
            mode,
        );
        if wait {
            player.wait();
        }
        player
    }
}

impl GoalSink for DxlMotor {
    fn write_goal(&self, goal: f64) {
        self.set_goal_position(goal);
    }
}

impl fmt::Debug for DxlMotor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.compliant() { "compliant" } else { "stiff" };
        write!(
            f,
            "<DxlMotor \"{}\" pos={:.2} mode={}>",
            self.name(),
            self.present_position(),
            mode
        )
    }
}
