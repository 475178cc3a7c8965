//! 轨道执行器（三盘球面关节）
//!
//! 三只盘在单一姿态指令下联动；`OrbitaModel` 负责把笛卡尔姿态目标
//! 换算成各盘的累计角度。归零标定直接操作盘的原始目标，绕过模型。
//!
//! 模型是一个窄接口的运动学协作件：盘轴按 120° 均布，
//! 姿态相对基准 `r0` 的旋转向量投影到各盘方向并按轮系几何放大。
//! 盘角做就近展开（unwrap）以保持连续控制，`reset_last_angles`
//! 在重新归零后清除累计状态。

use crate::trajectory::{InterpolationMode, TrajectoryPlayer};
use magpie_bus::DiskGroup;
use nalgebra::{Rotation3, UnitQuaternion, Vector3};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 轨道执行器几何与驱动配置
#[derive(Debug, Clone)]
pub struct OrbitaConfig {
    /// 臂旋转圆半径（mm）
    pub r: f64,
    /// 轮径（mm）
    pub wheel_size: f64,
    /// 驱动器侧减速比（随配置下发给盘控制器）
    pub reduction: f64,
    /// 盘位置环 PID 系数
    pub pid: [f64; 3],
    /// 基准姿态
    pub r0: Rotation3<f64>,
}

/// 姿态 -> 盘角换算模型
pub struct OrbitaModel {
    r0: UnitQuaternion<f64>,
    /// 轮系放大倍数：r / 轮半径
    amplification: f64,
    /// 盘 i 的投影方向：平面分量按 120° 均布，叠加共转分量
    axes: [Vector3<f64>; 3],
    /// 各盘最近一次输出角（展开用累计状态）
    last_angles: Mutex<[f64; 3]>,
}

impl OrbitaModel {
    pub fn new(config: &OrbitaConfig) -> Self {
        let axes = std::array::from_fn(|i| {
            let phi = (i as f64) * 120f64.to_radians();
            Vector3::new(phi.cos(), phi.sin(), 1.0)
        });
        Self {
            r0: UnitQuaternion::from_rotation_matrix(&config.r0),
            amplification: config.r / (config.wheel_size / 2.0),
            axes,
            last_angles: Mutex::new([0.0; 3]),
        }
    }

    /// 由目标姿态计算三盘累计角度（度，[底, 中, 顶]）
    pub fn angles_from_quaternion(&self, orientation: UnitQuaternion<f64>) -> [f64; 3] {
        let relative = self.r0.inverse() * orientation;
        let rotvec = relative.scaled_axis();

        let mut last = self.last_angles.lock();
        std::array::from_fn(|i| {
            let raw = self.amplification * rotvec.dot(&self.axes[i]).to_degrees();
            let unwrapped = unwrap_nearest(raw, last[i]);
            last[i] = unwrapped;
            unwrapped
        })
    }

    /// 由指向向量（加绕轴角）计算盘角
    pub fn angles_from_vector(&self, vector: Vector3<f64>, angle_deg: f64) -> [f64; 3] {
        let pointing = quaternion_between(Vector3::x(), vector);
        let roll =
            UnitQuaternion::from_axis_angle(&nalgebra::Unit::new_normalize(vector), angle_deg.to_radians());
        self.angles_from_quaternion(roll * pointing)
    }

    /// 清除累计角状态（重新归零后必须调用，避免携带过期的绕圈计数）
    pub fn reset_last_angles(&self) {
        *self.last_angles.lock() = [0.0; 3];
    }
}

/// 把 `raw` 平移整数圈，取距 `last` 最近的等价角
fn unwrap_nearest(raw: f64, last: f64) -> f64 {
    raw + 360.0 * ((last - raw) / 360.0).round()
}

/// 两个方向向量之间的最短旋转（反平行时绕 z 转半圈）
pub fn quaternion_between(from: Vector3<f64>, to: Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::rotation_between(&from, &to)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::PI))
}

/// 三盘轨道执行器
pub struct OrbitaActuator {
    name: String,
    disks: DiskGroup,
    model: OrbitaModel,
}

impl OrbitaActuator {
    pub fn new(name: impl Into<String>, disks: DiskGroup, config: &OrbitaConfig) -> Self {
        let name = name.into();
        debug!(
            actuator = %name,
            reduction = config.reduction,
            wheel_size = config.wheel_size,
            pid = ?config.pid,
            "configuring orbita disks"
        );
        Self {
            name,
            disks,
            model: OrbitaModel::new(config),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 原始盘句柄（归零标定在这里绕过模型）
    pub fn disks(&self) -> &DiskGroup {
        &self.disks
    }

    pub fn model(&self) -> &OrbitaModel {
        &self.model
    }

    pub fn compliant(&self) -> bool {
        self.disks.iter().all(|d| d.compliant())
    }

    pub fn set_compliant(&self, compliant: bool) {
        self.disks.set_compliant_all(compliant);
    }

    /// 三盘插值到指定角度（[底, 中, 顶]，度）
    pub fn goto(
        &self,
        thetas: [f64; 3],
        duration: Duration,
        mode: InterpolationMode,
        wait: bool,
    ) -> Vec<TrajectoryPlayer> {
        let players: Vec<_> = self
            .disks
            .iter()
            .zip(thetas)
            .map(|(disk, theta)| {
                TrajectoryPlayer::start(
                    Arc::new(disk.clone()),
                    disk.position(),
                    theta,
                    duration,
                    mode,
                )
            })
            .collect();
        if wait {
            for player in &players {
                player.wait();
            }
        }
        players
    }

    /// 姿态控制（四元数目标）
    pub fn orient(
        &self,
        orientation: UnitQuaternion<f64>,
        duration: Duration,
        wait: bool,
    ) -> Vec<TrajectoryPlayer> {
        let thetas = self.model.angles_from_quaternion(orientation);
        // 编码器反向安装，盘角取反
        self.goto(
            thetas.map(|t| -t),
            duration,
            InterpolationMode::MinimumJerk,
            wait,
        )
    }

    /// 指向控制（方向向量 + 绕轴角）
    pub fn point_at(
        &self,
        vector: Vector3<f64>,
        angle_deg: f64,
        duration: Duration,
        wait: bool,
    ) -> Vec<TrajectoryPlayer> {
        let thetas = self.model.angles_from_vector(vector, angle_deg);
        self.goto(
            thetas.map(|t| -t),
            duration,
            InterpolationMode::MinimumJerk,
            wait,
        )
    }
}
