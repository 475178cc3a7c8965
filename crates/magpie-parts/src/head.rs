//! 头部部件
//!
//! 颈部是三盘轨道关节，天线是两只普通动力电机。
//! 相机是注入式协作件：只有实际用到视觉的调用方才构造并传入，
//! 部件本身不在任何加载路径上引入采集依赖。

use crate::error::PartError;
use crate::homing::{CalibrationController, HomingConfig};
use crate::motor::{Direction, MotorConfig};
use crate::orbita::{OrbitaActuator, OrbitaConfig, quaternion_between};
use crate::part::Part;
use crate::zero_store;
use magpie_bus::IoBackend;
use nalgebra::{Rotation3, Vector3};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 一帧图像
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// 拉取式相机采集界面（外部协作件，实现方负责采集内部细节）
pub trait FrameSource: Send {
    /// 拉取一帧
    fn read(&mut self) -> Result<Frame, PartError>;

    /// 释放采集资源（幂等，默认空实现）
    fn close(&mut self) {}
}

/// 头部构造选项
#[derive(Default)]
pub struct HeadOptions {
    /// 注入的相机（可选）
    pub camera: Option<Box<dyn FrameSource>>,
    /// 硬件零点文件路径（可选；存在则在构造时预置盘零点）
    pub hardware_zero: Option<PathBuf>,
    /// 归零标定配置
    pub homing: HomingConfig,
}

/// 头部部件
pub struct Head {
    part: Part,
    neck: OrbitaActuator,
    camera: Mutex<Option<Box<dyn FrameSource>>>,
    homing: CalibrationController,
}

impl std::fmt::Debug for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Head").finish_non_exhaustive()
    }
}

impl Head {
    /// 颈部轨道关节的整机配置
    pub fn neck_config() -> OrbitaConfig {
        OrbitaConfig {
            r: 36.7,
            wheel_size: 62.0,
            reduction: 77.35,
            pid: [10.0, 0.04, 90.0],
            r0: Rotation3::from_axis_angle(&Vector3::z_axis(), 60f64.to_radians())
                * Rotation3::from_axis_angle(&Vector3::y_axis(), 10f64.to_radians()),
        }
    }

    pub fn new(backend: Arc<dyn IoBackend>) -> Result<Self, PartError> {
        Self::with_options(backend, HeadOptions::default())
    }

    pub fn with_options(
        backend: Arc<dyn IoBackend>,
        options: HeadOptions,
    ) -> Result<Self, PartError> {
        let mut part = Part::new("head", backend);
        part.attach_motor("left_antenna", MotorConfig::new(30, -10.0, Direction::Direct))?;
        part.attach_motor("right_antenna", MotorConfig::new(31, 30.0, Direction::Direct))?;

        let disks = part.backend().resolve_disks()?;

        // 有持久化零点就在构造期预置，避免每次上电都要重新归零
        if let Some(path) = &options.hardware_zero {
            let zero = zero_store::read_hardware_zero(path)?;
            info!(?zero, "seeding disk zero offsets from calibration file");
            disks.bottom.seed_zero(zero[0]);
            disks.middle.seed_zero(zero[1]);
            disks.top.seed_zero(zero[2]);
            // 目标重新表达到新零点坐标系，写穿不产生任何运动
            for disk in disks.iter() {
                disk.set_target_position(disk.position());
            }
        }

        let neck = OrbitaActuator::new("neck", disks, &Self::neck_config());

        Ok(Self {
            part,
            neck,
            camera: Mutex::new(options.camera),
            homing: CalibrationController::new(options.homing),
        })
    }

    pub fn part(&self) -> &Part {
        &self.part
    }

    pub fn neck(&self) -> &OrbitaActuator {
        &self.neck
    }

    pub fn compliant(&self) -> bool {
        self.neck.compliant()
    }

    pub fn set_compliant(&self, compliant: bool) {
        self.neck.set_compliant(compliant);
    }

    /// 注视空间点 (x, y, z)
    pub fn look_at(&self, x: f64, y: f64, z: f64, duration: Duration, wait: bool) {
        let orientation = quaternion_between(Vector3::x(), Vector3::new(x, y, z));
        self.neck.orient(orientation, duration, wait);
    }

    /// 执行颈部归零标定（阻塞）
    pub fn homing(&self) -> Result<(), PartError> {
        self.homing.run(&self.neck)
    }

    /// 标定控制器（阶段可观察）
    pub fn calibration(&self) -> &CalibrationController {
        &self.homing
    }

    /// 拉取一帧图像；未注入相机时返回 [`PartError::NoCamera`]
    pub fn get_image(&self) -> Result<Frame, PartError> {
        match self.camera.lock().as_mut() {
            Some(camera) => camera.read(),
            None => Err(PartError::NoCamera),
        }
    }

    /// 拆除部件：先关相机，再关后端
    pub fn teardown(&self) {
        if let Some(mut camera) = self.camera.lock().take() {
            camera.close();
        }
        self.part.teardown();
    }
}
