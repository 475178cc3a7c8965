//! # Magpie 部件层
//!
//! 把 IO 后端解析出的句柄组织成具名的机器人部件，并提供部件级行为：
//! - [`Part`]：电机/传感器挂接与生命周期管理
//! - [`DxlMotor`]：带零偏/方向换算的电机封装，支持轨迹 goto
//! - [`TrajectoryPlayer`]：后台插值线程（线性 / 最小加加速度）
//! - [`OrbitaActuator`]：三盘轨道执行器与姿态->盘角换算模型
//! - [`CalibrationController`]：基于转速反馈的闭环归零状态机
//! - [`ForceGripper`]：带力反馈调节器的夹爪
//! - [`Head`]：颈部轨道关节 + 天线 + 注入式相机
//!
//! 控制路径全部是调用方线程上的固定间隔轮询（忙等反馈环），
//! 与同步层的广播线程只通过句柄原子字段交互。

mod error;
mod hand;
mod head;
mod homing;
mod motor;
mod orbita;
mod part;
mod trajectory;
pub mod zero_store;

pub use error::PartError;
pub use hand::{ForceGripper, GripConfig, Hand};
pub use head::{Frame, FrameSource, Head, HeadOptions};
pub use homing::{CalibrationController, HomingConfig, HomingPhase, StallDetector};
pub use motor::{Direction, DxlMotor, MotorConfig};
pub use orbita::{OrbitaActuator, OrbitaConfig, OrbitaModel};
pub use part::Part;
pub use trajectory::{GoalSink, InterpolationMode, TrajectoryPlayer};
