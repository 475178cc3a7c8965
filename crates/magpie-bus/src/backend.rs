//! IO 后端能力界面
//!
//! 每个后端变体显式声明自己支持的能力集合：
//! - 直连总线后端：{电机, 传感器, 盘组}
//! - 远程可观察后端：{电机占位, 传感器占位}
//!
//! 解析失败返回 [`BusError::UnsupportedCapability`]，而不是运行时类型判断。

use crate::error::BusError;
use crate::motor::{DiskGroup, MotorHandle};
use crate::sensor::SensorHandle;
use std::fmt;

/// 后端能力标签（用于错误报告）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Motor,
    Sensor,
    DiskGroup,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Motor => write!(f, "motor"),
            Capability::Sensor => write!(f, "sensor"),
            Capability::DiskGroup => write!(f, "disk group"),
        }
    }
}

/// 电机解析请求
///
/// `name` 是会话内全局唯一的全名（如 `hand.gripper`），用于句柄命名和广播；
/// `id` 是总线侧的寻址细节，直连后端用它定位 `dxl_{id}` 模块，远程后端忽略。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotorSpec {
    pub name: String,
    pub id: u8,
}

impl MotorSpec {
    pub fn new(name: impl Into<String>, id: u8) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    /// 直连总线上的模块别名
    pub fn module_alias(&self) -> String {
        format!("dxl_{}", self.id)
    }
}

/// 部件消费的能力查询界面
///
/// 所有方法要么返回绑定到底层传输的活句柄，要么立即失败；
/// 不存在半构造状态。解析错误对部件构造方是致命的。
pub trait IoBackend: Send + Sync {
    /// 后端变体名（用于错误与日志）
    fn backend_name(&self) -> &'static str;

    /// 解析一个电机句柄
    fn resolve_motor(&self, spec: &MotorSpec) -> Result<MotorHandle, BusError>;

    /// 解析一个传感器句柄（`capability` 为能力标签，如 `force_gripper`）
    fn resolve_sensor(&self, capability: &str) -> Result<SensorHandle, BusError>;

    /// 解析轨道执行器的三盘组
    fn resolve_disks(&self) -> Result<DiskGroup, BusError>;

    /// 关闭后端资源（幂等）
    fn close(&self);
}
