//! # Magpie 总线抽象层
//!
//! 本 crate 提供机器人各部件（Part）与物理执行器之间的传输抽象，包括：
//! - 电机/传感器句柄（原子字段，无锁并发读写）
//! - `IoBackend` trait（按名称解析电机、传感器、盘组）
//! - 直连总线后端（后台 IO 线程同步硬件状态）
//! - 按端口共享的传输注册表（进程级单例）
//!
//! # 使用场景
//!
//! 部件层（`magpie-parts`）通过 `IoBackend` 获取句柄后直接读写目标位置，
//! 同步层（`magpie-sync`）以只读方式广播同一批句柄的目标状态。
//! 两侧都不需要持锁等待对方。

mod backend;
mod direct;
mod error;
mod motor;
mod sensor;
mod shared;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use backend::{Capability, IoBackend, MotorSpec};
pub use direct::DirectBackend;
pub use error::BusError;
pub use motor::{DiskGroup, MotorHandle, MotorState};
pub use sensor::SensorHandle;
pub use shared::SharedBus;
pub use transport::BusTransport;
