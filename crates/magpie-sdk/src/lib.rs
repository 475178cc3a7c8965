//! # Magpie SDK
//!
//! 伞形 crate：按层重导出总线抽象、状态同步与部件层。
//!
//! ```rust,no_run
//! use magpie_sdk::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 远程可观察后端：目标状态由同步服务器广播
//! let io = RemoteIo::shared_server("hand")?;
//! let hand = ForceGripper::new(io)?;
//!
//! hand.close(30.0, Duration::from_secs(1), 50.0);
//! hand.open(-20.0, Duration::from_secs(1));
//! hand.teardown();
//! # Ok(())
//! # }
//! ```

pub use magpie_bus as bus;
pub use magpie_parts as parts;
pub use magpie_sync as sync;

/// 常用类型一揽子导入
pub mod prelude {
    pub use magpie_bus::{
        BusError, Capability, DirectBackend, DiskGroup, IoBackend, MotorHandle, MotorSpec,
        SensorHandle, SharedBus,
    };
    pub use magpie_parts::{
        CalibrationController, Direction, DxlMotor, ForceGripper, Frame, FrameSource, GripConfig,
        Head, HeadOptions, HomingConfig, HomingPhase, InterpolationMode, MotorConfig,
        OrbitaActuator, Part, PartError, TrajectoryPlayer,
    };
    pub use magpie_sync::{RemoteIo, Snapshot, SyncServer};
}
