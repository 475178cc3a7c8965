//! 部件基础设施
//!
//! 部件在启动时绑定一个 IO 后端实例构造，结束时显式拆除（关闭后端资源）。
//! 电机按挂接顺序保存，顺序对广播快照可观察。

use crate::error::PartError;
use crate::motor::{DxlMotor, MotorConfig};
use magpie_bus::{IoBackend, MotorHandle, MotorSpec};
use std::sync::Arc;
use tracing::info;

/// 具名机器人部件：一组电机/传感器句柄的拥有者
pub struct Part {
    name: String,
    backend: Arc<dyn IoBackend>,
    motors: Vec<DxlMotor>,
}

impl Part {
    pub fn new(name: impl Into<String>, backend: Arc<dyn IoBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            motors: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &Arc<dyn IoBackend> {
        &self.backend
    }

    /// 挂接一个电机（全名 = `部件名.局部名`），返回其封装
    ///
    /// 解析失败直接向构造方传播：不存在半构造的部件。
    pub fn attach_motor(
        &mut self,
        local_name: &str,
        config: MotorConfig,
    ) -> Result<DxlMotor, PartError> {
        let spec = MotorSpec::new(format!("{}.{}", self.name, local_name), config.id);
        let handle = self.backend.resolve_motor(&spec)?;
        let motor = DxlMotor::new(handle, local_name, &config);
        self.motors.push(motor.clone());
        Ok(motor)
    }

    /// 按局部名查找已挂接电机
    pub fn motor(&self, local_name: &str) -> Option<&DxlMotor> {
        self.motors.iter().find(|m| m.local_name() == local_name)
    }

    /// 全部已挂接电机（挂接顺序）
    pub fn motors(&self) -> &[DxlMotor] {
        &self.motors
    }

    /// 底层电机句柄（挂接顺序）
    pub fn motor_handles(&self) -> Vec<MotorHandle> {
        self.motors.iter().map(|m| m.handle().clone()).collect()
    }

    /// 拆除部件：关闭后端资源（幂等）
    pub fn teardown(&self) {
        info!(part = %self.name, "tearing down part");
        self.backend.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::Direction;
    use magpie_bus::{BusError, Capability, DiskGroup, SensorHandle};
    use parking_lot::Mutex;

    /// 只支持电机占位的极简后端
    struct StubBackend {
        resolved: Mutex<Vec<String>>,
    }

    impl StubBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                resolved: Mutex::new(Vec::new()),
            })
        }
    }

    impl IoBackend for StubBackend {
        fn backend_name(&self) -> &'static str {
            "stub"
        }

        fn resolve_motor(&self, spec: &MotorSpec) -> Result<MotorHandle, BusError> {
            if spec.id == 0 {
                return Err(BusError::ModuleNotFound {
                    module: spec.module_alias(),
                    port: "stub".into(),
                });
            }
            self.resolved.lock().push(spec.name.clone());
            Ok(MotorHandle::new(spec.name.clone()))
        }

        fn resolve_sensor(&self, _capability: &str) -> Result<SensorHandle, BusError> {
            Err(BusError::UnsupportedCapability {
                capability: Capability::Sensor,
                backend: "stub",
            })
        }

        fn resolve_disks(&self) -> Result<DiskGroup, BusError> {
            Err(BusError::UnsupportedCapability {
                capability: Capability::DiskGroup,
                backend: "stub",
            })
        }

        fn close(&self) {}
    }

    #[test]
    fn test_attach_qualifies_names_in_order() {
        let backend = StubBackend::new();
        let mut part = Part::new("hand", backend.clone());
        part.attach_motor("wrist_pitch", MotorConfig::new(15, 0.0, Direction::Indirect))
            .unwrap();
        part.attach_motor("gripper", MotorConfig::new(17, 0.0, Direction::Direct))
            .unwrap();

        assert_eq!(
            *backend.resolved.lock(),
            vec!["hand.wrist_pitch".to_string(), "hand.gripper".to_string()]
        );
        let names: Vec<_> = part.motor_handles().iter().map(|h| h.name().to_string()).collect();
        assert_eq!(names, ["hand.wrist_pitch", "hand.gripper"]);
        assert!(part.motor("gripper").is_some());
        assert!(part.motor("thumb").is_none());
    }

    #[test]
    fn test_attach_failure_propagates() {
        let backend = StubBackend::new();
        let mut part = Part::new("hand", backend);
        let err = part
            .attach_motor("broken", MotorConfig::new(0, 0.0, Direction::Direct))
            .unwrap_err();
        assert!(matches!(err, PartError::Bus(BusError::ModuleNotFound { .. })));
        assert!(part.motors().is_empty());
    }
}
