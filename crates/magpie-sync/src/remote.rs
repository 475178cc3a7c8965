//! 远程可观察后端
//!
//! 不与任何物理总线通信：解析出的电机是占位句柄，
//! 其目标位置字段就是广播给远程观察者的唯一真相；
//! 传感器读数恒为 NaN（"暂无数据"哨兵）。
//!
//! 能力集：{电机占位, 传感器占位}；盘组不支持。

use crate::server::{MotorSource, SyncError, SyncServer};
use magpie_bus::{BusError, Capability, DiskGroup, IoBackend, MotorHandle, MotorSpec, SensorHandle};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// 远程可观察 IO 后端
pub struct RemoteIo {
    part_name: String,
    motors: RwLock<Vec<MotorHandle>>,
    server: Arc<SyncServer>,
}

impl RemoteIo {
    /// 创建后端并注册到进程级共享服务器（服务器按需惰性启动）
    pub fn shared_server(part_name: &str) -> Result<Arc<Self>, SyncError> {
        let server = SyncServer::shared()?;
        Ok(Self::with_server(part_name, &server))
    }

    /// 创建后端并注册到指定服务器（测试或多服务器场景）
    pub fn with_server(part_name: &str, server: &Arc<SyncServer>) -> Arc<Self> {
        let io = Arc::new(Self {
            part_name: part_name.to_string(),
            motors: RwLock::new(Vec::new()),
            server: server.clone(),
        });
        server.register(io.clone());
        io
    }
}

impl MotorSource for RemoteIo {
    fn part_name(&self) -> &str {
        &self.part_name
    }

    fn motors(&self) -> Vec<MotorHandle> {
        self.motors.read().clone()
    }
}

impl IoBackend for RemoteIo {
    fn backend_name(&self) -> &'static str {
        "remote"
    }

    /// 创建占位电机并纳入广播（挂接顺序即广播顺序）
    fn resolve_motor(&self, spec: &MotorSpec) -> Result<MotorHandle, BusError> {
        let handle = MotorHandle::new(spec.name.clone());
        self.motors.write().push(handle.clone());
        Ok(handle)
    }

    /// 占位传感器：读数恒为 NaN
    fn resolve_sensor(&self, _capability: &str) -> Result<SensorHandle, BusError> {
        Ok(SensorHandle::placeholder())
    }

    fn resolve_disks(&self) -> Result<DiskGroup, BusError> {
        Err(BusError::UnsupportedCapability {
            capability: Capability::DiskGroup,
            backend: self.backend_name(),
        })
    }

    /// 关闭共享服务器（与部件拆除一起调用）
    fn close(&self) {
        info!(part = %self.part_name, "closing remote io");
        self.server.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_capabilities() {
        let server = SyncServer::bind("127.0.0.1:0").unwrap();
        let io = RemoteIo::with_server("hand", &server);

        let motor = io
            .resolve_motor(&MotorSpec::new("hand.gripper", 17))
            .unwrap();
        assert_eq!(motor.name(), "hand.gripper");

        let sensor = io.resolve_sensor("force_gripper").unwrap();
        assert!(sensor.reading().is_nan());

        let err = io.resolve_disks().unwrap_err();
        assert!(matches!(
            err,
            BusError::UnsupportedCapability {
                capability: Capability::DiskGroup,
                ..
            }
        ));
        server.close();
    }

    #[test]
    fn test_resolution_feeds_broadcast_registry() {
        let server = SyncServer::bind("127.0.0.1:0").unwrap();
        let io = RemoteIo::with_server("hand", &server);

        io.resolve_motor(&MotorSpec::new("hand.wrist_pitch", 15))
            .unwrap();
        let motor = io
            .resolve_motor(&MotorSpec::new("hand.gripper", 17))
            .unwrap();
        motor.set_target_position(30.0);

        let snapshot = server.snapshot();
        let names: Vec<_> = snapshot.motors.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["hand.wrist_pitch", "hand.gripper"]);
        assert_eq!(snapshot.motors[1].goal_position, 30.0);
        server.close();
    }
}
