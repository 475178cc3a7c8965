//! Mock 总线传输（无硬件测试）
//!
//! `MockTransport` 实现 [`BusTransport`]，模块状态保存在共享内存中；
//! 测试方持有 [`MockBusHandle`]，可以在 IO 线程运行期间脚本化地
//! 注入位置/转速/负载，或读出写穿到"硬件"的目标值。

use crate::error::BusError;
use crate::transport::BusTransport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
struct MockModule {
    position: f64,
    speed: f64,
    load: f64,
    target: f64,
    compliant: bool,
}

#[derive(Debug, Default)]
struct MockBusState {
    modules: HashMap<String, MockModule>,
    /// true 时位置立即跟随目标（理想伺服，用于轨迹类测试）
    follow_targets: bool,
    closed: bool,
}

/// 测试侧控制句柄
#[derive(Clone)]
pub struct MockBusHandle {
    state: Arc<Mutex<MockBusState>>,
}

impl MockBusHandle {
    pub fn set_position(&self, module: &str, position: f64) {
        if let Some(m) = self.state.lock().modules.get_mut(module) {
            m.position = position;
        }
    }

    pub fn set_speed(&self, module: &str, speed: f64) {
        if let Some(m) = self.state.lock().modules.get_mut(module) {
            m.speed = speed;
        }
    }

    pub fn set_load(&self, module: &str, load: f64) {
        if let Some(m) = self.state.lock().modules.get_mut(module) {
            m.load = load;
        }
    }

    /// 写穿到"硬件"的最新目标值
    pub fn target_of(&self, module: &str) -> Option<f64> {
        self.state.lock().modules.get(module).map(|m| m.target)
    }

    pub fn compliant_of(&self, module: &str) -> Option<bool> {
        self.state.lock().modules.get(module).map(|m| m.compliant)
    }

    pub fn position_of(&self, module: &str) -> Option<f64> {
        self.state.lock().modules.get(module).map(|m| m.position)
    }

    /// 理想伺服模式：读位置时直接返回目标
    pub fn set_follow_targets(&self, follow: bool) {
        self.state.lock().follow_targets = follow;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Mock 传输
pub struct MockTransport {
    port: String,
    state: Arc<Mutex<MockBusState>>,
}

impl MockTransport {
    /// 创建带指定模块的 mock 总线，返回（传输, 测试句柄）
    pub fn new(port: &str, modules: &[&str]) -> (Self, MockBusHandle) {
        let mut map = HashMap::new();
        for name in modules {
            map.insert((*name).to_string(), MockModule::default());
        }
        let state = Arc::new(Mutex::new(MockBusState {
            modules: map,
            follow_targets: false,
            closed: false,
        }));
        let handle = MockBusHandle {
            state: state.clone(),
        };
        (
            Self {
                port: port.to_string(),
                state,
            },
            handle,
        )
    }

    /// 手部总线布局：两个腕部电机、夹爪电机和力传感器
    pub fn hand(port: &str) -> (Self, MockBusHandle) {
        Self::new(port, &["dxl_15", "dxl_16", "dxl_17", "load_mod"])
    }

    /// 头部总线布局：两根天线电机和三只轨道盘
    pub fn head(port: &str) -> (Self, MockBusHandle) {
        Self::new(
            port,
            &["dxl_30", "dxl_31", "disk_bottom", "disk_middle", "disk_top"],
        )
    }

    fn with_module<R>(
        &self,
        module: &str,
        f: impl FnOnce(&mut MockModule) -> R,
    ) -> Result<R, BusError> {
        let mut state = self.state.lock();
        let follow = state.follow_targets;
        match state.modules.get_mut(module) {
            Some(m) => {
                if follow {
                    m.position = m.target;
                }
                Ok(f(m))
            }
            None => Err(BusError::ModuleNotFound {
                module: module.to_string(),
                port: self.port.clone(),
            }),
        }
    }
}

impl BusTransport for MockTransport {
    fn port(&self) -> &str {
        &self.port
    }

    fn module_names(&self) -> Vec<String> {
        self.state.lock().modules.keys().cloned().collect()
    }

    fn read_position(&mut self, module: &str) -> Result<f64, BusError> {
        self.with_module(module, |m| m.position)
    }

    fn read_speed(&mut self, module: &str) -> Result<f64, BusError> {
        self.with_module(module, |m| m.speed)
    }

    fn read_load(&mut self, module: &str) -> Result<f64, BusError> {
        self.with_module(module, |m| m.load)
    }

    fn write_target(&mut self, module: &str, raw_target: f64) -> Result<(), BusError> {
        self.with_module(module, |m| m.target = raw_target)
    }

    fn write_compliant(&mut self, module: &str, compliant: bool) -> Result<(), BusError> {
        self.with_module(module, |m| m.compliant = compliant)
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }
}
