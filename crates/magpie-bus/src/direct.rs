//! 直连总线后端
//!
//! 持有一条物理总线传输，并由后台 IO 线程以固定节拍同步：
//! - 把句柄上的目标位置/柔顺模式写穿到硬件（仅在变化时发送）
//! - 把硬件的实际位置/转速/负载回写到句柄
//!
//! 控制逻辑只接触句柄上的原子字段，与 IO 线程之间没有共享锁；
//! 传输锁仅在 IO 线程节拍体和句柄解析时短暂持有，从不带锁睡眠。

use crate::backend::{IoBackend, MotorSpec};
use crate::error::BusError;
use crate::motor::{DiskGroup, MotorHandle};
use crate::sensor::SensorHandle;
use crate::transport::BusTransport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

/// IO 线程同步周期
const SYNC_PERIOD: Duration = Duration::from_millis(1);

/// 轨道盘的固定模块别名（底/中/顶）
const DISK_MODULES: [&str; 3] = ["disk_bottom", "disk_middle", "disk_top"];

/// 电机绑定：模块别名 <-> 句柄，外加写穿去重状态
struct MotorBinding {
    module: String,
    handle: MotorHandle,
    last_target: Option<f64>,
    last_compliant: Option<bool>,
}

struct SensorBinding {
    module: String,
    handle: SensorHandle,
}

#[derive(Default)]
struct Bindings {
    motors: Vec<MotorBinding>,
    sensors: Vec<SensorBinding>,
}

/// 直连总线后端（能力集：{电机, 传感器, 盘组}）
pub struct DirectBackend {
    port: String,
    transport: Arc<Mutex<Box<dyn BusTransport>>>,
    bindings: Arc<Mutex<Bindings>>,
    /// 已解析句柄缓存（按模块别名，重复解析复用）
    motors: Mutex<HashMap<String, MotorHandle>>,
    sensors: Mutex<HashMap<String, SensorHandle>>,
    running: Arc<AtomicBool>,
    io_thread: Mutex<Option<JoinHandle<()>>>,
}

impl DirectBackend {
    /// 打开后端并启动 IO 线程
    pub fn open(transport: Box<dyn BusTransport>) -> Arc<Self> {
        let port = transport.port().to_string();
        info!(port = %port, "starting direct bus backend");

        let transport = Arc::new(Mutex::new(transport));
        let bindings: Arc<Mutex<Bindings>> = Arc::new(Mutex::new(Bindings::default()));
        let running = Arc::new(AtomicBool::new(true));

        let io_thread = {
            let transport = transport.clone();
            let bindings = bindings.clone();
            let running = running.clone();
            let port = port.clone();
            std::thread::spawn(move || io_loop(&port, transport, bindings, running))
        };

        Arc::new(Self {
            port,
            transport,
            bindings,
            motors: Mutex::new(HashMap::new()),
            sensors: Mutex::new(HashMap::new()),
            running,
            io_thread: Mutex::new(Some(io_thread)),
        })
    }

    /// 后端绑定的端口
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<(), BusError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(BusError::Closed {
                port: self.port.clone(),
            })
        }
    }

    /// 解析（或复用）一个绑定到模块的电机句柄
    fn bind_motor(&self, module: &str, name: &str) -> Result<MotorHandle, BusError> {
        self.ensure_running()?;

        if let Some(existing) = self.motors.lock().get(module) {
            return Ok(existing.clone());
        }

        let initial = {
            let mut transport = self.transport.lock();
            if !transport.has_module(module) {
                return Err(BusError::ModuleNotFound {
                    module: module.to_string(),
                    port: self.port.clone(),
                });
            }
            transport.read_position(module)?
        };

        let handle = MotorHandle::new(name);
        handle.store_raw_position(initial);
        // 目标预置为当前位置，避免第一次写穿引发跳变
        handle.set_target_position(initial);

        self.motors
            .lock()
            .insert(module.to_string(), handle.clone());
        self.bindings.lock().motors.push(MotorBinding {
            module: module.to_string(),
            handle: handle.clone(),
            last_target: None,
            last_compliant: None,
        });

        trace!(module, name, initial, "bound motor");
        Ok(handle)
    }
}

impl IoBackend for DirectBackend {
    fn backend_name(&self) -> &'static str {
        "direct"
    }

    fn resolve_motor(&self, spec: &MotorSpec) -> Result<MotorHandle, BusError> {
        self.bind_motor(&spec.module_alias(), &spec.name)
    }

    fn resolve_sensor(&self, capability: &str) -> Result<SensorHandle, BusError> {
        self.ensure_running()?;

        // 能力标签到模块别名的映射
        let module = match capability {
            "force_gripper" => "load_mod",
            other => other,
        };

        if let Some(existing) = self.sensors.lock().get(module) {
            return Ok(existing.clone());
        }

        if !self.transport.lock().has_module(module) {
            return Err(BusError::ModuleNotFound {
                module: module.to_string(),
                port: self.port.clone(),
            });
        }

        let handle = SensorHandle::new();
        self.sensors
            .lock()
            .insert(module.to_string(), handle.clone());
        self.bindings.lock().sensors.push(SensorBinding {
            module: module.to_string(),
            handle: handle.clone(),
        });
        Ok(handle)
    }

    fn resolve_disks(&self) -> Result<DiskGroup, BusError> {
        let [bottom, middle, top] = DISK_MODULES;
        Ok(DiskGroup {
            bottom: self.bind_motor(bottom, bottom)?,
            middle: self.bind_motor(middle, middle)?,
            top: self.bind_motor(top, top)?,
        })
    }

    fn close(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.io_thread.lock().take() {
            if handle.join().is_err() {
                warn!(port = %self.port, "bus io thread panicked");
            }
        }
        self.transport.lock().close();
        info!(port = %self.port, "direct bus backend closed");
    }
}

impl Drop for DirectBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// IO 线程主循环
///
/// 绝对时间锚点节拍；锁只在节拍体内短暂持有，睡眠始终在锁外。
fn io_loop(
    port: &str,
    transport: Arc<Mutex<Box<dyn BusTransport>>>,
    bindings: Arc<Mutex<Bindings>>,
    running: Arc<AtomicBool>,
) {
    let mut next_tick = Instant::now();

    while running.load(Ordering::Acquire) {
        next_tick += SYNC_PERIOD;

        {
            let mut bindings = bindings.lock();
            let mut transport = transport.lock();

            for binding in bindings.motors.iter_mut() {
                // 写穿：本地目标换算回原始坐标，仅在变化时发送
                let raw_target = binding.handle.target_position() + binding.handle.zero_offset();
                if binding.last_target != Some(raw_target) {
                    match transport.write_target(&binding.module, raw_target) {
                        Ok(()) => binding.last_target = Some(raw_target),
                        Err(e) => warn!(module = %binding.module, error = %e, "target write failed"),
                    }
                }

                let compliant = binding.handle.compliant();
                if binding.last_compliant != Some(compliant) {
                    match transport.write_compliant(&binding.module, compliant) {
                        Ok(()) => binding.last_compliant = Some(compliant),
                        Err(e) => {
                            warn!(module = %binding.module, error = %e, "compliance write failed")
                        }
                    }
                }

                // 回读：失败视为本拍无数据，下一拍重试
                match transport.read_position(&binding.module) {
                    Ok(raw) => binding.handle.store_raw_position(raw),
                    Err(e) => trace!(module = %binding.module, error = %e, "position read failed"),
                }
                match transport.read_speed(&binding.module) {
                    Ok(speed) => binding.handle.store_speed(speed),
                    Err(e) => trace!(module = %binding.module, error = %e, "speed read failed"),
                }
            }

            for binding in bindings.sensors.iter() {
                match transport.read_load(&binding.module) {
                    Ok(raw) => binding.handle.store_raw(raw),
                    Err(e) => trace!(module = %binding.module, error = %e, "load read failed"),
                }
            }
        }

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            // 节拍超限：重置锚点，避免累积追赶
            next_tick = now;
        }
    }

    info!(port, "bus io loop exited");
}
