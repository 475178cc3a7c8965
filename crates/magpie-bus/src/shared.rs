//! 按端口共享的后端注册表
//!
//! 同一物理端口在进程内至多存在一条活的传输：首次打开时惰性创建，
//! 之后的打开请求复用同一个 [`DirectBackend`] 实例，
//! 避免多个部件对同一端口开出相互竞争的连接。

use crate::direct::DirectBackend;
use crate::error::BusError;
use crate::transport::BusTransport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::info;

static OPENED: OnceLock<Mutex<HashMap<String, Arc<DirectBackend>>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, Arc<DirectBackend>>> {
    OPENED.get_or_init(|| Mutex::new(HashMap::new()))
}

/// 进程级共享总线入口
pub struct SharedBus;

impl SharedBus {
    /// 打开（或复用）绑定到 `port` 的直连后端
    ///
    /// `factory` 仅在该端口第一次打开时被调用一次；
    /// 打开失败以 [`BusError::TransportUnavailable`] 返回，注册表不记录失败项。
    /// 已被关闭的后端会在下一次打开时被替换。
    pub fn open_with<F>(port: &str, factory: F) -> Result<Arc<DirectBackend>, BusError>
    where
        F: FnOnce(&str) -> Result<Box<dyn BusTransport>, BusError>,
    {
        let mut opened = registry().lock();

        if let Some(existing) = opened.get(port) {
            if existing.is_running() {
                return Ok(existing.clone());
            }
            opened.remove(port);
        }

        info!(port, "opening new shared bus transport");
        let transport = factory(port)?;
        let backend = DirectBackend::open(transport);
        opened.insert(port.to_string(), backend.clone());
        Ok(backend)
    }

    /// 查询端口是否已有活的后端
    pub fn is_open(port: &str) -> bool {
        registry()
            .lock()
            .get(port)
            .is_some_and(|backend| backend.is_running())
    }
}
