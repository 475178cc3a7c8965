//! 总线层错误类型定义

use crate::backend::Capability;
use thiserror::Error;

/// 总线层统一错误类型
#[derive(Error, Debug)]
pub enum BusError {
    /// 后端不支持请求的能力（对调用方是致命错误，不重试）
    #[error("backend `{backend}` does not support capability `{capability}`")]
    UnsupportedCapability {
        capability: Capability,
        backend: &'static str,
    },

    /// 总线端口打开失败（传播给部件构造方，致命）
    #[error("transport unavailable on `{port}`: {reason}")]
    TransportUnavailable { port: String, reason: String },

    /// 总线上找不到指定模块
    #[error("module `{module}` not found on bus `{port}`")]
    ModuleNotFound { module: String, port: String },

    /// 后端已关闭（IO 线程已退出）
    #[error("bus backend `{port}` is closed")]
    Closed { port: String },

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
