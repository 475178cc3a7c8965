//! 部件层错误类型定义

use magpie_bus::BusError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 部件层错误类型
///
/// 后端解析错误直接传播给部件构造方：不存在半构造的部件。
#[derive(Error, Debug)]
pub enum PartError {
    /// 总线层错误
    #[error(transparent)]
    Bus(#[from] BusError),

    /// 归零标定超时（盘始终未达到堵转条件）
    ///
    /// 仅在显式配置了 `max_stall_wait` 时出现。
    #[error("calibration timed out after {waited:?}: disks never reached the stall condition")]
    CalibrationTimeout { waited: Duration },

    /// 硬件零点文件损坏或格式不符
    #[error("invalid hardware zero file `{path}`: {reason}")]
    ZeroFile { path: PathBuf, reason: String },

    /// 部件没有挂接相机
    #[error("no camera attached to this part")]
    NoCamera,

    /// 相机采集错误
    #[error("camera error: {0}")]
    Camera(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
