//! 传感器句柄
//!
//! 只读（从部件视角）。读数为 NaN 表示"暂无数据"：
//! 上层控制循环对 NaN 的任何比较都不成立，轮询会继续等待而不是崩溃。

use crate::motor::AtomicF64;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct SensorCell {
    raw: AtomicF64,
    offset: AtomicF64,
    scale: AtomicF64,
}

/// 传感器句柄（可克隆，共享同一单元）
#[derive(Clone)]
pub struct SensorHandle {
    cell: Arc<SensorCell>,
}

impl SensorHandle {
    /// 创建新句柄（初始读数为 NaN）
    pub fn new() -> Self {
        Self {
            cell: Arc::new(SensorCell {
                raw: AtomicF64::new(f64::NAN),
                offset: AtomicF64::new(0.0),
                scale: AtomicF64::new(1.0),
            }),
        }
    }

    /// 占位传感器：永远返回 NaN（远程后端使用）
    pub fn placeholder() -> Self {
        Self::new()
    }

    /// 校准后的读数：raw / scale - offset；无数据时为 NaN
    pub fn reading(&self) -> f64 {
        self.cell.raw.load() / self.cell.scale.load() - self.cell.offset.load()
    }

    /// 设置零点偏移
    pub fn set_offset(&self, offset: f64) {
        self.cell.offset.store(offset);
    }

    /// 设置量程缩放
    pub fn set_scale(&self, scale: f64) {
        self.cell.scale.store(scale);
    }

    /// 回写原始读数（传输侧接口）
    pub fn store_raw(&self, raw: f64) {
        self.cell.raw.store(raw);
    }
}

impl Default for SensorHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Sensor reading={:.3}>", self.reading())
    }
}
