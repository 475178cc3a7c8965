//! 总线传输抽象
//!
//! 线缆协议本身不在本层范围内：硬件侧 crate 负责实现 [`BusTransport`]，
//! 直连后端只依赖这组同步读写原语。所有方法都是阻塞的短操作。

use crate::error::BusError;

/// 物理总线传输界面
///
/// 实现者持有一条已打开的总线连接（串口、CAN 等），
/// 并以模块别名（如 `dxl_15`、`disk_top`、`load_mod`）寻址。
pub trait BusTransport: Send {
    /// 传输绑定的端口标识（用于日志与错误）
    fn port(&self) -> &str;

    /// 总线上所有模块别名
    fn module_names(&self) -> Vec<String>;

    /// 模块是否存在
    fn has_module(&self, module: &str) -> bool {
        self.module_names().iter().any(|m| m == module)
    }

    /// 读模块当前位置（原始坐标，度）
    fn read_position(&mut self, module: &str) -> Result<f64, BusError>;

    /// 读模块转速（度/秒）
    fn read_speed(&mut self, module: &str) -> Result<f64, BusError>;

    /// 读模块负载（力传感器等模拟量，原始值）
    fn read_load(&mut self, module: &str) -> Result<f64, BusError>;

    /// 写目标位置（原始坐标，度）
    fn write_target(&mut self, module: &str, raw_target: f64) -> Result<(), BusError>;

    /// 写柔顺模式
    fn write_compliant(&mut self, module: &str, compliant: bool) -> Result<(), BusError>;

    /// 关闭连接（幂等，默认空实现）
    fn close(&mut self) {}
}
