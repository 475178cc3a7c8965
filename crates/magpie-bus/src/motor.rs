//! 电机句柄
//!
//! 每个电机对应一个共享单元（`MotorCell`），所有字段均为原子类型：
//! - 控制逻辑写目标位置，总线 IO 线程回写实际位置/速度
//! - 同步服务器并发只读，双方无需任何互斥
//!
//! 位置约定：单元内保存原始读数（raw）与本地零点（zero），
//! 对外暴露的位置 = raw - zero。目标位置始终以本地坐标表达，
//! 由 IO 线程在写穿硬件时换算回原始坐标。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// f64 的原子封装（按位转换存入 AtomicU64）
#[derive(Debug)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub(crate) fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// 电机状态快照（普通值类型）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorState {
    /// 当前位置（本地坐标，度）
    pub position: f64,
    /// 目标位置（本地坐标，度）
    pub target_position: f64,
    /// 转速（度/秒）
    pub speed: f64,
    /// 是否处于柔顺模式（不主动保持位置）
    pub compliant: bool,
}

/// 电机共享单元
#[derive(Debug)]
struct MotorCell {
    name: String,
    raw_position: AtomicF64,
    zero: AtomicF64,
    target_position: AtomicF64,
    speed: AtomicF64,
    compliant: AtomicBool,
}

/// 电机句柄（可克隆，所有克隆共享同一单元）
///
/// 写操作都是单字段原子 store：写方不与任何读方协调，
/// 读方总能看到最近一次完整写入的值。
#[derive(Clone)]
pub struct MotorHandle {
    cell: Arc<MotorCell>,
}

impl MotorHandle {
    /// 创建新句柄（位置/目标/速度清零，非柔顺）
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            cell: Arc::new(MotorCell {
                name: name.into(),
                raw_position: AtomicF64::new(0.0),
                zero: AtomicF64::new(0.0),
                target_position: AtomicF64::new(0.0),
                speed: AtomicF64::new(0.0),
                compliant: AtomicBool::new(false),
            }),
        }
    }

    /// 电机全名（会话内全局唯一，如 `hand.gripper`）
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// 当前位置（本地坐标 = 原始读数 - 零点）
    pub fn position(&self) -> f64 {
        self.cell.raw_position.load() - self.cell.zero.load()
    }

    /// 原始读数（未扣零点）
    pub fn raw_position(&self) -> f64 {
        self.cell.raw_position.load()
    }

    /// 目标位置（本地坐标）
    pub fn target_position(&self) -> f64 {
        self.cell.target_position.load()
    }

    /// 设置目标位置（本地坐标）
    pub fn set_target_position(&self, target: f64) {
        self.cell.target_position.store(target);
    }

    /// 转速（度/秒）
    pub fn speed(&self) -> f64 {
        self.cell.speed.load()
    }

    /// 是否柔顺
    pub fn compliant(&self) -> bool {
        self.cell.compliant.load(Ordering::Acquire)
    }

    /// 切换柔顺模式
    pub fn set_compliant(&self, compliant: bool) {
        self.cell.compliant.store(compliant, Ordering::Release);
    }

    /// 把本地零点设为当前原始读数（"setToZero"）
    ///
    /// 调用后 `position()` 立即读到约 0。纯本地簿记，不触碰传输层：
    /// IO 线程写穿目标时负责本地坐标与原始坐标之间的换算。
    /// 目标同时被重新表达到新零点坐标系，原始目标保持不变，
    /// 置零本身不命令任何运动。
    pub fn set_to_zero(&self) {
        let raw = self.cell.raw_position.load();
        let old_zero = self.cell.zero.load();
        self.cell.zero.store(raw);
        let target = self.cell.target_position.load();
        self.cell.target_position.store(target - (raw - old_zero));
    }

    /// 当前零点偏移
    pub fn zero_offset(&self) -> f64 {
        self.cell.zero.load()
    }

    /// 用标定文件中保存的原始读数预置零点
    pub fn seed_zero(&self, raw: f64) {
        self.cell.zero.store(raw);
    }

    /// 回写原始位置（传输侧接口：由总线后端或测试充当传输方调用）
    pub fn store_raw_position(&self, raw: f64) {
        self.cell.raw_position.store(raw);
    }

    /// 回写转速（传输侧接口）
    pub fn store_speed(&self, speed: f64) {
        self.cell.speed.store(speed);
    }

    /// 一致性尽量高的状态快照（字段间无原子性保证，广播场景足够）
    pub fn snapshot(&self) -> MotorState {
        MotorState {
            position: self.position(),
            target_position: self.target_position(),
            speed: self.speed(),
            compliant: self.compliant(),
        }
    }
}

impl fmt::Debug for MotorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.compliant() { "compliant" } else { "stiff" };
        write!(
            f,
            "<Motor \"{}\" pos={:.2} target={:.2} mode={}>",
            self.name(),
            self.position(),
            self.target_position(),
            mode
        )
    }
}

/// 轨道执行器的三盘句柄组（底/中/顶）
#[derive(Debug, Clone)]
pub struct DiskGroup {
    pub bottom: MotorHandle,
    pub middle: MotorHandle,
    pub top: MotorHandle,
}

impl DiskGroup {
    /// 按 底 -> 中 -> 顶 的固定顺序迭代
    pub fn iter(&self) -> impl Iterator<Item = &MotorHandle> {
        [&self.bottom, &self.middle, &self.top].into_iter()
    }

    /// 三盘同时置零
    pub fn set_to_zero_all(&self) {
        for disk in self.iter() {
            disk.set_to_zero();
        }
    }

    /// 三盘同时切换柔顺模式
    pub fn set_compliant_all(&self, compliant: bool) {
        for disk in self.iter() {
            disk.set_compliant(compliant);
        }
    }

    /// 三盘当前转速 [底, 中, 顶]
    pub fn speeds(&self) -> [f64; 3] {
        [self.bottom.speed(), self.middle.speed(), self.top.speed()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clone_shares_cell() {
        let motor = MotorHandle::new("hand.gripper");
        let other = motor.clone();

        motor.set_target_position(42.5);
        assert_eq!(other.target_position(), 42.5);

        other.set_compliant(true);
        assert!(motor.compliant());
    }

    /// 置零后本地位置立即归零，目标坐标换算由零点偏移承担
    #[test]
    fn test_set_to_zero_is_local() {
        let motor = MotorHandle::new("head.disk_top");
        motor.store_raw_position(133.7);
        assert_eq!(motor.position(), 133.7);

        motor.set_to_zero();
        assert_eq!(motor.position(), 0.0);
        assert_eq!(motor.zero_offset(), 133.7);
        // 原始读数不受影响
        assert_eq!(motor.raw_position(), 133.7);
        // 目标被重新表达：本地目标 + 零点（即原始目标）保持不变
        assert_eq!(motor.target_position() + motor.zero_offset(), 0.0);
    }

    #[test]
    fn test_seed_zero_from_calibration() {
        let motor = MotorHandle::new("head.disk_middle");
        motor.seed_zero(-12.0);
        motor.store_raw_position(-12.0);
        assert_eq!(motor.position(), 0.0);
    }

    /// 写方与读方并发访问不需要任何协调
    #[test]
    fn test_concurrent_write_read() {
        let motor = MotorHandle::new("m");
        let writer = motor.clone();

        let t = thread::spawn(move || {
            for i in 0..10_000 {
                writer.set_target_position(i as f64);
            }
        });

        // 读出的值永远是某次完整写入的结果
        for _ in 0..10_000 {
            let v = motor.target_position();
            assert!((0.0..10_000.0).contains(&v));
        }
        t.join().unwrap();
    }

    #[test]
    fn test_disk_group_order() {
        let group = DiskGroup {
            bottom: MotorHandle::new("disk_bottom"),
            middle: MotorHandle::new("disk_middle"),
            top: MotorHandle::new("disk_top"),
        };
        let names: Vec<_> = group.iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, ["disk_bottom", "disk_middle", "disk_top"]);

        group.bottom.store_speed(-3.0);
        assert_eq!(group.speeds(), [-3.0, 0.0, 0.0]);
    }
}
