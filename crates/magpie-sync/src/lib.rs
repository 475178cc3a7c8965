//! # Magpie 状态同步层
//!
//! 把所有已注册部件的电机目标状态以固定节拍广播给远程观察者：
//! - [`SyncServer`]：后台广播线程 + 非阻塞 TCP 监听，10ms 一拍
//! - [`RemoteIo`]：远程可观察后端，占位句柄的目标值即广播的唯一真相
//! - [`protocol`]：每拍一条的 JSON 快照消息
//!
//! 广播线程与执行器控制逻辑完全解耦：注册表用 `ArcSwap` 做 rcu 追加，
//! 正在进行的广播永远不会被注册阻塞或破坏。

mod remote;
pub mod protocol;
mod server;

pub use protocol::{MotorGoal, Snapshot};
pub use remote::RemoteIo;
pub use server::{BROADCAST_PERIOD, DEFAULT_PORT, MotorSource, SyncError, SyncServer};
