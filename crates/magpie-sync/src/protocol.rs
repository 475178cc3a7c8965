//! 广播协议
//!
//! 每个广播节拍发送一条 UTF-8 文本消息（换行结尾）：
//!
//! ```text
//! {"motors":[{"name":"hand.gripper","goal_position":12.5}, ...]}
//! ```
//!
//! 电机顺序 = 部件注册顺序，其次是部件内的挂接顺序。
//! 顺序可观察但对消费方没有语义。

use serde::{Deserialize, Serialize};

/// 单个电机的目标状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MotorGoal {
    pub name: String,
    pub goal_position: f64,
}

/// 一个广播节拍的完整快照
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub motors: Vec<MotorGoal>,
}
