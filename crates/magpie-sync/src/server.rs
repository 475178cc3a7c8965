//! 状态同步服务器
//!
//! 独立广播线程按 10ms 绝对锚点节拍运行，每拍：
//! 接收新观察者 -> 拍平所有已注册部件的电机 -> 序列化 -> 逐个写出。
//! 某个观察者写失败只会丢掉该观察者，广播继续。
//!
//! 并发契约：注册表是 `ArcSwap<Vec<_>>`，`register` 用 rcu 追加，
//! 广播线程每拍 `load` 一次——双方都不持有对方需要的锁，
//! 电机目标写入无需与广播方做任何协调即可在下一拍可见。

use crate::protocol::{MotorGoal, Snapshot};
use arc_swap::ArcSwap;
use magpie_bus::MotorHandle;
use parking_lot::Mutex;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, trace, warn};

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 6171;

/// 广播周期（固定 10ms）
pub const BROADCAST_PERIOD: Duration = Duration::from_millis(10);

/// 单个观察者的写超时：写满/停滞的观察者按断开处理
const OBSERVER_WRITE_TIMEOUT: Duration = Duration::from_millis(50);

/// 同步层错误类型
#[derive(Error, Debug)]
pub enum SyncError {
    /// 监听端口绑定失败
    #[error("failed to bind sync server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// 可被广播的电机来源（部件侧实现）
///
/// 广播线程每拍重新查询 `motors()`，因此注册之后再挂接的电机
/// 会自动出现在后续快照里。
pub trait MotorSource: Send + Sync {
    /// 部件名（日志用）
    fn part_name(&self) -> &str;

    /// 当前挂接的全部电机句柄（挂接顺序）
    fn motors(&self) -> Vec<MotorHandle>;
}

type Registry = Arc<ArcSwap<Vec<Arc<dyn MotorSource>>>>;

/// 进程级共享实例
static SHARED: Mutex<Option<Arc<SyncServer>>> = Mutex::new(None);

/// 状态同步服务器
///
/// 状态机：`Stopped -> Running -> Stopped`。
/// 进程级 `shared()` 入口保证同一时刻至多一个共享实例。
pub struct SyncServer {
    local_addr: SocketAddr,
    registry: Registry,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SyncServer {
    /// 绑定地址并启动广播线程
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Arc<Self>, SyncError> {
        let listener = TcpListener::bind(&addr).map_err(|source| SyncError::Bind {
            addr: format!("{:?}", addr),
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| SyncError::Bind {
                addr: format!("{:?}", addr),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| SyncError::Bind {
            addr: format!("{:?}", addr),
            source,
        })?;

        let registry: Registry = Arc::new(ArcSwap::from_pointee(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let registry = registry.clone();
            let running = running.clone();
            std::thread::spawn(move || broadcast_loop(listener, registry, running))
        };

        info!(%local_addr, "sync server started");
        Ok(Arc::new(Self {
            local_addr,
            registry,
            running,
            thread: Mutex::new(Some(thread)),
        }))
    }

    /// 进程级共享实例（默认端口，惰性启动）
    ///
    /// 重复调用复用正在运行的实例；实例被 `close()` 之后，
    /// 下一次调用会启动新的实例。
    pub fn shared() -> Result<Arc<Self>, SyncError> {
        let mut shared = SHARED.lock();
        if let Some(server) = shared.as_ref() {
            if server.is_running() {
                return Ok(server.clone());
            }
        }
        let server = Self::bind(("0.0.0.0", DEFAULT_PORT))?;
        *shared = Some(server.clone());
        Ok(server)
    }

    /// 实际监听地址（测试用 `127.0.0.1:0` 时在此取回分配的端口）
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 注册一个部件（只增不减）
    ///
    /// rcu 追加：正在进行的广播继续使用旧表，下一拍看到新表。
    pub fn register(&self, part: Arc<dyn MotorSource>) {
        info!(part = part.part_name(), "registering part for broadcast");
        self.registry.rcu(|current| {
            let mut next = (**current).clone();
            next.push(part.clone());
            next
        });
    }

    /// 构建当前快照（注册顺序，部件内挂接顺序）
    pub fn snapshot(&self) -> Snapshot {
        build_snapshot(&self.registry)
    }

    /// 停止广播线程并等待其完全退出
    ///
    /// 返回后保证不再有任何广播发生。幂等。
    pub fn close(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                warn!("sync broadcast thread panicked");
            }
        }
        info!("sync server closed");
    }
}

impl Drop for SyncServer {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_snapshot(registry: &Registry) -> Snapshot {
    let parts = registry.load_full();
    let motors = parts
        .iter()
        .flat_map(|part| part.motors())
        .map(|motor| MotorGoal {
            name: motor.name().to_string(),
            goal_position: motor.target_position(),
        })
        .collect();
    Snapshot { motors }
}

/// 广播主循环（独立线程）
fn broadcast_loop(listener: TcpListener, registry: Registry, running: Arc<AtomicBool>) {
    let mut observers: Vec<(TcpStream, SocketAddr)> = Vec::new();
    let mut next_tick = Instant::now();

    while running.load(Ordering::Acquire) {
        next_tick += BROADCAST_PERIOD;

        // 接收新观察者（非阻塞，排空 backlog）
        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        warn!(%peer, error = %e, "failed to configure observer socket");
                        continue;
                    }
                    let _ = stream.set_nodelay(true);
                    let _ = stream.set_write_timeout(Some(OBSERVER_WRITE_TIMEOUT));
                    info!(%peer, "observer connected");
                    observers.push((stream, peer));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }

        // 没有观察者时本拍空转（快照不构建）
        if !observers.is_empty() {
            let snapshot = build_snapshot(&registry);
            match serde_json::to_string(&snapshot) {
                Ok(mut payload) => {
                    payload.push('\n');
                    observers.retain_mut(|(stream, peer)| {
                        match stream.write_all(payload.as_bytes()) {
                            Ok(()) => true,
                            Err(e) => {
                                // 单个观察者断开不影响其余观察者
                                info!(%peer, error = %e, "observer disconnected");
                                false
                            }
                        }
                    });
                }
                Err(e) => warn!(error = %e, "snapshot serialization failed"),
            }
        }

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            trace!("broadcast tick overrun, resetting anchor");
            next_tick = now;
        }
    }

    info!("sync broadcast loop exited");
}
