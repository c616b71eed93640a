//! 单个网关连接的生命周期：公共句柄及其状态机。
//! The lifecycle of a single gateway connection: the public handle and its
//! state machine.

pub mod command;
pub(crate) mod driver;


use crate::config::Environment;
use crate::error::{Error, Result};
use crate::listener::ConnectionListener;
use crate::strategy::ConnectionStrategy;
use crate::transport::Channel;
use command::DriverCommand;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

/// The externally observable lifecycle state of a gateway connection.
/// 网关连接对外可见的生命周期状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No connection attempt has been started.
    /// 尚未开始连接尝试。
    Idle,
    /// The raw connect is in flight.
    /// 原始连接正在进行。
    Connecting,
    /// The socket is open and the TLS handshake is in flight.
    /// 套接字已打开，TLS握手正在进行。
    Handshaking,
    /// The handshake completed and the completion hook has run.
    /// 握手已完成，完成钩子已运行。
    Established,
    /// The connection is closed. Terminal; a closed connection is not reused.
    /// 连接已关闭。终态；关闭的连接不会被重用。
    Closed,
}

/// The internal attempt state, advanced only forward.
///
/// One mutex guards all of it, so a shutdown request can never race past the
/// registration of the driver task: a request that arrives before
/// registration is recorded in `close_requested` and consumed, under the
/// same lock, when the driver registers.
///
/// 内部的尝试状态，只会向前推进。
///
/// 一把互斥锁保护全部状态，因此关闭请求永远不会与驱动任务的注册发生竞争：
/// 注册前到达的请求记录在 `close_requested` 中，并在驱动注册时于同一把锁下
/// 被消费。
pub(crate) enum AttemptState {
    /// No attempt yet.
    /// 尚无尝试。
    Idle,
    /// `connect` was accepted but the driver task has not yet registered its
    /// command channel.
    ///
    /// `connect` 已被接受，但驱动任务尚未注册其命令通道。
    AwaitingRegistration { close_requested: bool },
    /// The driver is registered and the raw connect is in flight.
    /// 驱动已注册，原始连接正在进行。
    Connecting {
        commands: mpsc::UnboundedSender<DriverCommand>,
    },
    /// The socket is open and the TLS handshake is in flight.
    /// 套接字已打开，TLS握手正在进行。
    Handshaking {
        commands: mpsc::UnboundedSender<DriverCommand>,
        channel: Arc<dyn Channel>,
    },
    /// The connection is established and being watched for closure.
    /// 连接已建立，正在监视其关闭。
    Established {
        commands: mpsc::UnboundedSender<DriverCommand>,
        channel: Arc<dyn Channel>,
    },
    /// Terminal.
    /// 终态。
    Closed,
}

/// State shared between the public handle and the driver task.
/// 公共句柄与驱动任务之间共享的状态。
pub(crate) struct Shared {
    pub(crate) environment: Arc<Environment>,
    pub(crate) name: String,
    pub(crate) strategy: Arc<dyn ConnectionStrategy>,
    pub(crate) state: Mutex<AttemptState>,
    /// Latched on handshake success; never cleared, so the handshake query
    /// stays true for an established connection that later closes.
    ///
    /// 握手成功时置位；永不清除，因此已建立连接在之后关闭时握手查询仍为真。
    pub(crate) handshake_done: AtomicBool,
}

impl Shared {
    /// Locks the state, recovering from a poisoned mutex. The state machine
    /// only moves forward, so a panic while holding the lock leaves a state
    /// that is still safe to read.
    ///
    /// 锁定状态，并从中毒的互斥锁中恢复。状态机只向前推进，因此持锁时的
    /// panic 留下的状态仍可安全读取。
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, AttemptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the state machine to its terminal state.
    /// 将状态机移至终态。
    pub(crate) fn set_closed(&self) {
        *self.lock_state() = AttemptState::Closed;
    }

    fn listener(&self) -> Option<Arc<dyn ConnectionListener>> {
        self.strategy.listener()
    }

    pub(crate) fn notify_success(self: &Arc<Self>) {
        if let Some(listener) = self.listener() {
            listener.handle_connection_success(&GatewayConnection {
                shared: Arc::clone(self),
            });
        }
    }

    pub(crate) fn notify_failure(self: &Arc<Self>, cause: &Error) {
        if let Some(listener) = self.listener() {
            listener.handle_connection_failure(
                &GatewayConnection {
                    shared: Arc::clone(self),
                },
                cause,
            );
        }
    }

    pub(crate) fn notify_closure(self: &Arc<Self>) {
        if let Some(listener) = self.listener() {
            listener.handle_connection_closure(&GatewayConnection {
                shared: Arc::clone(self),
            });
        }
    }
}

/// A single outbound, TLS-secured connection to a remote gateway.
///
/// The handle is cheap to clone; all clones drive the same attempt. A
/// connection makes at most one attempt: [`connect`](GatewayConnection::connect)
/// fails fast when called twice, and a closed connection is not reused.
///
/// 到远程网关的单个出站TLS加密连接。
///
/// 句柄克隆开销很小；所有克隆驱动同一次尝试。一个连接最多进行一次尝试：
/// 重复调用 [`connect`](GatewayConnection::connect) 会立即失败，关闭的连接
/// 不会被重用。
pub struct GatewayConnection {
    shared: Arc<Shared>,
}

impl Clone for GatewayConnection {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl GatewayConnection {
    /// Creates a new connection for the given environment, name, and
    /// strategy.
    ///
    /// Fails with [`Error::InvalidName`] when the name is empty and with
    /// [`Error::InvalidEnvironment`] when the environment fails validation.
    ///
    /// 为给定的环境、名称和策略创建新连接。
    ///
    /// 名称为空时返回 [`Error::InvalidName`]；环境未通过校验时返回
    /// [`Error::InvalidEnvironment`]。
    pub fn new(
        environment: Arc<Environment>,
        name: impl Into<String>,
        strategy: Arc<dyn ConnectionStrategy>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        environment.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                environment,
                name,
                strategy,
                state: Mutex::new(AttemptState::Idle),
                handshake_done: AtomicBool::new(false),
            }),
        })
    }

    /// Asynchronously opens the connection and performs the TLS handshake.
    ///
    /// Returns immediately; every outcome is delivered through the
    /// strategy's listener. Exactly one of success or failure is notified
    /// per attempt, and an established connection that later closes is
    /// additionally notified of closure. Must be called from within a Tokio
    /// runtime.
    ///
    /// Fails fast with [`Error::AlreadyStarted`] when this connection
    /// already started an attempt.
    ///
    /// 异步打开连接并执行TLS握手。
    ///
    /// 立即返回；所有结果都通过策略的监听器投递。每次尝试恰好通知一次成功
    /// 或失败，已建立的连接在之后关闭时还会收到关闭通知。必须在Tokio运行时
    /// 内调用。
    ///
    /// 当此连接已开始过尝试时，立即以 [`Error::AlreadyStarted`] 失败。
    pub fn connect(&self) -> Result<()> {
        {
            let mut state = self.shared.lock_state();
            match *state {
                AttemptState::Idle => {
                    *state = AttemptState::AwaitingRegistration {
                        close_requested: false,
                    };
                }
                _ => return Err(Error::AlreadyStarted(self.shared.name.clone())),
            }
        }
        debug!(name = %self.shared.name, "beginning connection process");
        tokio::spawn(driver::run(Arc::clone(&self.shared)));
        Ok(())
    }

    /// Immediately closes this connection, interrupting whatever stage is in
    /// flight.
    ///
    /// A request arriving before the driver task registers is recorded and
    /// honored once registration completes; afterwards it is scheduled onto
    /// the connection's own driver task, which cancels the raw connect if
    /// one is in flight, else cancels the handshake, else closes the
    /// channel outright. An attempt cancelled before establishment is
    /// notified as a failure; an established connection as a closure.
    ///
    /// Idempotent, and a no-op on a connection that never started an
    /// attempt or has already closed.
    ///
    /// 立即关闭此连接，中断正在进行的任何阶段。
    ///
    /// 在驱动任务注册前到达的请求会被记录，并在注册完成后兑现；之后的请求
    /// 被调度到连接自己的驱动任务上：若原始连接尚在进行则取消之，否则取消
    /// 握手，否则直接关闭通道。建立前被取消的尝试按失败通知；已建立的连接
    /// 按关闭通知。
    ///
    /// 幂等；对从未开始尝试或已经关闭的连接是空操作。
    pub fn shutdown_immediately(&self) {
        let mut state = self.shared.lock_state();
        match &mut *state {
            AttemptState::Idle | AttemptState::Closed => {}
            AttemptState::AwaitingRegistration { close_requested } => {
                *close_requested = true;
                debug!(
                    name = %self.shared.name,
                    "shutdown requested before channel registration"
                );
            }
            AttemptState::Connecting { commands }
            | AttemptState::Handshaking { commands, .. }
            | AttemptState::Established { commands, .. } => {
                // The driver consumes at most one shutdown command; extras
                // are dropped with the receiver, which keeps repeated
                // shutdowns idempotent. A send error means the driver
                // already finished, which is the no-op case.
                //
                // 驱动最多消费一条关闭命令；多余的命令随接收端一起丢弃，
                // 这保证了重复关闭的幂等性。发送失败意味着驱动已经结束，
                // 即空操作的情形。
                let _ = commands.send(DriverCommand::ShutdownImmediately);
            }
        }
    }

    /// Returns whether this connection has completed its TLS handshake with
    /// the gateway.
    ///
    /// A query, never an error: false before any attempt, while the
    /// handshake is pending, and when no TLS layer could be found.
    ///
    /// 返回此连接是否已与网关完成TLS握手。
    ///
    /// 这是一个查询，永不出错：在任何尝试之前、握手进行期间以及找不到TLS层
    /// 时均为假。
    pub fn has_completed_handshake(&self) -> bool {
        self.shared.handshake_done.load(Ordering::Acquire)
    }

    /// The current lifecycle state.
    /// 当前的生命周期状态。
    pub fn state(&self) -> LifecycleState {
        match &*self.shared.lock_state() {
            AttemptState::Idle => LifecycleState::Idle,
            AttemptState::AwaitingRegistration { .. } | AttemptState::Connecting { .. } => {
                LifecycleState::Connecting
            }
            AttemptState::Handshaking { .. } => LifecycleState::Handshaking,
            AttemptState::Established { .. } => LifecycleState::Established,
            AttemptState::Closed => LifecycleState::Closed,
        }
    }

    /// The channel associated with this connection, or `None` before the
    /// raw connect has completed and after the connection has closed.
    ///
    /// 与此连接关联的通道；在原始连接完成前以及连接关闭后为 `None`。
    pub fn channel(&self) -> Option<Arc<dyn Channel>> {
        match &*self.shared.lock_state() {
            AttemptState::Handshaking { channel, .. }
            | AttemptState::Established { channel, .. } => Some(Arc::clone(channel)),
            _ => None,
        }
    }

    /// The human-readable name of this connection.
    /// 此连接的人类可读名称。
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The environment this connection operates in.
    /// 此连接运行所在的环境。
    pub fn environment(&self) -> &Environment {
        &self.shared.environment
    }
}
