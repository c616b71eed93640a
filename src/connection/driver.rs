//! The per-connection driver task.
//!
//! One driver task runs per connection attempt and is its execution
//! context: every stage of the attempt, every cancel or close of the
//! channel, and every listener notification happens here. Funneling the
//! notifications through this single task is what makes them exactly-once
//! and ordered.
//!
//! 每个连接的驱动任务。
//!
//! 每次连接尝试运行一个驱动任务，它就是该连接的执行上下文：尝试的每个阶段、
//! 对通道的每次取消或关闭、以及每次监听器通知都发生在这里。所有通知汇集到
//! 这个单一任务，正是恰好一次和有序投递的保证。

use super::command::DriverCommand;
use super::{AttemptState, Shared};
use crate::error::Error;
use crate::transport::{Channel, Transport};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Runs one connection attempt to completion.
///
/// The `select!`s below are biased with the command arm first, so a shutdown
/// request always takes priority over stage completion: it cancels the raw
/// connect if one is in flight, else cancels the handshake, else closes the
/// established channel outright.
///
/// 将一次连接尝试运行至完成。
///
/// 下面的 `select!` 均为 biased 且命令分支在前，因此关闭请求总是优先于阶段
/// 完成：原始连接尚在进行则取消之，否则取消握手，否则直接关闭已建立的通道。
pub(crate) async fn run(shared: Arc<Shared>) {
    let (commands_tx, mut commands) = mpsc::unbounded_channel();

    // Registration: publish the command channel so shutdown requests can be
    // scheduled onto this task. A shutdown recorded before this point is
    // consumed here, under the same lock that recorded it.
    //
    // 注册：发布命令通道，使关闭请求可以被调度到此任务上。在此之前记录的
    // 关闭请求在这里、于记录它的同一把锁下被消费。
    {
        let mut state = shared.lock_state();
        match *state {
            AttemptState::AwaitingRegistration {
                close_requested: false,
            } => {
                *state = AttemptState::Connecting {
                    commands: commands_tx.clone(),
                };
            }
            AttemptState::AwaitingRegistration {
                close_requested: true,
            } => {
                *state = AttemptState::Closed;
                drop(state);
                debug!(
                    name = %shared.name,
                    "shutdown requested before registration; aborting attempt"
                );
                shared.notify_failure(&Error::Aborted);
                return;
            }
            // `connect` is the only spawner and moves the state to
            // AwaitingRegistration before spawning.
            //
            // `connect` 是唯一的生成者，且在生成前已将状态移至
            // AwaitingRegistration。
            _ => return,
        }
    }

    let transport = shared.strategy.transport();
    let host = shared.strategy.host();
    let port = shared.strategy.port();
    debug!(name = %shared.name, host = %host, port, "connecting to gateway");

    // Stage 1: raw connect.
    // 阶段1：原始连接。
    let channel = tokio::select! {
        biased;
        Some(DriverCommand::ShutdownImmediately) = commands.recv() => {
            shared.set_closed();
            debug!(name = %shared.name, "connection attempt cancelled during raw connect");
            shared.notify_failure(&Error::Aborted);
            return;
        }
        result = transport.connect(&host, port) => match result {
            Ok(channel) => channel,
            Err(cause) => {
                shared.set_closed();
                warn!(name = %shared.name, %cause, "failed to connect to gateway");
                shared.notify_failure(&cause);
                return;
            }
        },
    };

    *shared.lock_state() = AttemptState::Handshaking {
        commands: commands_tx.clone(),
        channel: Arc::clone(&channel),
    };
    debug!(name = %shared.name, "connected; waiting for TLS handshake");

    // Stage 2: TLS handshake. A missing TLS layer surfaces here as an
    // explicit configuration error and is treated like any other handshake
    // failure: close, then report once.
    //
    // 阶段2：TLS握手。缺失TLS层在这里以显式的配置错误出现，并与其他握手失败
    // 同样处理：先关闭，再报告一次。
    tokio::select! {
        biased;
        Some(DriverCommand::ShutdownImmediately) = commands.recv() => {
            channel.close().await;
            shared.set_closed();
            debug!(name = %shared.name, "connection attempt cancelled during TLS handshake");
            shared.notify_failure(&Error::Aborted);
            return;
        }
        result = channel.complete_handshake() => {
            if let Err(cause) = result {
                channel.close().await;
                shared.set_closed();
                warn!(
                    name = %shared.name,
                    %cause,
                    "failed to complete TLS handshake with gateway"
                );
                shared.notify_failure(&cause);
                return;
            }
        },
    }

    shared.handshake_done.store(true, Ordering::Release);
    debug!(name = %shared.name, "successfully completed TLS handshake");

    // The completion hook runs before the success notification.
    // 完成钩子在成功通知之前运行。
    shared.strategy.handle_connection_completion(&channel);
    *shared.lock_state() = AttemptState::Established {
        commands: commands_tx.clone(),
        channel: Arc::clone(&channel),
    };
    shared.notify_success();

    // Stage 3: established. Wait for a shutdown request or the channel
    // closing on its own; either way the listener is notified of closure,
    // not failure.
    //
    // 阶段3：已建立。等待关闭请求或通道自行关闭；两种情况下监听器收到的都是
    // 关闭通知，而非失败通知。
    tokio::select! {
        biased;
        Some(DriverCommand::ShutdownImmediately) = commands.recv() => {
            debug!(name = %shared.name, "shutting down established connection");
            channel.close().await;
        }
        _ = channel.wait_closed() => {}
    }

    shared.set_closed();
    debug!(name = %shared.name, "connection closed");
    shared.notify_closure();
}
