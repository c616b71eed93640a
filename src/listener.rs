//! 网关连接生命周期事件的监听器。
//! Listener for gateway connection lifecycle events.

use crate::connection::GatewayConnection;
use crate::error::Error;

/// An observer notified of the terminal outcomes of a gateway connection.
///
/// For a single connection attempt exactly one of
/// [`handle_connection_success`](ConnectionListener::handle_connection_success)
/// or [`handle_connection_failure`](ConnectionListener::handle_connection_failure)
/// is delivered. A connection that succeeded and later closes additionally
/// receives exactly one
/// [`handle_connection_closure`](ConnectionListener::handle_connection_closure).
///
/// Callbacks run on the connection's own driver task and must not block.
///
/// 观察网关连接终态结果的监听器。
///
/// 对于单次连接尝试，成功或失败回调恰好被投递一次。成功后又关闭的连接
/// 还会收到恰好一次关闭回调。
///
/// 回调在连接自己的驱动任务上运行，不得阻塞。
pub trait ConnectionListener: Send + Sync + 'static {
    /// The raw connect and TLS handshake both completed and the connection's
    /// completion hook has run.
    ///
    /// 原始连接和TLS握手均已完成，并且连接的完成钩子已经运行。
    fn handle_connection_success(&self, connection: &GatewayConnection);

    /// The connection attempt failed, or an in-flight attempt was cancelled
    /// by an immediate shutdown. The channel, if one was opened, has already
    /// been closed.
    ///
    /// 连接尝试失败，或进行中的尝试被立即关闭取消。如果已打开通道，则通道已被关闭。
    fn handle_connection_failure(&self, connection: &GatewayConnection, cause: &Error);

    /// A previously established connection has closed, either because the
    /// peer closed it or because a shutdown was requested.
    ///
    /// 先前已建立的连接已关闭，原因是对端关闭或本地请求了关闭。
    fn handle_connection_closure(&self, connection: &GatewayConnection);
}
