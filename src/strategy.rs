//! 连接策略：具体连接类型提供的扩展点。
//! Connection strategy: the extension points supplied by a concrete
//! connection type.

use crate::config::Environment;
use crate::error::Result;
use crate::listener::ConnectionListener;
use crate::transport::{Channel, TlsTransport, Transport};
use std::sync::Arc;

/// The extension points a concrete connection type supplies to the
/// lifecycle: which transport to use, where the remote service lives, any
/// protocol-specific setup to run after the handshake, and the lifecycle
/// listener to notify.
///
/// 具体连接类型向生命周期提供的扩展点：使用哪个传输、远程服务的位置、
/// 握手后要运行的协议相关设置，以及要通知的生命周期监听器。
pub trait ConnectionStrategy: Send + Sync + 'static {
    /// The transport provider used to open the channel. Its channels must
    /// carry a TLS layer.
    ///
    /// 用于打开通道的传输提供者。其通道必须带有TLS层。
    fn transport(&self) -> Arc<dyn Transport>;

    /// The host of the remote service this connection talks to.
    /// 此连接通信的远程服务主机。
    fn host(&self) -> String;

    /// The port of the remote service this connection talks to.
    /// 此连接通信的远程服务端口。
    fn port(&self) -> u16;

    /// Protocol-specific setup run after the TLS handshake completes and
    /// before the listener is notified of success. Must not block.
    ///
    /// TLS握手完成后、监听器收到成功通知前运行的协议相关设置。不得阻塞。
    fn handle_connection_completion(&self, channel: &Arc<dyn Channel>);

    /// The lifecycle listener to notify, if any. Looked up at each
    /// notification point, so a listener attached late still observes later
    /// events.
    ///
    /// 要通知的生命周期监听器（如果有）。在每个通知点查询，因此较晚附加的
    /// 监听器仍能观察到之后的事件。
    fn listener(&self) -> Option<Arc<dyn ConnectionListener>>;
}

/// The standard strategy for gateway connections: a [`TlsTransport`] built
/// from the environment's credentials, targeting the environment's gateway
/// endpoint.
///
/// 网关连接的标准策略：根据环境凭据构建的 [`TlsTransport`]，指向环境中的
/// 网关端点。
pub struct GatewayStrategy {
    environment: Arc<Environment>,
    transport: Arc<TlsTransport>,
    listener: Option<Arc<dyn ConnectionListener>>,
}

impl GatewayStrategy {
    /// Builds the strategy, constructing the TLS transport from the
    /// environment.
    ///
    /// 构建策略，并根据环境构造TLS传输。
    pub fn new(environment: Arc<Environment>) -> Result<Self> {
        let transport = Arc::new(TlsTransport::from_environment(&environment)?);
        Ok(Self {
            environment,
            transport,
            listener: None,
        })
    }

    /// Attaches a lifecycle listener.
    /// 附加一个生命周期监听器。
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ConnectionListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

impl ConnectionStrategy for GatewayStrategy {
    fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    fn host(&self) -> String {
        self.environment.gateway_host.clone()
    }

    fn port(&self) -> u16 {
        self.environment.gateway_port
    }

    fn handle_connection_completion(&self, _channel: &Arc<dyn Channel>) {
        // Plain gateway channels need no post-handshake setup.
        // 普通网关通道不需要握手后的额外设置。
    }

    fn listener(&self) -> Option<Arc<dyn ConnectionListener>> {
        self.listener.clone()
    }
}
