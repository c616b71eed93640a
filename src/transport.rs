//! Transport layer abstraction for the gateway connection.
//!
//! This module separates the two asynchronous stages of establishing a
//! secured channel: the raw socket connect, performed by a [`Transport`],
//! and the TLS handshake, driven afterwards on the returned [`Channel`].
//! Keeping the stages apart lets the connection lifecycle cancel each one
//! independently.
//!
//! 网关连接的传输层抽象。
//!
//! 此模块将建立加密通道的两个异步阶段分开：由 [`Transport`] 执行的原始套接字
//! 连接，以及之后在返回的 [`Channel`] 上驱动的TLS握手。将两个阶段分开使连接
//! 生命周期可以独立取消其中任何一个。

pub mod tls;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;
use std::sync::Arc;

pub use tls::{TlsChannel, TlsTransport};

/// The transport provider: opens raw sockets to the gateway.
///
/// Implementations must produce channels whose pipeline contains a TLS
/// layer; a channel without one fails its handshake with
/// [`Error::MissingTlsLayer`](crate::error::Error::MissingTlsLayer).
///
/// 传输提供者：打开到网关的原始套接字。
///
/// 实现必须产生带有TLS层的通道；没有TLS层的通道会以
/// [`Error::MissingTlsLayer`](crate::error::Error::MissingTlsLayer) 握手失败。
#[async_trait]
pub trait Transport: Send + Sync + Debug + 'static {
    /// Opens a raw connection to `host:port`.
    ///
    /// This performs the socket connect only; the TLS handshake is driven
    /// separately via [`Channel::complete_handshake`].
    ///
    /// 打开到 `host:port` 的原始连接。
    ///
    /// 这只执行套接字连接；TLS握手由 [`Channel::complete_handshake`] 单独驱动。
    async fn connect(&self, host: &str, port: u16) -> Result<Arc<dyn Channel>>;
}

/// A single channel to the gateway, owned by its transport.
///
/// 到网关的单个通道，由其传输所有。
#[async_trait]
pub trait Channel: Send + Sync + Debug + 'static {
    /// Drives the TLS handshake on this channel to completion.
    ///
    /// Returns [`Error::MissingTlsLayer`](crate::error::Error::MissingTlsLayer)
    /// when the channel was built without a TLS layer, and
    /// [`Error::Handshake`](crate::error::Error::Handshake) when the
    /// negotiation itself fails.
    ///
    /// 驱动此通道上的TLS握手直至完成。
    ///
    /// 当通道没有TLS层时返回 `MissingTlsLayer`；当协商本身失败时返回 `Handshake`。
    async fn complete_handshake(&self) -> Result<()>;

    /// Returns whether the TLS handshake has completed successfully.
    /// 返回TLS握手是否已成功完成。
    fn handshake_done(&self) -> bool;

    /// Sends raw bytes over the secured channel.
    /// 在加密通道上发送原始字节。
    async fn send(&self, payload: Bytes) -> Result<()>;

    /// Receives the next chunk of raw bytes from the secured channel.
    /// 从加密通道接收下一块原始字节。
    async fn recv(&self) -> Result<Bytes>;

    /// Resolves once the channel has closed, whether by the peer, by an
    /// error, or by a local [`close`](Channel::close).
    ///
    /// 在通道关闭后完成，无论是对端关闭、出错还是本地调用 [`close`](Channel::close)。
    async fn wait_closed(&self);

    /// Closes the channel. Idempotent.
    /// 关闭通道。幂等。
    async fn close(&self);
}
