//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// The primary error type for the gateway connection library.
/// 网关连接库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// The connection name supplied at construction was empty.
    /// 构造时提供的连接名称为空。
    #[error("Connection name must not be empty")]
    InvalidName,

    /// The environment supplied at construction failed validation.
    /// 构造时提供的环境未通过校验。
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(&'static str),

    /// `connect` was called on a connection that already started an attempt.
    /// 在已经开始过连接尝试的连接上再次调用了 `connect`。
    #[error("{0} already started a connection attempt")]
    AlreadyStarted(String),

    /// An underlying I/O error occurred.
    /// 发生了底层的I/O错误。
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The raw socket connect to the gateway failed.
    /// 到网关的原始套接字连接失败。
    #[error("Failed to connect to {host}:{port}: {source}")]
    Connect {
        /// The gateway host the attempt targeted.
        host: String,
        /// The gateway port the attempt targeted.
        port: u16,
        /// The underlying connect error.
        #[source]
        source: std::io::Error,
    },

    /// The TLS handshake failed after the raw connect succeeded.
    /// 原始连接成功后TLS握手失败。
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),

    /// The connected channel carries no TLS layer. This indicates a
    /// misconfigured transport, not a network failure.
    ///
    /// 已连接的通道上没有TLS层。这表示传输配置错误，而不是网络故障。
    #[error("No TLS layer present on the connected channel")]
    MissingTlsLayer,

    /// The TLS client configuration could not be built.
    /// 无法构建TLS客户端配置。
    #[error("TLS configuration error: {0}")]
    TlsConfig(#[from] tokio_rustls::rustls::Error),

    /// An in-flight connection attempt was cancelled by an immediate
    /// shutdown request.
    ///
    /// 进行中的连接尝试被立即关闭请求取消。
    #[error("Connection attempt aborted by shutdown request")]
    Aborted,

    /// The channel is closed.
    /// 通道已关闭。
    #[error("Connection is closed")]
    ConnectionClosed,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
