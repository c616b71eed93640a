//! The rustls-backed transport implementation.
//!
//! `TlsTransport` performs the raw TCP connect and hands out `TlsChannel`s
//! that hold the handshake back until the lifecycle asks for it, so the
//! connect and handshake stages remain independently cancellable.
//!
//! 基于rustls的传输实现。
//!
//! `TlsTransport` 执行原始TCP连接并产出 `TlsChannel`，后者将握手推迟到生命周期
//! 请求时才进行，使连接和握手两个阶段可以被独立取消。

use crate::config::Environment;
use crate::error::{Error, Result};
use crate::transport::{Channel, Transport};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

const RECV_CHUNK_CAPACITY: usize = 8 * 1024;

/// A [`Transport`] that opens TCP sockets and secures them with rustls.
///
/// 打开TCP套接字并用rustls加密的 [`Transport`]。
pub struct TlsTransport {
    connector: TlsConnector,
    server_name_override: Option<ServerName<'static>>,
}

impl TlsTransport {
    /// Builds a transport from the environment's credentials and TLS
    /// options.
    ///
    /// 根据环境中的凭据和TLS选项构建传输。
    pub fn from_environment(environment: &Environment) -> Result<Self> {
        environment.validate()?;

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        if let Some(pem) = &environment.tls.extra_root_certificates_pem {
            let mut reader = pem.as_slice();
            for cert in rustls_pemfile::certs(&mut reader) {
                roots.add(cert?)?;
            }
        }

        let builder = ClientConfig::builder().with_root_certificates(roots);
        let credentials = &environment.credentials;
        let mut config = match (
            &credentials.certificate_chain_pem,
            &credentials.private_key_pem,
        ) {
            (Some(chain_pem), Some(key_pem)) => {
                let mut chain_reader = chain_pem.as_slice();
                let chain = rustls_pemfile::certs(&mut chain_reader)
                    .collect::<std::io::Result<Vec<_>>>()?;
                let mut key_reader = key_pem.as_slice();
                let key = rustls_pemfile::private_key(&mut key_reader)?.ok_or(
                    Error::InvalidEnvironment("no private key found in credential PEM"),
                )?;
                builder.with_client_auth_cert(chain, key)?
            }
            _ => builder.with_no_client_auth(),
        };
        config.alpn_protocols = environment.tls.alpn_protocols.clone();

        let server_name_override = match &environment.tls.server_name_override {
            Some(name) => Some(ServerName::try_from(name.clone()).map_err(|_| {
                Error::InvalidEnvironment("server name override is not a valid server name")
            })?),
            None => None,
        };

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            server_name_override,
        })
    }
}

impl fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsTransport")
            .field("server_name_override", &self.server_name_override)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn connect(&self, host: &str, port: u16) -> Result<Arc<dyn Channel>> {
        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|source| Error::Connect {
                host: host.to_string(),
                port,
                source,
            })?;
        tcp.set_nodelay(true)?;

        let server_name = match &self.server_name_override {
            Some(name) => name.clone(),
            None => ServerName::try_from(host.to_string()).map_err(|_| {
                Error::InvalidEnvironment("gateway host is not a valid server name")
            })?,
        };

        Ok(Arc::new(TlsChannel::new(
            tcp,
            self.connector.clone(),
            server_name,
        )))
    }
}

/// The handshake stage of a channel: the raw socket waiting for its TLS
/// negotiation, or already consumed.
///
/// 通道的握手阶段：等待TLS协商的原始套接字，或已被消耗。
enum HandshakeState {
    Pending {
        tcp: TcpStream,
        connector: TlsConnector,
        server_name: ServerName<'static>,
    },
    Done,
}

/// A rustls-secured [`Channel`].
///
/// The raw socket is held until [`complete_handshake`](Channel::complete_handshake)
/// runs; afterwards the stream is split so sends, receives, and closes never
/// contend on one lock. A pending receive is raced against the closed signal
/// so a close cannot be starved by it.
///
/// 由rustls加密的 [`Channel`]。
///
/// 原始套接字保留到 [`complete_handshake`](Channel::complete_handshake) 运行为止；
/// 之后流被拆分，使发送、接收和关闭不会竞争同一把锁。进行中的接收与关闭信号
/// 竞争，因此关闭不会被其饿死。
pub struct TlsChannel {
    handshake: Mutex<HandshakeState>,
    read: Mutex<Option<ReadHalf<TlsStream<TcpStream>>>>,
    write: Mutex<Option<WriteHalf<TlsStream<TcpStream>>>>,
    handshake_done: AtomicBool,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl TlsChannel {
    pub(crate) fn new(
        tcp: TcpStream,
        connector: TlsConnector,
        server_name: ServerName<'static>,
    ) -> Self {
        let (closed_tx, closed_rx) = watch::channel(false);
        Self {
            handshake: Mutex::new(HandshakeState::Pending {
                tcp,
                connector,
                server_name,
            }),
            read: Mutex::new(None),
            write: Mutex::new(None),
            handshake_done: AtomicBool::new(false),
            closed_tx,
            closed_rx,
        }
    }

    fn mark_closed(&self) {
        self.closed_tx.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }
}

impl fmt::Debug for TlsChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsChannel")
            .field("handshake_done", &self.handshake_done())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Channel for TlsChannel {
    async fn complete_handshake(&self) -> Result<()> {
        let mut state = self.handshake.lock().await;
        // Take the raw socket out first. If this future is dropped
        // mid-negotiation the socket goes with it, which is what cancelling
        // a handshake means for a TLS stream.
        //
        // 先将原始套接字取出。如果此future在协商中途被丢弃，套接字也随之丢弃，
        // 这正是取消TLS流握手的含义。
        match std::mem::replace(&mut *state, HandshakeState::Done) {
            HandshakeState::Pending {
                tcp,
                connector,
                server_name,
            } => match connector.connect(server_name, tcp).await {
                Ok(stream) => {
                    let (read, write) = tokio::io::split(stream);
                    *self.read.lock().await = Some(read);
                    *self.write.lock().await = Some(write);
                    self.handshake_done.store(true, Ordering::Release);
                    Ok(())
                }
                Err(e) => {
                    self.mark_closed();
                    Err(Error::Handshake(e))
                }
            },
            HandshakeState::Done => {
                if self.handshake_done() {
                    Ok(())
                } else {
                    Err(Error::ConnectionClosed)
                }
            }
        }
    }

    fn handshake_done(&self) -> bool {
        self.handshake_done.load(Ordering::Acquire)
    }

    async fn send(&self, payload: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        let mut write = self.write.lock().await;
        let Some(stream) = write.as_mut() else {
            return Err(Error::ConnectionClosed);
        };
        let result = async {
            stream.write_all(&payload).await?;
            stream.flush().await
        }
        .await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.mark_closed();
                Err(Error::Io(e))
            }
        }
    }

    async fn recv(&self) -> Result<Bytes> {
        let mut closed_rx = self.closed_rx.clone();
        if *closed_rx.borrow() {
            return Err(Error::ConnectionClosed);
        }
        let mut read = self.read.lock().await;
        let Some(stream) = read.as_mut() else {
            return Err(Error::ConnectionClosed);
        };
        let mut buf = BytesMut::with_capacity(RECV_CHUNK_CAPACITY);
        tokio::select! {
            _ = closed_rx.wait_for(|closed| *closed) => Err(Error::ConnectionClosed),
            result = stream.read_buf(&mut buf) => match result {
                // A zero-byte read is the peer's EOF.
                // 读到零字节即对端的EOF。
                Ok(0) => {
                    self.mark_closed();
                    Err(Error::ConnectionClosed)
                }
                Ok(_) => Ok(buf.freeze()),
                Err(e) => {
                    self.mark_closed();
                    Err(Error::Io(e))
                }
            },
        }
    }

    async fn wait_closed(&self) {
        let mut closed_rx = self.closed_rx.clone();
        // Resolves immediately when the channel is already closed. The
        // sender lives on `self`, so the watch cannot error while we hold it.
        let _ = closed_rx.wait_for(|closed| *closed).await;
    }

    async fn close(&self) {
        if self.closed_tx.send_replace(true) {
            return;
        }
        // Drop a raw socket that never completed its handshake.
        // 丢弃从未完成握手的原始套接字。
        *self.handshake.lock().await = HandshakeState::Done;
        let mut write = self.write.lock().await;
        if let Some(stream) = write.as_mut() {
            let _ = stream.shutdown().await;
        }
        *write = None;
    }
}
