//! 定义了描述远程网关的环境与凭据。
//! Defines the environment and credentials describing the remote gateway.

use crate::error::{Error, Result};

/// The immutable environment a gateway connection operates in: where the
/// gateway lives and which credentials to present to it.
///
/// 网关连接运行所在的不可变环境：网关的位置以及向其出示的凭据。
#[derive(Debug, Clone)]
pub struct Environment {
    /// The gateway host to connect to.
    /// 要连接的网关主机。
    pub gateway_host: String,

    /// The gateway port to connect to.
    /// 要连接的网关端口。
    pub gateway_port: u16,

    /// Client credentials presented during the TLS handshake.
    /// TLS握手期间出示的客户端凭据。
    pub credentials: Credentials,

    /// TLS-related parameters.
    /// TLS相关参数。
    pub tls: TlsOptions,
}

/// Client credentials for mutual TLS with the gateway.
///
/// Both halves must be present together; a chain without a key (or the
/// reverse) fails validation.
///
/// 与网关进行双向TLS所需的客户端凭据。
///
/// 两部分必须同时存在；只有证书链而没有私钥（或相反）将无法通过校验。
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// PEM-encoded client certificate chain, if the gateway requires one.
    /// PEM编码的客户端证书链（如果网关需要）。
    pub certificate_chain_pem: Option<Vec<u8>>,

    /// PEM-encoded private key matching the certificate chain.
    /// 与证书链匹配的PEM编码私钥。
    pub private_key_pem: Option<Vec<u8>>,
}

/// TLS-related parameters.
/// TLS相关参数。
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Additional PEM-encoded root certificates to trust besides the
    /// built-in webpki roots. Useful for gateways with private CAs.
    ///
    /// 除内置webpki根证书外额外信任的PEM编码根证书。适用于使用私有CA的网关。
    pub extra_root_certificates_pem: Option<Vec<u8>>,

    /// ALPN protocols offered during the handshake, in preference order.
    /// 握手期间按优先顺序提供的ALPN协议。
    pub alpn_protocols: Vec<Vec<u8>>,

    /// Overrides the server name presented for SNI and certificate
    /// verification. Defaults to the gateway host.
    ///
    /// 覆盖用于SNI和证书验证的服务器名称。默认为网关主机名。
    pub server_name_override: Option<String>,
}

impl Environment {
    /// Creates an environment for the given gateway endpoint with default
    /// credentials and TLS options.
    ///
    /// 为给定的网关端点创建环境，使用默认的凭据和TLS选项。
    pub fn new(gateway_host: impl Into<String>, gateway_port: u16) -> Self {
        Self {
            gateway_host: gateway_host.into(),
            gateway_port,
            credentials: Credentials::default(),
            tls: TlsOptions::default(),
        }
    }

    /// Validates the environment.
    ///
    /// The host must be non-empty, the port non-zero, and the client
    /// credentials either fully present or fully absent.
    ///
    /// 校验环境。
    ///
    /// 主机名不能为空，端口不能为零，客户端凭据要么完整要么完全不提供。
    pub fn validate(&self) -> Result<()> {
        if self.gateway_host.is_empty() {
            return Err(Error::InvalidEnvironment("gateway host must not be empty"));
        }
        if self.gateway_port == 0 {
            return Err(Error::InvalidEnvironment("gateway port must not be zero"));
        }
        let Credentials {
            certificate_chain_pem,
            private_key_pem,
        } = &self.credentials;
        if certificate_chain_pem.is_some() != private_key_pem.is_some() {
            return Err(Error::InvalidEnvironment(
                "client certificate chain and private key must be provided together",
            ));
        }
        Ok(())
    }
}
