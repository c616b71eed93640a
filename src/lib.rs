#![deny(clippy::expect_used, clippy::unwrap_used)]

//! Lifecycle management for a single TLS-secured gateway connection.
//! 单个TLS加密网关连接的生命周期管理。

pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod strategy;
pub mod transport;
