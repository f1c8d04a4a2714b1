//! HTTP transport and wire protocol.

pub mod http_client;
pub mod protocol;
