//! TCP connect probe for the scanned service port

use async_trait::async_trait;
use lanscan_core::PortStatus;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

use crate::capability::ServiceProber;

/// Connects, then closes the connection straight away
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnectProber;

#[async_trait]
impl ServiceProber for TcpConnectProber {
    async fn probe(
        &self,
        ip: Ipv4Addr,
        port: u16,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> PortStatus {
        let addr = SocketAddr::from((ip, port));

        match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(mut stream)) => {
                // The close handshake is the only I/O performed, bound it separately
                if timeout(io_timeout, stream.shutdown()).await.is_err() {
                    trace!(ip = %ip, port = port, "Shutdown timed out");
                }
                PortStatus::Available
            }
            Ok(Err(e)) => {
                trace!(ip = %ip, port = port, error = %e, "Connection failed");
                PortStatus::Failed
            }
            Err(_elapsed) => {
                trace!(ip = %ip, port = port, "Connection timed out");
                PortStatus::Failed
            }
        }
    }
}
