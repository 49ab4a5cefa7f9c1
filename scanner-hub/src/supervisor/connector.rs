//! Transport seam between supervisors and the network.

use async_trait::async_trait;
use std::io;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;

/// Inbound byte stream of one scanner link. Dropping it closes the link.
pub type DeviceStream = Box<dyn AsyncRead + Send + Unpin>;

/// Opens links to scanners.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, host: &str, port: u16) -> io::Result<DeviceStream>;
}

/// Plain TCP connector used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<DeviceStream> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}
