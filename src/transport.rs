//! Transport boundary.
//!
//! The session requires nothing of the network beyond an ordered,
//! reliable byte stream whose reads can be multiplexed with a stop
//! signal. [`Connector`] is the seam: production code dials TCP,
//! tests hand the session in-memory duplex pipes.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::Result;

/// Boxed read half of a connection.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Boxed write half of a connection.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Opens fresh connections for the session, including on reconnect.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection and return its read/write halves.
    async fn connect(&self) -> Result<(BoxedReader, BoxedWriter)>;
}

/// Connects over plain TCP.
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    /// Create a connector that dials `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<(BoxedReader, BoxedWriter)> {
        let stream = TcpStream::connect(&self.addr).await?;
        // Latency matters more than throughput for chat traffic
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok((Box::new(reader), Box::new(writer)))
    }
}
