//! Multiplexed server.
//!
//! Provides [`Server`], which owns a [`SessionTable`] and a UDP socket. Each
//! new peer opening a stream gets a session whose source and sink come from
//! the factory passed at bind time.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::core::{ByteSink, ByteSource, Config, Result};
use crate::session::SessionTable;
use crate::transport::UdpTransport;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,

    /// Protocol parameters shared by every session.
    pub protocol: Config,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            protocol: Config::default(),
        }
    }
}

/// Builder for creating a [`Server`].
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: ServerConfig,
}

impl ServerBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the protocol parameters.
    pub fn protocol(mut self, protocol: Config) -> Self {
        self.config.protocol = protocol;
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }

    /// Bind and create the server.
    pub async fn bind<S, K, F>(self, factory: F) -> Result<Server<S, K, F>>
    where
        S: ByteSource,
        K: ByteSink,
        F: FnMut(SocketAddr) -> (S, K),
    {
        Server::bind(self.config, factory).await
    }
}

/// A multiplexed server.
///
/// # Example
///
/// ```ignore
/// use relstream::server::ServerBuilder;
/// use relstream::stream::echo_pipe;
///
/// let mut server = ServerBuilder::new()
///     .bind_addr("0.0.0.0:9000".parse()?)
///     .bind(|_peer| echo_pipe(64, 500))
///     .await?;
///
/// server.run_until(tokio::signal::ctrl_c()).await?;
/// ```
#[derive(Debug)]
pub struct Server<S, K, F> {
    transport: UdpTransport,
    table: SessionTable<S, K, F>,
    config: Arc<Config>,
}

impl<S, K, F> Server<S, K, F>
where
    S: ByteSource,
    K: ByteSink,
    F: FnMut(SocketAddr) -> (S, K),
{
    /// Validate the configuration and bind the socket.
    pub async fn bind(config: ServerConfig, factory: F) -> Result<Self> {
        config.protocol.validate()?;
        let protocol = Arc::new(config.protocol);

        let transport = UdpTransport::bind(config.bind_addr).await?;
        info!(local = %transport.local_addr()?, "server bound");

        Ok(Self {
            transport,
            table: SessionTable::new(Arc::clone(&protocol), factory),
            config: protocol,
        })
    }

    /// Local socket address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The Session Table.
    pub fn table(&self) -> &SessionTable<S, K, F> {
        &self.table
    }

    /// Serve until `shutdown` resolves.
    ///
    /// Live sessions are dropped at shutdown without further exchange.
    pub async fn run_until<G>(&mut self, shutdown: G) -> Result<()>
    where
        G: Future,
    {
        let mut buf = UdpTransport::recv_buffer();
        let mut ticker = time::interval(self.config.timer_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(sessions = self.table.len(), "server shutting down");
                    return Ok(());
                }
                recv = self.transport.recv_from(&mut buf) => {
                    match recv {
                        Ok((len, peer)) => {
                            self.table.on_datagram(peer, &buf[..len], Instant::now(), &mut self.transport);
                        }
                        Err(err) => warn!(%err, "receive failed"),
                    }
                }
                _ = ticker.tick() => {
                    let report = self.table.on_timer_tick(Instant::now(), &mut self.transport);
                    for (peer, err) in &report.aborted {
                        error!(%peer, %err, "peer session failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{echo_pipe, MemorySink, MemorySource};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn fast_protocol() -> Config {
        Config::builder()
            .window(4)
            .retransmit_timeout(Duration::from_millis(50))
            .timer_interval(Duration::from_millis(10))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_bind_and_shutdown() {
        let mut server = ServerBuilder::new()
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .protocol(fast_protocol())
            .bind(|_| (MemorySource::empty(), MemorySink::new()))
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);

        server.run_until(async {}).await.unwrap();
        assert!(server.table().is_empty());
    }

    #[cfg(feature = "client")]
    #[tokio::test]
    async fn test_echo_round_trip() {
        use crate::client::ClientBuilder;

        let protocol = fast_protocol();
        let max_payload = protocol.max_payload;
        let mut server = ServerBuilder::new()
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .protocol(protocol.clone())
            .bind(move |_| echo_pipe(64, max_payload))
            .await
            .unwrap();
        let server_addr = server.local_addr().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .run_until(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let message: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let mut client = ClientBuilder::new(server_addr)
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .protocol(protocol)
            .connect(MemorySource::new(message.clone()), MemorySink::new())
            .await
            .unwrap();

        let stats = tokio::time::timeout(Duration::from_secs(10), client.run())
            .await
            .unwrap()
            .unwrap();

        let (_, sink) = client.into_parts();
        assert_eq!(sink.contents(), &message[..]);
        assert!(sink.is_finished());
        assert_eq!(stats.bytes_delivered, 3000);

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
