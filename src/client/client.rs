//! Single-session client.
//!
//! Provides [`Client`], which binds a UDP socket, streams a [`ByteSource`] to
//! one peer and the peer's stream into a [`ByteSink`]. No Session Table is
//! involved: every datagram from the peer goes straight to the one session.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Notify;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::{ByteSink, ByteSource, Config, Result};
use crate::session::{Session, SessionStats};
use crate::transport::UdpTransport;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Peer to stream with.
    pub server_addr: SocketAddr,

    /// Local address to bind. Defaults to an ephemeral port on the
    /// unspecified address of the peer's family.
    pub bind_addr: SocketAddr,

    /// Protocol parameters.
    pub protocol: Config,
}

impl ClientConfig {
    /// Configuration for streaming with `server_addr`.
    pub fn new(server_addr: SocketAddr) -> Self {
        let bind_addr = if server_addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        Self {
            server_addr,
            bind_addr,
            protocol: Config::default(),
        }
    }
}

/// Builder for creating a [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a builder for streaming with `server_addr`.
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            config: ClientConfig::new(server_addr),
        }
    }

    /// Set the local bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the protocol parameters.
    pub fn protocol(mut self, protocol: Config) -> Self {
        self.config.protocol = protocol;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }

    /// Bind and create the client.
    pub async fn connect<S, K>(self, source: S, sink: K) -> Result<Client<S, K>>
    where
        S: ByteSource,
        K: ByteSink,
    {
        Client::connect(self.config, source, sink).await
    }
}

/// A single-session client.
#[derive(Debug)]
pub struct Client<S, K> {
    transport: UdpTransport,
    session: Session<S, K>,
    config: Arc<Config>,
    sink_ready: Arc<Notify>,
}

impl<S: ByteSource, K: ByteSink> Client<S, K> {
    /// Validate the configuration, bind the socket and create the session.
    ///
    /// Nothing is sent until [`run`](Self::run) is called.
    pub async fn connect(config: ClientConfig, source: S, sink: K) -> Result<Self> {
        config.protocol.validate()?;
        let protocol = Arc::new(config.protocol);

        let transport = UdpTransport::bind(config.bind_addr).await?;
        info!(
            local = %transport.local_addr()?,
            peer = %config.server_addr,
            "client bound"
        );

        let session = Session::new(config.server_addr, Arc::clone(&protocol), source, sink);
        Ok(Self {
            transport,
            session,
            config: protocol,
            sink_ready: Arc::new(Notify::new()),
        })
    }

    /// Local socket address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Handle the sink's consumer notifies after draining, so held data is
    /// delivered without waiting for the next timer tick.
    pub fn sink_ready(&self) -> Arc<Notify> {
        Arc::clone(&self.sink_ready)
    }

    /// The session.
    pub fn session(&self) -> &Session<S, K> {
        &self.session
    }

    /// The session, mutably.
    pub fn session_mut(&mut self) -> &mut Session<S, K> {
        &mut self.session
    }

    /// Drive the session until it is closed and its linger has elapsed.
    ///
    /// Returns the session's counters, or the error that aborted it.
    pub async fn run(&mut self) -> Result<SessionStats> {
        let peer = self.session.peer();
        let mut buf = UdpTransport::recv_buffer();
        let mut ticker = time::interval(self.config.timer_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let sink_ready = Arc::clone(&self.sink_ready);

        self.session.on_source_ready(Instant::now(), &mut self.transport);

        loop {
            tokio::select! {
                recv = self.transport.recv_from(&mut buf) => {
                    let (len, from) = match recv {
                        Ok(received) => received,
                        Err(err) => {
                            warn!(%err, "receive failed");
                            continue;
                        }
                    };
                    if from != peer {
                        debug!(%from, "ignoring datagram from unexpected address");
                        continue;
                    }
                    self.session.on_datagram(&buf[..len], Instant::now(), &mut self.transport);
                }
                _ = sink_ready.notified() => {
                    self.session.on_sink_ready(Instant::now(), &mut self.transport);
                }
                _ = ticker.tick() => {
                    let now = Instant::now();
                    self.session.on_timer_tick(now, &mut self.transport)?;
                    if self.session.is_reapable(now) {
                        break;
                    }
                }
            }
        }

        let stats = self.session.stats();
        info!(%peer, ?stats, "client finished");
        Ok(stats)
    }

    /// Consume the client, returning the source and sink.
    pub fn into_parts(self) -> (S, K) {
        self.session.into_parts()
    }
}
