//! Entry point for `relstream`.
//!
//! With a peer address, streams stdin to the peer and the peer's stream to
//! stdout. With `--server`, echoes every peer's stream back to it. Logs go to
//! stderr; set `RUST_LOG` to control verbosity.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, Notify};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use relstream::client::ClientBuilder;
use relstream::core::constants::{DEFAULT_MAX_PAYLOAD, DEFAULT_RETRANSMIT_TIMEOUT, DEFAULT_WINDOW};
use relstream::core::{Config, ConfigError};
use relstream::server::ServerBuilder;
use relstream::stream::{echo_pipe, ChannelSink, ChannelSource};

/// Channel slots between the engine and the stdio tasks.
const PIPE_SLOTS: usize = 64;

/// Reliable byte streams over UDP.
#[derive(Debug, Parser)]
#[command(name = "relstream", version, about)]
struct Cli {
    /// Local UDP port to listen on (0 picks one).
    listen_port: u16,

    /// Peer to stream with, as host:port.
    #[arg(required_unless_present = "server")]
    peer: Option<String>,

    /// Serve any number of peers, echoing each stream back.
    #[arg(long, conflicts_with = "peer")]
    server: bool,

    /// Maximum outstanding segments.
    #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
    window: usize,

    /// Retransmission timeout in milliseconds.
    #[arg(short = 't', long = "timeout-ms", default_value_t = DEFAULT_RETRANSMIT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Timer tick interval in milliseconds [default: timeout / 5].
    #[arg(long = "timer-ms")]
    timer_ms: Option<u64>,

    /// Maximum payload bytes per segment.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    max_payload: usize,

    /// Abort a stream after this many retransmissions of one segment.
    #[arg(long)]
    max_retransmits: Option<u32>,
}

impl Cli {
    fn protocol(&self) -> Result<Config, ConfigError> {
        let timeout = Duration::from_millis(self.timeout_ms);
        let timer = self
            .timer_ms
            .map(Duration::from_millis)
            .unwrap_or(timeout / 5);
        Config::builder()
            .window(self.window)
            .retransmit_timeout(timeout)
            .timer_interval(timer)
            .max_payload(self.max_payload)
            .max_retransmits(self.max_retransmits)
            .build()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relstream=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "relstream failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> relstream::Result<()> {
    let protocol = cli.protocol()?;

    if cli.server {
        let bind = SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.listen_port));
        return serve(bind, protocol).await;
    }

    let Some(peer) = cli.peer.as_deref() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "peer address required").into());
    };
    let peer = resolve(peer).await?;
    let bind = unspecified(peer, cli.listen_port);
    stream(bind, peer, protocol).await
}

/// Resolve `host:port`, preferring IPv4.
async fn resolve(peer: &str) -> io::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(peer).await?.collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no address for {peer}")))
}

fn unspecified(peer: SocketAddr, port: u16) -> SocketAddr {
    if peer.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, port))
    }
}

/// Stream stdin to `peer` and the peer's stream to stdout.
async fn stream(bind: SocketAddr, peer: SocketAddr, protocol: Config) -> relstream::Result<()> {
    let (input_tx, input_rx) = mpsc::channel(PIPE_SLOTS);
    let (output_tx, output_rx) = mpsc::channel(PIPE_SLOTS);
    let source = ChannelSource::new(input_rx);
    let sink = ChannelSink::new(output_tx, protocol.max_payload);

    tokio::spawn(pump_stdin(input_tx, protocol.max_payload));

    let mut client = ClientBuilder::new(peer)
        .bind_addr(bind)
        .protocol(protocol)
        .connect(source, sink)
        .await?;
    let writer = tokio::spawn(drain_to_stdout(output_rx, client.sink_ready()));
    info!(local = %client.local_addr()?, %peer, "streaming");

    let stats = client.run().await?;
    // Closes the output channel if the peer's stream never finished
    drop(client);

    match writer.await {
        Ok(result) => result?,
        Err(err) => warn!(%err, "stdout writer stopped"),
    }
    info!(?stats, "stream complete");
    Ok(())
}

/// Echo every peer's stream back to it until interrupted.
async fn serve(bind: SocketAddr, protocol: Config) -> relstream::Result<()> {
    let max_payload = protocol.max_payload;
    let mut server = ServerBuilder::new()
        .bind_addr(bind)
        .protocol(protocol)
        .bind(move |peer| {
            info!(%peer, "echoing new peer");
            echo_pipe(PIPE_SLOTS, max_payload)
        })
        .await?;
    info!(local = %server.local_addr()?, "serving");

    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(%err, "cannot listen for interrupt");
                std::future::pending::<()>().await;
            }
        })
        .await
}

/// Feed stdin into the outbound stream. Dropping `tx` ends the stream.
async fn pump_stdin(tx: mpsc::Sender<Vec<u8>>, chunk: usize) {
    let mut stdin = tokio::io::stdin();
    let mut buf = vec![0u8; chunk];
    loop {
        match stdin.read(&mut buf).await {
            Ok(0) => return,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(%err, "stdin failed, ending stream");
                return;
            }
        }
    }
}

/// Write the inbound stream to stdout until it ends.
async fn drain_to_stdout(mut rx: mpsc::Receiver<Vec<u8>>, ready: Arc<Notify>) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = rx.recv().await {
        ready.notify_one();
        stdout.write_all(&chunk).await?;
    }
    stdout.flush().await
}
