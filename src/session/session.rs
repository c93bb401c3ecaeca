//! A single reliable stream between this endpoint and one peer.
//!
//! A [`Session`] couples a [`SenderWindow`] and a [`Receiver`] with the
//! application's source and sink and a termination state machine. It is
//! driven entirely by events (datagram arrival, timer tick, sink or source
//! readiness), each processed to completion, and writes its output through
//! the [`Transport`] handed to each event.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::termination::{Termination, TerminationState};
use crate::core::{ByteSink, ByteSource, Config, SessionError, Transport};
use crate::stream::{Disposition, Receiver, SenderWindow};
use crate::transport::{decode, AckSegment, Segment};

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// New Data segments sent (retransmissions excluded).
    pub segments_sent: u64,
    /// Data segments resent after a timeout.
    pub retransmissions: u64,
    /// Valid segments received.
    pub segments_received: u64,
    /// Payload bytes handed to the sink.
    pub bytes_delivered: u64,
    /// Ack segments sent.
    pub acks_sent: u64,
    /// Datagrams discarded as malformed, corrupted or unacceptable.
    pub dropped: u64,
}

/// One peer's session.
#[derive(Debug)]
pub struct Session<S, K> {
    peer: SocketAddr,
    config: Arc<Config>,
    sender: SenderWindow,
    receiver: Receiver,
    termination: Termination,
    source: S,
    sink: K,

    /// When the session reached `Closed`.
    closed_at: Option<Instant>,

    aborted: bool,
    stats: SessionStats,
}

impl<S: ByteSource, K: ByteSink> Session<S, K> {
    /// Create a session with `peer`.
    pub fn new(peer: SocketAddr, config: Arc<Config>, source: S, sink: K) -> Self {
        info!(%peer, window = config.window, "session created");
        Self {
            peer,
            sender: SenderWindow::new(&config),
            receiver: Receiver::new(&config),
            config,
            termination: Termination::new(),
            source,
            sink,
            closed_at: None,
            aborted: false,
            stats: SessionStats::default(),
        }
    }

    /// Decode a datagram from the peer and handle it.
    ///
    /// Undecodable datagrams are dropped without reply.
    pub fn on_datagram<T>(&mut self, datagram: &[u8], now: Instant, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        match decode(datagram) {
            Ok(segment) => self.on_segment(segment, now, tx),
            Err(err) if err.is_corruption() => {
                self.stats.dropped += 1;
                debug!(peer = %self.peer, %err, "dropping corrupted datagram");
            }
            Err(err) => {
                self.stats.dropped += 1;
                debug!(peer = %self.peer, %err, "dropping malformed datagram");
            }
        }
    }

    /// Handle a decoded segment from the peer.
    pub fn on_segment<T>(&mut self, segment: Segment, now: Instant, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        if self.aborted {
            return;
        }
        self.stats.segments_received += 1;

        match segment {
            Segment::Ack(ack) => {
                self.sender.on_ack(ack.ackno);
            }
            Segment::Data(data) => {
                self.sender.on_ack(data.ackno);
                let reception = self.receiver.on_segment(data, &mut self.sink);
                if matches!(reception.disposition, Disposition::Dropped(_)) {
                    self.stats.dropped += 1;
                }
                if let Some(ackno) = reception.ack {
                    self.send_ack(ackno, tx);
                }
            }
        }

        self.refill(now, tx);
        // Refilling may have drained a sink that feeds the source
        self.deliver(tx);
        self.update_termination(now);
    }

    /// Retransmit overdue segments, retry held delivery and refill the
    /// window.
    ///
    /// Fails once a segment exceeds the configured retransmission bound or
    /// the sink closes before the peer's stream ends; the session is then
    /// aborted and ignores further events.
    pub fn on_timer_tick<T>(&mut self, now: Instant, tx: &mut T) -> Result<(), SessionError>
    where
        T: Transport + ?Sized,
    {
        if self.aborted {
            return Err(SessionError::Aborted);
        }
        if !self.receiver.remote_eof() && self.sink.is_closed() {
            error!(peer = %self.peer, "sink closed before end of stream, session aborted");
            self.aborted = true;
            return Err(SessionError::SinkClosed);
        }

        let resend = match self.sender.on_timer_tick(now) {
            Ok(resend) => resend,
            Err(err) => {
                error!(peer = %self.peer, %err, "session aborted");
                self.aborted = true;
                return Err(err);
            }
        };
        self.stats.retransmissions += resend.len() as u64;
        for datagram in &resend {
            self.transmit(datagram, tx);
        }

        self.deliver(tx);
        self.refill(now, tx);
        self.update_termination(now);
        Ok(())
    }

    /// The sink may have gained capacity; deliver whatever is held.
    pub fn on_sink_ready<T>(&mut self, now: Instant, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        if self.aborted {
            return;
        }
        self.deliver(tx);
        self.update_termination(now);
    }

    /// The source may have data; fill the window.
    pub fn on_source_ready<T>(&mut self, now: Instant, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        if self.aborted {
            return;
        }
        self.refill(now, tx);
        self.update_termination(now);
    }

    /// Peer address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Termination state.
    pub fn state(&self) -> TerminationState {
        self.termination.state()
    }

    /// Whether both directions have finished.
    pub fn is_closed(&self) -> bool {
        self.termination.is_closed()
    }

    /// Whether the session was aborted by the retransmission bound or a
    /// closed sink.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Whether the session is closed and its linger has elapsed, so it can
    /// be destroyed without stranding a peer waiting on a lost final ack.
    pub fn is_reapable(&self, now: Instant) -> bool {
        self.closed_at
            .is_some_and(|closed| now.saturating_duration_since(closed) >= self.config.close_linger)
    }

    /// Counters for this session.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            bytes_delivered: self.receiver.bytes_delivered(),
            ..self.stats
        }
    }

    /// Sender state.
    pub fn sender(&self) -> &SenderWindow {
        &self.sender
    }

    /// Receiver state.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// The application source, mutably.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// The application sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// The application sink, mutably.
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Consume the session, returning its source and sink.
    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }

    fn deliver<T>(&mut self, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        if let Some(ackno) = self.receiver.try_deliver(&mut self.sink) {
            self.send_ack(ackno, tx);
        }
    }

    fn refill<T>(&mut self, now: Instant, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        let datagrams = self
            .sender
            .fill(&mut self.source, self.receiver.ackno(), now);
        self.stats.segments_sent += datagrams.len() as u64;
        for datagram in &datagrams {
            self.transmit(datagram, tx);
        }
    }

    fn send_ack<T>(&mut self, ackno: u32, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        let datagram = Segment::Ack(AckSegment::new(ackno)).encode();
        self.transmit(&datagram, tx);
        self.stats.acks_sent += 1;
    }

    fn transmit<T>(&self, datagram: &[u8], tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        // A failed send is a lost datagram; retransmission recovers it
        if let Err(err) = tx.send(self.peer, datagram) {
            warn!(peer = %self.peer, %err, "send failed");
        }
    }

    fn update_termination(&mut self, now: Instant) {
        let local = self.sender.local_eof_acked();
        let remote = self.receiver.remote_eof();
        if let Some(previous) = self.termination.update(local, remote) {
            debug!(
                peer = %self.peer,
                from = %previous,
                to = %self.termination.state(),
                "termination state changed"
            );
            if self.termination.is_closed() {
                self.closed_at = Some(now);
                info!(peer = %self.peer, stats = ?self.stats(), "session closed");
            }
        }
    }
}
