//! Session Table: demultiplexes datagrams to sessions by peer address.
//!
//! The table exclusively owns every session it creates. A session is created
//! only by a Data segment numbered 1 from an unknown peer, and is destroyed
//! once it is closed and its linger has elapsed, or when it is aborted.
//! Iteration follows address order, so timer scans are deterministic.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::session::Session;
use crate::core::constants::INITIAL_SEQNO;
use crate::core::{ByteSink, ByteSource, Config, SessionError, Transport};
use crate::transport::{decode, Segment};

/// Where an arriving datagram went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Delivered to an existing session.
    Existing,
    /// Created a new session and delivered to it.
    Created,
    /// Unknown peer and not an opening segment; dropped.
    Unroutable,
    /// Failed to decode; dropped.
    Malformed,
}

/// Sessions removed during a timer tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Closed sessions whose linger elapsed.
    pub reaped: Vec<SocketAddr>,
    /// Sessions aborted by the retransmission bound.
    pub aborted: Vec<(SocketAddr, SessionError)>,
}

/// Peer-address-keyed session table.
///
/// `factory` supplies the source and sink for each new peer.
pub struct SessionTable<S, K, F> {
    config: Arc<Config>,
    sessions: BTreeMap<SocketAddr, Session<S, K>>,
    factory: F,
}

impl<S, K, F> SessionTable<S, K, F>
where
    S: ByteSource,
    K: ByteSink,
    F: FnMut(SocketAddr) -> (S, K),
{
    /// Create an empty table.
    pub fn new(config: Arc<Config>, factory: F) -> Self {
        Self {
            config,
            sessions: BTreeMap::new(),
            factory,
        }
    }

    /// Decode a datagram from `peer` and route it.
    pub fn on_datagram<T>(
        &mut self,
        peer: SocketAddr,
        datagram: &[u8],
        now: Instant,
        tx: &mut T,
    ) -> Routing
    where
        T: Transport + ?Sized,
    {
        match decode(datagram) {
            Ok(segment) => self.route(peer, segment, now, tx),
            Err(err) => {
                if let Some(session) = self.sessions.get_mut(&peer) {
                    // Let the session count it
                    session.on_datagram(datagram, now, tx);
                } else {
                    debug!(%peer, %err, "dropping malformed datagram");
                }
                Routing::Malformed
            }
        }
    }

    /// Route a decoded segment from `peer`.
    pub fn route<T>(&mut self, peer: SocketAddr, segment: Segment, now: Instant, tx: &mut T) -> Routing
    where
        T: Transport + ?Sized,
    {
        let existed = self.sessions.contains_key(&peer);
        match self.lookup_or_create(peer, &segment) {
            Some(session) => {
                session.on_segment(segment, now, tx);
                if existed {
                    Routing::Existing
                } else {
                    Routing::Created
                }
            }
            None => Routing::Unroutable,
        }
    }

    /// Find the session for `peer`, creating one if `segment` opens a
    /// stream.
    pub fn lookup_or_create(
        &mut self,
        peer: SocketAddr,
        segment: &Segment,
    ) -> Option<&mut Session<S, K>> {
        if !self.sessions.contains_key(&peer) {
            if segment.seqno() != Some(INITIAL_SEQNO) {
                debug!(%peer, kind = ?segment.kind(), "unroutable segment from unknown peer");
                return None;
            }
            let (source, sink) = (self.factory)(peer);
            let session = Session::new(peer, Arc::clone(&self.config), source, sink);
            self.sessions.insert(peer, session);
        }
        self.sessions.get_mut(&peer)
    }

    /// Drive every session's timer in address order, then remove aborted
    /// and reapable sessions.
    pub fn on_timer_tick<T>(&mut self, now: Instant, tx: &mut T) -> TickReport
    where
        T: Transport + ?Sized,
    {
        let mut report = TickReport::default();

        for (peer, session) in self.sessions.iter_mut() {
            match session.on_timer_tick(now, tx) {
                Ok(()) if session.is_reapable(now) => report.reaped.push(*peer),
                Ok(()) => {}
                Err(err) => report.aborted.push((*peer, err)),
            }
        }

        for (peer, err) in &report.aborted {
            self.sessions.remove(peer);
            warn!(%peer, %err, "removed aborted session");
        }
        for peer in &report.reaped {
            if let Some(session) = self.sessions.remove(peer) {
                info!(%peer, stats = ?session.stats(), "session reaped");
            }
        }

        report
    }

    /// Sink capacity may have changed for any session.
    pub fn on_sink_ready<T>(&mut self, now: Instant, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        for session in self.sessions.values_mut() {
            session.on_sink_ready(now, tx);
        }
    }

    /// Source data may be available for any session.
    pub fn on_source_ready<T>(&mut self, now: Instant, tx: &mut T)
    where
        T: Transport + ?Sized,
    {
        for session in self.sessions.values_mut() {
            session.on_source_ready(now, tx);
        }
    }

    /// Remove a session immediately.
    pub fn remove(&mut self, peer: &SocketAddr) -> Option<Session<S, K>> {
        self.sessions.remove(peer)
    }
}

impl<S, K, F> SessionTable<S, K, F> {
    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Peer addresses in ascending order.
    pub fn peers(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.sessions.keys().copied()
    }

    /// Session for `peer`.
    pub fn get(&self, peer: &SocketAddr) -> Option<&Session<S, K>> {
        self.sessions.get(peer)
    }

    /// Session for `peer`, mutably.
    pub fn get_mut(&mut self, peer: &SocketAddr) -> Option<&mut Session<S, K>> {
        self.sessions.get_mut(peer)
    }
}

impl<S, K, F> std::fmt::Debug for SessionTable<S, K, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTable")
            .field("sessions", &self.sessions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
