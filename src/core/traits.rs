//! Collaborator interfaces consumed by the protocol engine.
//!
//! The engine never blocks: it asks a [`ByteSource`] for input and a
//! [`ByteSink`] for capacity before acting, and hands finished datagrams to
//! a [`Transport`]. Implementations decide how those map onto real I/O.

use std::io;
use std::net::SocketAddr;

/// Outcome of a non-blocking read from the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRead {
    /// Between 1 and `max_len` bytes of input.
    Data(Vec<u8>),
    /// Nothing available now; more may arrive later.
    WouldBlock,
    /// Input is exhausted.
    EndOfInput,
    /// Input failed. Treated exactly like [`SourceRead::EndOfInput`].
    Failed(String),
}

/// Application byte source feeding the outbound stream.
pub trait ByteSource {
    /// Read at most `max_len` bytes without blocking.
    fn read(&mut self, max_len: usize) -> SourceRead;
}

/// Application byte sink consuming the inbound stream.
pub trait ByteSink {
    /// Bytes the sink can accept right now.
    fn capacity(&self) -> usize;

    /// Write bytes, returning how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> usize;

    /// Signal that the peer's stream has ended. Called at most once.
    fn finish(&mut self);

    /// Whether the consumer behind the sink has gone away for good.
    ///
    /// A closed sink can never drain, so the session is aborted.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Datagram transport used to reach peers.
///
/// Sends are fire-and-forget: a failed send is equivalent to a lost
/// datagram and is recovered by retransmission.
pub trait Transport {
    /// Send one datagram to `peer`.
    fn send(&mut self, peer: SocketAddr, datagram: &[u8]) -> io::Result<()>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read(&mut self, max_len: usize) -> SourceRead {
        (**self).read(max_len)
    }
}

impl<T: ByteSink + ?Sized> ByteSink for Box<T> {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        (**self).write(bytes)
    }

    fn finish(&mut self) {
        (**self).finish()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, peer: SocketAddr, datagram: &[u8]) -> io::Result<()> {
        (**self).send(peer, datagram)
    }
}

/// Transport that records every datagram instead of sending it.
///
/// Useful for driving sessions by hand in tests and simulations.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    sent: Vec<(SocketAddr, Vec<u8>)>,
}

impl RecordingTransport {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Datagrams sent so far, oldest first.
    pub fn sent(&self) -> &[(SocketAddr, Vec<u8>)] {
        &self.sent
    }

    /// Take every recorded datagram, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<(SocketAddr, Vec<u8>)> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, peer: SocketAddr, datagram: &[u8]) -> io::Result<()> {
        self.sent.push((peer, datagram.to_vec()));
        Ok(())
    }
}
