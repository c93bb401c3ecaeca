//! Byte source and sink over tokio channels.
//!
//! These connect the engine to async tasks: a reader task feeds a
//! [`ChannelSource`], a writer task drains a [`ChannelSink`]. Wiring a sink
//! to a source built on the same channel echoes a peer's stream back to it.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::core::{ByteSink, ByteSource, SourceRead};

/// Byte source reading chunks from an `mpsc` channel.
///
/// An empty channel reads as would-block; a closed, drained channel reads
/// as end of input.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
    leftover: Vec<u8>,
}

impl ChannelSource {
    /// Wrap a receiver.
    pub fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            leftover: Vec::new(),
        }
    }
}

impl ByteSource for ChannelSource {
    fn read(&mut self, max_len: usize) -> SourceRead {
        while self.leftover.is_empty() {
            match self.rx.try_recv() {
                Ok(chunk) => self.leftover = chunk,
                Err(TryRecvError::Empty) => return SourceRead::WouldBlock,
                Err(TryRecvError::Disconnected) => return SourceRead::EndOfInput,
            }
        }
        if self.leftover.len() <= max_len {
            SourceRead::Data(std::mem::take(&mut self.leftover))
        } else {
            let rest = self.leftover.split_off(max_len);
            SourceRead::Data(std::mem::replace(&mut self.leftover, rest))
        }
    }
}

/// Byte sink writing chunks into an `mpsc` channel.
///
/// Each free channel slot holds one payload, so capacity is the number of
/// free slots times the maximum payload size. Finishing drops the sender,
/// which the consumer observes as the channel closing. Once the consumer
/// drops its receiver the sink reports no capacity and is closed.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Vec<u8>>>,
    max_payload: usize,
}

impl ChannelSink {
    /// Wrap a sender accepting payloads of up to `max_payload` bytes.
    pub fn new(tx: mpsc::Sender<Vec<u8>>, max_payload: usize) -> Self {
        Self {
            tx: Some(tx),
            max_payload,
        }
    }
}

impl ByteSink for ChannelSink {
    fn capacity(&self) -> usize {
        match &self.tx {
            Some(tx) if !tx.is_closed() => tx.capacity().saturating_mul(self.max_payload),
            _ => 0,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        let Some(tx) = &self.tx else {
            return 0;
        };
        if bytes.is_empty() {
            return 0;
        }
        let len = bytes.len().min(self.max_payload);
        match tx.try_send(bytes[..len].to_vec()) {
            Ok(()) => len,
            Err(_) => 0,
        }
    }

    fn finish(&mut self) {
        self.tx = None;
    }

    fn is_closed(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.is_closed())
    }
}

/// Build a sink and source on one channel, so everything written to the
/// sink is read back from the source.
pub fn echo_pipe(slots: usize, max_payload: usize) -> (ChannelSource, ChannelSink) {
    let (tx, rx) = mpsc::channel(slots.max(1));
    (ChannelSource::new(rx), ChannelSink::new(tx, max_payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_states() {
        let (tx, rx) = mpsc::channel(4);
        let mut source = ChannelSource::new(rx);
        assert_eq!(source.read(4), SourceRead::WouldBlock);

        tx.try_send(b"abcdef".to_vec()).unwrap();
        assert_eq!(source.read(4), SourceRead::Data(b"abcd".to_vec()));
        assert_eq!(source.read(4), SourceRead::Data(b"ef".to_vec()));

        drop(tx);
        assert_eq!(source.read(4), SourceRead::EndOfInput);
    }

    #[test]
    fn test_sink_capacity_tracks_slots() {
        let (tx, mut rx) = mpsc::channel(2);
        let mut sink = ChannelSink::new(tx, 10);
        assert_eq!(sink.capacity(), 20);

        assert_eq!(sink.write(b"hello"), 5);
        assert_eq!(sink.capacity(), 10);
        assert_eq!(rx.try_recv().unwrap(), b"hello");
        assert_eq!(sink.capacity(), 20);

        sink.finish();
        assert_eq!(sink.capacity(), 0);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn test_sink_closed_when_consumer_gone() {
        let (tx, rx) = mpsc::channel(2);
        let mut sink = ChannelSink::new(tx, 1000);
        assert!(!sink.is_closed());

        drop(rx);
        assert!(sink.is_closed());
        assert_eq!(sink.capacity(), 0);
        assert_eq!(sink.write(b"lost"), 0);

        // A finished sink is done, not closed
        sink.finish();
        assert!(!sink.is_closed());
    }

    #[test]
    fn test_echo_pipe() {
        let (mut source, mut sink) = echo_pipe(4, 16);
        assert_eq!(source.read(16), SourceRead::WouldBlock);
        sink.write(b"ping");
        assert_eq!(source.read(16), SourceRead::Data(b"ping".to_vec()));
        sink.finish();
        assert_eq!(source.read(16), SourceRead::EndOfInput);
    }
}
