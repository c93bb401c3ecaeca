//! Sliding-window sender.
//!
//! Assigns sequence numbers to application bytes, keeps at most W segments
//! outstanding, and resends each overdue segment unchanged after the fixed
//! retransmission timeout.

use std::time::Instant;

use tracing::{debug, trace, warn};

use super::outstanding::{Outstanding, OutstandingQueue};
use crate::core::constants::{FINAL_SEQNO, INITIAL_SEQNO};
use crate::core::{ByteSource, Config, SessionError, SourceRead};
use crate::transport::{DataSegment, Payload, RetransmitPolicy, Segment};

/// Result of applying an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The high-water mark advanced and `cleared` segments left the window.
    Advanced {
        /// Segments removed from the outstanding set.
        cleared: usize,
    },
    /// At or below the high-water mark: duplicate or reordered.
    Stale,
    /// Acknowledges sequence numbers never assigned.
    Bogus,
}

/// Sender side of a session.
#[derive(Debug, Clone)]
pub struct SenderWindow {
    window: usize,
    max_payload: usize,
    policy: RetransmitPolicy,

    /// Next sequence number to assign.
    next_seqno: u32,

    /// Lowest sequence number not yet acknowledged.
    highest_acked: u32,

    outstanding: OutstandingQueue,

    /// Sequence number of our end-of-stream marker, once sent.
    eof_seqno: Option<u32>,
}

impl SenderWindow {
    /// Create a sender from a session configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            window: config.window,
            max_payload: config.max_payload,
            policy: RetransmitPolicy::from_config(config),
            next_seqno: INITIAL_SEQNO,
            highest_acked: INITIAL_SEQNO,
            outstanding: OutstandingQueue::new(),
            eof_seqno: None,
        }
    }

    /// Pull from `source` while the window has room, returning the encoded
    /// datagrams to send.
    ///
    /// `ackno` is piggybacked on every new segment. Once the source is
    /// exhausted or fails, a single end-of-stream segment is sent and the
    /// source is never read again.
    pub fn fill<S>(&mut self, source: &mut S, ackno: u32, now: Instant) -> Vec<Vec<u8>>
    where
        S: ByteSource + ?Sized,
    {
        let mut datagrams = Vec::new();

        while self.eof_seqno.is_none() && self.outstanding.len() < self.window {
            let seqno = self.next_seqno;

            let bytes = if seqno >= FINAL_SEQNO {
                debug!(seqno, "sequence space exhausted, ending stream");
                None
            } else {
                match source.read(self.max_payload) {
                    SourceRead::Data(bytes) if bytes.is_empty() => break,
                    SourceRead::Data(bytes) => Some(bytes),
                    SourceRead::WouldBlock => break,
                    SourceRead::EndOfInput => None,
                    SourceRead::Failed(reason) => {
                        warn!(%reason, "local input failed, ending stream");
                        None
                    }
                }
            };

            let segment = match bytes.map(|b| Payload::from_vec(b, self.max_payload)) {
                Some(Ok(payload)) => DataSegment::new(seqno, ackno, payload),
                Some(Err(err)) => {
                    warn!(%err, "source overran its read limit, ending stream");
                    DataSegment::eof(seqno, ackno)
                }
                None => DataSegment::eof(seqno, ackno),
            };

            if segment.is_eof() {
                debug!(seqno, "sending end of stream");
                self.eof_seqno = Some(seqno);
            } else {
                trace!(seqno, len = segment.payload().len(), "sending data");
            }

            let datagram = Segment::Data(segment).encode();
            self.outstanding.push(Outstanding::new(
                seqno,
                datagram.clone(),
                self.policy.deadline(now),
            ));
            self.next_seqno = seqno + 1;
            datagrams.push(datagram);
        }

        datagrams
    }

    /// Apply a cumulative acknowledgment.
    pub fn on_ack(&mut self, ackno: u32) -> AckOutcome {
        if ackno <= self.highest_acked {
            trace!(ackno, highest = self.highest_acked, "stale ack");
            return AckOutcome::Stale;
        }
        if ackno > self.next_seqno {
            debug!(ackno, next = self.next_seqno, "ack beyond sent data ignored");
            return AckOutcome::Bogus;
        }

        let cleared = self.outstanding.ack_below(ackno);
        self.highest_acked = ackno;
        trace!(ackno, cleared, "ack advanced");
        AckOutcome::Advanced { cleared }
    }

    /// Resend every overdue segment, returning the datagrams to send.
    ///
    /// Fails if a bounded segment is overdue again after its last allowed
    /// retransmission.
    pub fn on_timer_tick(&mut self, now: Instant) -> Result<Vec<Vec<u8>>, SessionError> {
        let policy = self.policy;
        let mut datagrams = Vec::new();

        for entry in self.outstanding.due(now) {
            if policy.exhausted(entry.retransmits) {
                return Err(SessionError::RetransmitLimit {
                    seqno: entry.seqno,
                    attempts: entry.retransmits,
                });
            }
            entry.retransmits += 1;
            entry.deadline = policy.deadline(now);
            debug!(seqno = entry.seqno, attempt = entry.retransmits, "retransmitting");
            datagrams.push(entry.datagram.clone());
        }

        Ok(datagrams)
    }

    /// Whether our end-of-stream marker has been sent.
    pub fn local_eof_sent(&self) -> bool {
        self.eof_seqno.is_some()
    }

    /// Whether our end-of-stream marker has been acknowledged, which also
    /// means nothing is outstanding.
    pub fn local_eof_acked(&self) -> bool {
        self.eof_seqno.is_some_and(|seqno| self.highest_acked > seqno)
    }

    /// Whether another segment may be sent now.
    pub fn has_room(&self) -> bool {
        self.eof_seqno.is_none() && self.outstanding.len() < self.window
    }

    /// Number of outstanding segments.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Next sequence number to assign.
    pub fn next_seqno(&self) -> u32 {
        self.next_seqno
    }

    /// Lowest unacknowledged sequence number.
    pub fn highest_acked(&self) -> u32 {
        self.highest_acked
    }

    /// Earliest retransmission deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.outstanding.next_deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemorySource;
    use crate::transport::decode;
    use std::time::Duration;

    fn config(window: usize) -> Config {
        Config::builder()
            .window(window)
            .retransmit_timeout(Duration::from_millis(100))
            .timer_interval(Duration::from_millis(20))
            .max_payload(4)
            .build()
            .unwrap()
    }

    fn data(datagram: &[u8]) -> DataSegment {
        match decode(datagram).unwrap() {
            Segment::Data(data) => data,
            other => panic!("expected data segment, got {:?}", other),
        }
    }

    #[test]
    fn test_hello_then_eof() {
        let mut sender = SenderWindow::new(&Config::default());
        let mut source = MemorySource::new("HELLO");
        let now = Instant::now();

        let sent = sender.fill(&mut source, 1, now);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), 17);
        let first = data(&sent[0]);
        assert_eq!((first.seqno, first.ackno), (1, 1));
        assert_eq!(first.payload().as_slice(), b"HELLO");

        // Window of one is full
        assert!(sender.fill(&mut source, 1, now).is_empty());
        assert_eq!(sender.on_ack(2), AckOutcome::Advanced { cleared: 1 });

        let sent = sender.fill(&mut source, 2, now);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), 12);
        let eof = data(&sent[0]);
        assert!(eof.is_eof());
        assert_eq!(eof.seqno, 2);

        assert!(sender.local_eof_sent());
        assert!(!sender.local_eof_acked());
        assert_eq!(sender.on_ack(3), AckOutcome::Advanced { cleared: 1 });
        assert!(sender.local_eof_acked());
        assert_eq!(sender.outstanding(), 0);
    }

    #[test]
    fn test_source_not_read_after_eof() {
        let mut sender = SenderWindow::new(&config(4));
        let mut source = MemorySource::empty();
        let now = Instant::now();

        assert_eq!(sender.fill(&mut source, 1, now).len(), 1);
        assert_eq!(source.reads(), 1);
        sender.on_ack(2);
        assert!(sender.fill(&mut source, 1, now).is_empty());
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn test_input_failure_ends_stream() {
        let mut sender = SenderWindow::new(&config(4));
        let mut source = MemorySource::new("ab").then_fail("broken pipe");
        let sent = sender.fill(&mut source, 1, Instant::now());

        assert_eq!(sent.len(), 2);
        assert!(!data(&sent[0]).is_eof());
        assert!(data(&sent[1]).is_eof());
        assert!(sender.local_eof_sent());
    }

    #[test]
    fn test_would_block_is_noop() {
        let mut sender = SenderWindow::new(&config(4));
        let mut source = MemorySource::open();
        assert!(sender.fill(&mut source, 1, Instant::now()).is_empty());
        assert_eq!(sender.next_seqno(), 1);
        assert!(sender.has_room());
    }

    #[test]
    fn test_window_and_cumulative_ack() {
        let mut sender = SenderWindow::new(&config(3));
        let mut source = MemorySource::new(vec![7u8; 20]).then_block();
        let now = Instant::now();

        let sent = sender.fill(&mut source, 1, now);
        let seqnos: Vec<u32> = sent.iter().map(|d| data(d).seqno).collect();
        assert_eq!(seqnos, vec![1, 2, 3]);
        assert!(!sender.has_room());

        // One ack clears everything below it
        assert_eq!(sender.on_ack(3), AckOutcome::Advanced { cleared: 2 });
        assert_eq!(sender.outstanding(), 1);

        let sent = sender.fill(&mut source, 1, now);
        let seqnos: Vec<u32> = sent.iter().map(|d| data(d).seqno).collect();
        assert_eq!(seqnos, vec![4, 5]);
    }

    #[test]
    fn test_stale_and_bogus_acks() {
        let mut sender = SenderWindow::new(&config(2));
        let mut source = MemorySource::new(vec![1u8; 8]).then_block();
        sender.fill(&mut source, 1, Instant::now());

        assert_eq!(sender.on_ack(1), AckOutcome::Stale);
        assert_eq!(sender.on_ack(9), AckOutcome::Bogus);
        assert_eq!(sender.on_ack(2), AckOutcome::Advanced { cleared: 1 });
        assert_eq!(sender.on_ack(2), AckOutcome::Stale);
        assert_eq!(sender.highest_acked(), 2);
        assert_eq!(sender.outstanding(), 1);
    }

    #[test]
    fn test_retransmit_once_per_timeout() {
        let mut sender = SenderWindow::new(&config(1));
        let mut source = MemorySource::new("abc");
        let start = Instant::now();
        let sent = sender.fill(&mut source, 1, start);

        let ms = Duration::from_millis;
        assert!(sender.on_timer_tick(start + ms(50)).unwrap().is_empty());

        let resent = sender.on_timer_tick(start + ms(100)).unwrap();
        assert_eq!(resent, sent);
        assert!(sender.on_timer_tick(start + ms(150)).unwrap().is_empty());
        assert_eq!(sender.on_timer_tick(start + ms(200)).unwrap(), sent);

        sender.on_ack(2);
        assert!(sender.on_timer_tick(start + ms(1000)).unwrap().is_empty());
    }

    #[test]
    fn test_retransmit_limit() {
        let config = Config::builder()
            .retransmit_timeout(Duration::from_millis(100))
            .timer_interval(Duration::from_millis(20))
            .max_retransmits(Some(2))
            .build()
            .unwrap();
        let mut sender = SenderWindow::new(&config);
        let mut source = MemorySource::new("abc");
        let start = Instant::now();
        sender.fill(&mut source, 1, start);

        let ms = Duration::from_millis;
        assert_eq!(sender.on_timer_tick(start + ms(100)).unwrap().len(), 1);
        assert_eq!(sender.on_timer_tick(start + ms(200)).unwrap().len(), 1);
        assert_eq!(
            sender.on_timer_tick(start + ms(300)),
            Err(SessionError::RetransmitLimit { seqno: 1, attempts: 2 })
        );
    }

    #[test]
    fn test_sequence_exhaustion_sends_eof() {
        let mut sender = SenderWindow::new(&config(4));
        sender.next_seqno = FINAL_SEQNO - 1;
        sender.highest_acked = FINAL_SEQNO - 1;
        let mut source = MemorySource::new(vec![0u8; 100]);

        let sent = sender.fill(&mut source, 1, Instant::now());
        assert_eq!(sent.len(), 2);
        assert_eq!(data(&sent[0]).seqno, FINAL_SEQNO - 1);
        let eof = data(&sent[1]);
        assert!(eof.is_eof());
        assert_eq!(eof.seqno, FINAL_SEQNO);

        assert_eq!(
            sender.on_ack(u32::MAX),
            AckOutcome::Advanced { cleared: 2 }
        );
        assert!(sender.local_eof_acked());
    }
}
