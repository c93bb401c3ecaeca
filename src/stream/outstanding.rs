//! Outstanding-segment tracking.
//!
//! Holds sent but unacknowledged Data segments in sequence order, each with
//! its encoded bytes and retransmission deadline.

use std::collections::VecDeque;
use std::time::Instant;

/// A sent, unacknowledged Data segment.
#[derive(Debug, Clone)]
pub struct Outstanding {
    /// Sequence number.
    pub seqno: u32,
    /// Encoded datagram, resent verbatim on timeout.
    pub datagram: Vec<u8>,
    /// When the segment is next due for retransmission.
    pub deadline: Instant,
    /// Number of retransmissions so far.
    pub retransmits: u32,
}

impl Outstanding {
    /// Track a segment sent at `deadline - timeout`.
    pub fn new(seqno: u32, datagram: Vec<u8>, deadline: Instant) -> Self {
        Self {
            seqno,
            datagram,
            deadline,
            retransmits: 0,
        }
    }

    /// Whether the deadline has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Outstanding segments ordered by sequence number.
#[derive(Debug, Clone, Default)]
pub struct OutstandingQueue {
    entries: VecDeque<Outstanding>,
}

impl OutstandingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a newly sent segment. Sequence numbers must increase.
    pub fn push(&mut self, entry: Outstanding) {
        debug_assert!(
            self.entries.back().is_none_or(|last| last.seqno < entry.seqno),
            "outstanding segments must be pushed in sequence order"
        );
        self.entries.push_back(entry);
    }

    /// Remove every segment numbered below `ackno`, returning how many
    /// were cleared.
    pub fn ack_below(&mut self, ackno: u32) -> usize {
        let mut cleared = 0;
        while self.entries.front().is_some_and(|e| e.seqno < ackno) {
            self.entries.pop_front();
            cleared += 1;
        }
        cleared
    }

    /// Segments whose deadline has passed, oldest first.
    pub fn due(&mut self, now: Instant) -> impl Iterator<Item = &mut Outstanding> {
        self.entries.iter_mut().filter(move |e| e.is_due(now))
    }

    /// Earliest retransmission deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Oldest unacknowledged sequence number.
    pub fn oldest(&self) -> Option<u32> {
        self.entries.front().map(|e| e.seqno)
    }

    /// Number of outstanding segments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn queue_of(seqnos: &[u32], now: Instant) -> OutstandingQueue {
        let mut queue = OutstandingQueue::new();
        for (i, &seqno) in seqnos.iter().enumerate() {
            let deadline = now + Duration::from_millis(100 * (i as u64 + 1));
            queue.push(Outstanding::new(seqno, vec![seqno as u8], deadline));
        }
        queue
    }

    #[test]
    fn test_cumulative_clear() {
        let now = Instant::now();
        let mut queue = queue_of(&[1, 2, 3, 4], now);

        assert_eq!(queue.ack_below(1), 0);
        assert_eq!(queue.ack_below(3), 2);
        assert_eq!(queue.oldest(), Some(3));
        assert_eq!(queue.ack_below(10), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_due_segments() {
        let now = Instant::now();
        let mut queue = queue_of(&[5, 6, 7], now);

        let due: Vec<u32> = queue
            .due(now + Duration::from_millis(200))
            .map(|e| e.seqno)
            .collect();
        assert_eq!(due, vec![5, 6]);
        assert_eq!(queue.next_deadline(), Some(now + Duration::from_millis(100)));
    }
}
