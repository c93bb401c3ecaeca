//! In-order receiver with flow-controlled delivery.
//!
//! Delivers payloads to the sink strictly in sequence order and only
//! acknowledges what the sink has actually accepted. With a window above one,
//! segments arriving ahead of a gap are held in a bounded reorder buffer.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::core::constants::FINAL_SEQNO;
use crate::core::{ByteSink, Config};
use crate::transport::DataSegment;

/// Why a Data segment was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Ahead of the expected sequence number and outside the reorder window.
    OutOfWindow,
    /// Payload larger than the configured maximum.
    Oversized,
    /// Copy of the segment already held awaiting sink capacity.
    AlreadyHeld,
    /// Arrived after the remote end of stream was delivered.
    AfterEndOfStream,
}

/// What happened to an arriving Data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Accepted at the expected sequence number (delivered or held).
    Accepted,
    /// Already delivered; acknowledged again.
    Duplicate,
    /// Stored ahead of a gap.
    Buffered,
    /// Discarded without acknowledgment.
    Dropped(DropReason),
}

/// Outcome of [`Receiver::on_segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reception {
    /// What happened to the segment.
    pub disposition: Disposition,
    /// Cumulative acknowledgment to send, if any.
    pub ack: Option<u32>,
}

#[derive(Debug, Clone)]
struct Held {
    segment: DataSegment,
    written: usize,
}

/// Receiver side of a session.
#[derive(Debug, Clone)]
pub struct Receiver {
    window: usize,
    max_payload: usize,

    /// Highest sequence number handed to the sink (0 before any).
    last_delivered: u32,

    /// Segment at `last_delivered + 1` waiting for sink capacity.
    held: Option<Held>,

    /// Segments beyond the first gap, at most `window - 1`.
    reorder: BTreeMap<u32, DataSegment>,

    remote_eof: bool,
    bytes_delivered: u64,
}

impl Receiver {
    /// Create a receiver from a session configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            window: config.window,
            max_payload: config.max_payload,
            last_delivered: 0,
            held: None,
            reorder: BTreeMap::new(),
            remote_eof: false,
            bytes_delivered: 0,
        }
    }

    /// Next sequence number expected, which is also the cumulative ackno.
    pub fn ackno(&self) -> u32 {
        self.last_delivered + 1
    }

    /// Handle an arriving Data segment.
    pub fn on_segment<K>(&mut self, segment: DataSegment, sink: &mut K) -> Reception
    where
        K: ByteSink + ?Sized,
    {
        let seqno = segment.seqno;

        if seqno <= self.last_delivered {
            trace!(seqno, ackno = self.ackno(), "duplicate segment, echoing ack");
            return Reception {
                disposition: Disposition::Duplicate,
                ack: Some(self.ackno()),
            };
        }
        if self.remote_eof {
            return self.drop_segment(seqno, DropReason::AfterEndOfStream);
        }
        if segment.payload().len() > self.max_payload {
            return self.drop_segment(seqno, DropReason::Oversized);
        }
        // Ackno for u32::MAX would not fit the wire
        if seqno > FINAL_SEQNO {
            return self.drop_segment(seqno, DropReason::OutOfWindow);
        }

        let expected = self.ackno();
        if seqno == expected {
            if self.held.is_some() {
                return self.drop_segment(seqno, DropReason::AlreadyHeld);
            }
            self.held = Some(Held {
                segment,
                written: 0,
            });
            return Reception {
                disposition: Disposition::Accepted,
                ack: self.try_deliver(sink),
            };
        }

        let slots = u32::try_from(self.reorder_slots()).unwrap_or(u32::MAX);
        let horizon = expected.saturating_add(slots);
        if seqno > horizon {
            return self.drop_segment(seqno, DropReason::OutOfWindow);
        }
        trace!(seqno, expected, "buffering out-of-order segment");
        self.reorder.entry(seqno).or_insert(segment);
        Reception {
            disposition: Disposition::Buffered,
            ack: Some(expected),
        }
    }

    /// Hand held and contiguous buffered segments to the sink as capacity
    /// allows.
    ///
    /// Returns the new cumulative ackno if anything was delivered.
    pub fn try_deliver<K>(&mut self, sink: &mut K) -> Option<u32>
    where
        K: ByteSink + ?Sized,
    {
        let mut advanced = false;

        loop {
            if self.held.is_none() {
                let next = self.ackno();
                let Some(segment) = self.reorder.remove(&next) else {
                    break;
                };
                self.held = Some(Held {
                    segment,
                    written: 0,
                });
            }
            let Some(held) = self.held.as_mut() else {
                break;
            };
            let seqno = held.segment.seqno;

            if held.segment.is_eof() {
                sink.finish();
                self.held = None;
                self.last_delivered = seqno;
                self.remote_eof = true;
                self.reorder.clear();
                advanced = true;
                debug!(seqno, "remote end of stream delivered");
                break;
            }

            let remaining = &held.segment.payload().as_slice()[held.written..];
            if sink.capacity() < remaining.len() {
                trace!(seqno, pending = remaining.len(), "sink full, holding segment");
                break;
            }
            let accepted = sink.write(remaining);
            held.written += accepted;
            self.bytes_delivered += accepted as u64;
            if accepted < remaining.len() {
                break;
            }

            trace!(seqno, "delivered");
            self.held = None;
            self.last_delivered = seqno;
            advanced = true;
        }

        advanced.then(|| self.ackno())
    }

    /// Whether the remote end of stream has been delivered to the sink.
    pub fn remote_eof(&self) -> bool {
        self.remote_eof
    }

    /// Highest sequence number delivered.
    pub fn last_delivered(&self) -> u32 {
        self.last_delivered
    }

    /// Whether a segment is waiting for sink capacity.
    pub fn has_held(&self) -> bool {
        self.held.is_some()
    }

    /// Segments buffered beyond the first gap.
    pub fn buffered(&self) -> usize {
        self.reorder.len()
    }

    /// Payload bytes handed to the sink.
    pub fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered
    }

    fn reorder_slots(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn drop_segment(&self, seqno: u32, reason: DropReason) -> Reception {
        debug!(seqno, ?reason, "dropping segment");
        Reception {
            disposition: Disposition::Dropped(reason),
            ack: None,
        }
    }
}
