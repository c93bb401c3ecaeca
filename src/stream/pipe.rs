//! In-memory byte source and sink.

use std::collections::VecDeque;

use crate::core::{ByteSink, ByteSource, SourceRead};

/// What a [`MemorySource`] reports once its queued bytes run out.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Exhausted {
    End,
    Block,
    Fail(String),
}

/// Byte source backed by queued chunks.
///
/// Each read returns bytes from a single chunk, so chunk boundaries shape
/// segment boundaries. Once the queue is empty the source reports end of
/// input, would-block, or a failure depending on how it was built.
#[derive(Debug, Clone)]
pub struct MemorySource {
    chunks: VecDeque<Vec<u8>>,
    exhausted: Exhausted,
    reads: usize,
}

impl MemorySource {
    /// Source yielding `bytes`, then end of input.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_chunks([bytes.into()])
    }

    /// Source yielding each chunk in turn, then end of input.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().filter(|c| !c.is_empty()).collect(),
            exhausted: Exhausted::End,
            reads: 0,
        }
    }

    /// Source with no data that blocks until [`push`](Self::push) or
    /// [`close`](Self::close) is called.
    pub fn open() -> Self {
        Self::empty().then_block()
    }

    /// Source that is already at end of input.
    pub fn empty() -> Self {
        Self::from_chunks(std::iter::empty())
    }

    /// Report would-block instead of end of input when drained.
    pub fn then_block(mut self) -> Self {
        self.exhausted = Exhausted::Block;
        self
    }

    /// Report a failure instead of end of input when drained.
    pub fn then_fail(mut self, reason: impl Into<String>) -> Self {
        self.exhausted = Exhausted::Fail(reason.into());
        self
    }

    /// Queue more bytes.
    pub fn push(&mut self, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        if !bytes.is_empty() {
            self.chunks.push_back(bytes);
        }
    }

    /// Report end of input once the queued bytes are read.
    pub fn close(&mut self) {
        self.exhausted = Exhausted::End;
    }

    /// Number of `read` calls made so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, max_len: usize) -> SourceRead {
        self.reads += 1;
        let Some(front) = self.chunks.front_mut() else {
            return match &self.exhausted {
                Exhausted::End => SourceRead::EndOfInput,
                Exhausted::Block => SourceRead::WouldBlock,
                Exhausted::Fail(reason) => SourceRead::Failed(reason.clone()),
            };
        };
        if front.len() <= max_len {
            let chunk = std::mem::take(front);
            self.chunks.pop_front();
            SourceRead::Data(chunk)
        } else {
            let rest = front.split_off(max_len);
            SourceRead::Data(std::mem::replace(front, rest))
        }
    }
}

/// Byte sink collecting into memory, optionally bounded.
///
/// A bounded sink accepts at most `limit` undrained bytes; [`drain`](Self::drain)
/// frees capacity the way an application consuming the stream would.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffered: Vec<u8>,
    limit: Option<usize>,
    finished: bool,
}

impl MemorySink {
    /// Unbounded sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink holding at most `limit` undrained bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Undrained bytes.
    pub fn contents(&self) -> &[u8] {
        &self.buffered
    }

    /// Take the undrained bytes, freeing capacity.
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffered)
    }

    /// Whether end of stream was signaled.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ByteSink for MemorySink {
    fn capacity(&self) -> usize {
        match self.limit {
            Some(limit) => limit.saturating_sub(self.buffered.len()),
            None => usize::MAX,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        let accepted = bytes.len().min(self.capacity());
        self.buffered.extend_from_slice(&bytes[..accepted]);
        accepted
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_splits_chunks() {
        let mut source = MemorySource::new(b"abcdefg".to_vec());
        assert_eq!(source.read(3), SourceRead::Data(b"abc".to_vec()));
        assert_eq!(source.read(3), SourceRead::Data(b"def".to_vec()));
        assert_eq!(source.read(3), SourceRead::Data(b"g".to_vec()));
        assert_eq!(source.read(3), SourceRead::EndOfInput);
        assert_eq!(source.reads(), 4);
    }

    #[test]
    fn test_source_exhaustion_modes() {
        let mut source = MemorySource::open();
        assert_eq!(source.read(10), SourceRead::WouldBlock);
        source.push("hi");
        assert_eq!(source.read(10), SourceRead::Data(b"hi".to_vec()));
        source.close();
        assert_eq!(source.read(10), SourceRead::EndOfInput);

        let mut failing = MemorySource::new("x").then_fail("disk gone");
        assert_eq!(failing.read(10), SourceRead::Data(b"x".to_vec()));
        assert_eq!(failing.read(10), SourceRead::Failed("disk gone".into()));
    }

    #[test]
    fn test_bounded_sink() {
        let mut sink = MemorySink::with_limit(4);
        assert_eq!(sink.capacity(), 4);
        assert_eq!(sink.write(b"abcdef"), 4);
        assert_eq!(sink.capacity(), 0);
        assert_eq!(sink.drain(), b"abcd");
        assert_eq!(sink.capacity(), 4);

        assert!(!sink.is_finished());
        sink.finish();
        assert!(sink.is_finished());
    }
}
