//! Segment encoding and decoding.
//!
//! Two segment kinds share one datagram format. All multi-byte fields are
//! big-endian.
//!
//! Data segment (12-byte header):
//! ```text
//! +----------+----------+------------------+------------------+-----------+
//! | Checksum | Length   | Ack Number       | Sequence Number  | Payload   |
//! | 2 bytes  | 2 bytes  | 4 bytes          | 4 bytes          | 0..N      |
//! +----------+----------+------------------+------------------+-----------+
//! ```
//!
//! Ack segment (8-byte header, no payload):
//! ```text
//! +----------+----------+------------------+
//! | Checksum | Length   | Ack Number       |
//! | 2 bytes  | 2 bytes  | 4 bytes          |
//! +----------+----------+------------------+
//! ```
//!
//! The declared length is the canonical kind discriminant: exactly
//! [`ACK_HEADER_SIZE`] means Ack, at least [`DATA_HEADER_SIZE`] means Data,
//! anything else is malformed. An empty Data segment (the end-of-stream
//! marker) therefore declares 12 bytes and can never be mistaken for an Ack.

use crate::core::constants::{
    ACK_HEADER_SIZE, CHECKSUM_SIZE, DATA_HEADER_SIZE, LENGTH_SIZE, MAX_PAYLOAD_CAPACITY,
};

use super::checksum::checksum;
use super::error::SegmentError;

const OFF_CHECKSUM: usize = 0;
const OFF_LENGTH: usize = OFF_CHECKSUM + CHECKSUM_SIZE;
const OFF_ACKNO: usize = OFF_LENGTH + LENGTH_SIZE;
const OFF_SEQNO: usize = ACK_HEADER_SIZE;

/// Segment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Carries a sequence number and payload.
    Data,
    /// Carries only a cumulative acknowledgment.
    Ack,
}

/// Bounds-checked payload buffer.
///
/// A payload can only be built from a slice whose length has been checked
/// against an explicit limit, so a decoded payload never exceeds what its
/// declared length allows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    /// Copy `bytes` into a payload no longer than `max`.
    pub fn new(bytes: &[u8], max: usize) -> Result<Self, SegmentError> {
        let max = max.min(MAX_PAYLOAD_CAPACITY);
        if bytes.len() > max {
            return Err(SegmentError::PayloadTooLarge {
                len: bytes.len(),
                max,
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Take ownership of `bytes` as a payload no longer than `max`.
    pub fn from_vec(bytes: Vec<u8>, max: usize) -> Result<Self, SegmentError> {
        let max = max.min(MAX_PAYLOAD_CAPACITY);
        if bytes.len() > max {
            return Err(SegmentError::PayloadTooLarge {
                len: bytes.len(),
                max,
            });
        }
        Ok(Self { bytes })
    }

    /// The empty payload (end-of-stream marker).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// A Data segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    /// Sequence number of this segment.
    pub seqno: u32,
    /// Piggybacked cumulative acknowledgment.
    pub ackno: u32,
    payload: Payload,
}

impl DataSegment {
    /// Create a Data segment.
    pub fn new(seqno: u32, ackno: u32, payload: Payload) -> Self {
        Self {
            seqno,
            ackno,
            payload,
        }
    }

    /// Create an end-of-stream marker.
    pub fn eof(seqno: u32, ackno: u32) -> Self {
        Self::new(seqno, ackno, Payload::empty())
    }

    /// The payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether this is the end-of-stream marker.
    pub fn is_eof(&self) -> bool {
        self.payload.is_empty()
    }

    /// Encoded size in bytes.
    pub fn wire_len(&self) -> usize {
        DATA_HEADER_SIZE + self.payload.len()
    }
}

/// An Ack segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckSegment {
    /// Next sequence number the receiver expects.
    pub ackno: u32,
}

impl AckSegment {
    /// Create an Ack segment.
    pub fn new(ackno: u32) -> Self {
        Self { ackno }
    }
}

/// A decoded segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Data segment.
    Data(DataSegment),
    /// Ack segment.
    Ack(AckSegment),
}

impl Segment {
    /// The segment kind.
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Data(_) => SegmentKind::Data,
            Segment::Ack(_) => SegmentKind::Ack,
        }
    }

    /// Cumulative acknowledgment carried by either kind.
    pub fn ackno(&self) -> u32 {
        match self {
            Segment::Data(data) => data.ackno,
            Segment::Ack(ack) => ack.ackno,
        }
    }

    /// Sequence number, for Data segments.
    pub fn seqno(&self) -> Option<u32> {
        match self {
            Segment::Data(data) => Some(data.seqno),
            Segment::Ack(_) => None,
        }
    }

    /// Encoded size in bytes.
    pub fn wire_len(&self) -> usize {
        match self {
            Segment::Data(data) => data.wire_len(),
            Segment::Ack(_) => ACK_HEADER_SIZE,
        }
    }

    /// Serialize to wire format.
    pub fn encode(&self) -> Vec<u8> {
        encode(self)
    }

    /// Parse from wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, SegmentError> {
        decode(bytes)
    }
}

impl From<DataSegment> for Segment {
    fn from(data: DataSegment) -> Self {
        Segment::Data(data)
    }
}

impl From<AckSegment> for Segment {
    fn from(ack: AckSegment) -> Self {
        Segment::Ack(ack)
    }
}

/// Serialize a segment, computing its length and checksum.
pub fn encode(segment: &Segment) -> Vec<u8> {
    let len = segment.wire_len();
    let mut buf = vec![0u8; len];

    buf[OFF_LENGTH..OFF_ACKNO].copy_from_slice(&(len as u16).to_be_bytes());
    buf[OFF_ACKNO..OFF_SEQNO].copy_from_slice(&segment.ackno().to_be_bytes());
    if let Segment::Data(data) = segment {
        buf[OFF_SEQNO..DATA_HEADER_SIZE].copy_from_slice(&data.seqno.to_be_bytes());
        buf[DATA_HEADER_SIZE..].copy_from_slice(data.payload.as_slice());
    }

    // Checksum field is still zero here, so summing past it is equivalent
    let sum = checksum(&buf[OFF_LENGTH..]);
    buf[OFF_CHECKSUM..OFF_LENGTH].copy_from_slice(&sum.to_be_bytes());
    buf
}

/// Parse a datagram into a segment.
///
/// The declared length is checked against the received size first, then
/// the checksum over the declared bytes. No other field is read until the
/// checksum verifies. A datagram arrives whole, so any size other than the
/// declared length is rejected.
pub fn decode(bytes: &[u8]) -> Result<Segment, SegmentError> {
    if bytes.len() < ACK_HEADER_SIZE {
        return Err(SegmentError::Truncated {
            declared: ACK_HEADER_SIZE,
            actual: bytes.len(),
        });
    }

    let declared = u16::from_be_bytes([bytes[OFF_LENGTH], bytes[OFF_LENGTH + 1]]);
    let len = usize::from(declared);
    if len > bytes.len() {
        return Err(SegmentError::Truncated {
            declared: len,
            actual: bytes.len(),
        });
    }
    if len < ACK_HEADER_SIZE {
        return Err(SegmentError::InvalidLength(declared));
    }
    if len < bytes.len() {
        return Err(SegmentError::TrailingBytes {
            declared: len,
            actual: bytes.len(),
        });
    }

    let expected = u16::from_be_bytes([bytes[OFF_CHECKSUM], bytes[OFF_CHECKSUM + 1]]);
    let computed = checksum(&bytes[OFF_LENGTH..len]);
    if expected != computed {
        return Err(SegmentError::ChecksumMismatch { expected, computed });
    }

    let ackno = read_u32(bytes, OFF_ACKNO);
    match len {
        ACK_HEADER_SIZE => Ok(Segment::Ack(AckSegment { ackno })),
        len if len >= DATA_HEADER_SIZE => {
            let seqno = read_u32(bytes, OFF_SEQNO);
            let payload = Payload::new(&bytes[DATA_HEADER_SIZE..len], MAX_PAYLOAD_CAPACITY)?;
            Ok(Segment::Data(DataSegment {
                seqno,
                ackno,
                payload,
            }))
        }
        _ => Err(SegmentError::InvalidLength(declared)),
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello() -> Segment {
        let payload = Payload::new(b"HELLO", 500).unwrap();
        Segment::Data(DataSegment::new(1, 1, payload))
    }

    #[test]
    fn test_hello_wire_bytes() {
        let bytes = encode(&hello());
        assert_eq!(bytes.len(), 17);
        // length 17, ackno 1, seqno 1, "HELLO"
        assert_eq!(hex::encode(&bytes[2..]), "0011000000010000000148454c4c4f");
        assert_eq!(decode(&bytes).unwrap(), hello());
    }

    #[test]
    fn test_ack_wire_bytes() {
        let bytes = encode(&Segment::Ack(AckSegment::new(2)));
        assert_eq!(bytes.len(), ACK_HEADER_SIZE);
        assert_eq!(hex::encode(&bytes[2..]), "000800000002");

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.kind(), SegmentKind::Ack);
        assert_eq!(decoded.ackno(), 2);
        assert_eq!(decoded.seqno(), None);
    }

    #[test]
    fn test_eof_distinct_from_ack() {
        let eof = encode(&Segment::Data(DataSegment::eof(2, 3)));
        let ack = encode(&Segment::Ack(AckSegment::new(3)));
        assert_eq!(eof.len(), DATA_HEADER_SIZE);
        assert_eq!(ack.len(), ACK_HEADER_SIZE);

        match decode(&eof).unwrap() {
            Segment::Data(data) => {
                assert!(data.is_eof());
                assert_eq!(data.seqno, 2);
                assert_eq!(data.ackno, 3);
            }
            other => panic!("expected EOF data segment, got {:?}", other),
        }
        assert!(matches!(decode(&ack).unwrap(), Segment::Ack(_)));
    }

    #[test]
    fn test_checksum_field_verifies() {
        let bytes = encode(&hello());
        let stored = u16::from_be_bytes([bytes[0], bytes[1]]);
        let mut zeroed = bytes.clone();
        zeroed[0] = 0;
        zeroed[1] = 0;
        assert_eq!(checksum(&zeroed), stored);
    }

    #[test]
    fn test_single_bit_flips_rejected() {
        let segments = [
            hello(),
            Segment::Ack(AckSegment::new(2)),
            Segment::Data(DataSegment::eof(2, 1)),
        ];
        for segment in segments {
            let bytes = encode(&segment);
            for bit in 0..bytes.len() * 8 {
                let mut corrupted = bytes.clone();
                corrupted[bit / 8] ^= 1 << (bit % 8);
                assert!(
                    decode(&corrupted).is_err(),
                    "bit {} flip accepted for {:?}",
                    bit,
                    segment
                );
            }
        }
    }

    #[test]
    fn test_truncated() {
        let bytes = encode(&hello());
        assert!(matches!(
            decode(&bytes[..16]),
            Err(SegmentError::Truncated {
                declared: 17,
                actual: 16
            })
        ));
        assert!(matches!(
            decode(&bytes[..3]),
            Err(SegmentError::Truncated { actual: 3, .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(&hello());
        bytes.extend_from_slice(b"junk");
        assert_eq!(
            decode(&bytes),
            Err(SegmentError::TrailingBytes {
                declared: 17,
                actual: 21
            })
        );
    }

    #[test]
    fn test_shrunken_length_rejected() {
        // Dropping the words ff fb 00 00 and shrinking the length by 4
        // leaves the one's-complement sum unchanged
        let payload = Payload::new(&hex::decode("616263646566fffb0000").unwrap(), 500).unwrap();
        let mut data = encode(&Segment::Data(DataSegment::new(1, 1, payload)));
        assert_eq!(data[3], 22);
        data[3] ^= 0x04;
        assert_eq!(checksum(&data[2..18]), u16::from_be_bytes([data[0], data[1]]));
        assert_eq!(
            decode(&data),
            Err(SegmentError::TrailingBytes {
                declared: 18,
                actual: 22
            })
        );

        // An EOF shrunk to the ack header size must not turn into an Ack
        let mut eof = encode(&Segment::Data(DataSegment::eof(0xFFFB, 7)));
        assert_eq!(eof[3], 12);
        eof[3] ^= 0x04;
        assert_eq!(checksum(&eof[2..8]), u16::from_be_bytes([eof[0], eof[1]]));
        assert!(matches!(
            decode(&eof),
            Err(SegmentError::TrailingBytes { declared: 8, .. })
        ));
    }

    #[test]
    fn test_invalid_lengths() {
        // Declared lengths between the two header sizes are neither kind
        for declared in [0u16, 7, 9, 10, 11] {
            let mut bytes = vec![0u8; usize::from(declared).max(ACK_HEADER_SIZE)];
            bytes[2..4].copy_from_slice(&declared.to_be_bytes());
            let sum = checksum(&bytes[2..usize::from(declared).max(2)]);
            bytes[0..2].copy_from_slice(&sum.to_be_bytes());
            assert!(
                matches!(decode(&bytes), Err(SegmentError::InvalidLength(d)) if d == declared),
                "declared length {} accepted",
                declared
            );
        }
    }

    #[test]
    fn test_payload_bounds() {
        assert!(Payload::new(&[0u8; 500], 500).is_ok());
        assert!(matches!(
            Payload::new(&[0u8; 501], 500),
            Err(SegmentError::PayloadTooLarge { len: 501, max: 500 })
        ));
        assert!(Payload::from_vec(vec![0u8; MAX_PAYLOAD_CAPACITY + 1], usize::MAX).is_err());
    }

    #[test]
    fn test_max_payload_roundtrip() {
        let payload = Payload::new(&[0xA5; 500], 500).unwrap();
        let segment = Segment::Data(DataSegment::new(9, 4, payload));
        let bytes = segment.encode();
        assert_eq!(bytes.len(), 512);
        assert_eq!(Segment::decode(&bytes).unwrap(), segment);
    }
}
