//! 16-bit one's-complement checksum.
//!
//! The sum runs over big-endian 16-bit words; an odd trailing byte is
//! padded with a zero low byte. A computed value of zero is sent as
//! `0xFFFF`, which is equivalent in one's-complement arithmetic.

/// Compute the checksum of `data`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
    }
    while sum > 0xFFFF {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    match !(sum as u16) {
        0 => 0xFFFF,
        folded => folded,
    }
}
