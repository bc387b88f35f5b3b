//! XOR-rotate payload checksum.
//!
//! A 16-bit accumulator starts at zero; each payload byte is XORed into the
//! low 8 bits, then the accumulator rotates left by one. Weaker than a CRC,
//! but the dominant failure mode on these links is framing loss rather than
//! bit flips, and the rotation keeps byte order significant.

/// Compute the 16-bit XOR-rotate checksum over `payload`.
///
/// The checksum covers the payload only, never the frame header.
pub fn xor_rotate(payload: &[u8]) -> u16 {
    let mut sum: u16 = 0;
    for &byte in payload {
        sum ^= u16::from(byte);
        sum = sum.rotate_left(1);
    }
    sum
}

/// Verify that `expected` matches the checksum of `payload`.
pub fn verify(payload: &[u8], expected: u16) -> bool {
    xor_rotate(payload) == expected
}
