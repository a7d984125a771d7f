//! CRC-8 framer (§4.5).
//!
//! Polynomial `0x9B`, initial value `0x00`, computed MSB-first with no input or output
//! reflection. This is an internal, fixed choice for this crate (§9.1, DESIGN.md); a
//! real deployment talking to an actual peer device substitutes its bit-exact table
//! behind [`crc8`] without any other module needing to change.

const POLYNOMIAL: u8 = 0x9B;

/// Compute the CRC-8 of `data`.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Append the CRC-8 of `data` to it, returning the framed buffer.
pub fn frame(data: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(data.len() + 1);
    framed.extend_from_slice(data);
    framed.push(crc8(data));
    framed
}

/// Verify that `framed`'s trailing byte is the CRC-8 of the rest, returning the
/// unframed payload if so (§8 invariant 4: "CRC gate").
pub fn verify(framed: &[u8]) -> Option<&[u8]> {
    let (payload, &[crc]) = framed.split_at_checked(framed.len().checked_sub(1)?) else {
        return None;
    };
    (crc8(payload) == crc).then_some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_of_empty_is_zero() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn frame_then_verify_round_trips() {
        let data = [0x1F, 0x00, 0xEE, 0x01, 0x00, 0xAB, 0xCD];
        let framed = frame(&data);
        assert_eq!(verify(&framed), Some(&data[..]));
    }

    #[test]
    fn verify_rejects_corrupted_payload() {
        let data = [1, 2, 3, 4];
        let mut framed = frame(&data);
        framed[1] ^= 0xFF;
        assert_eq!(verify(&framed), None);
    }

    #[test]
    fn verify_rejects_empty_buffer() {
        assert_eq!(verify(&[]), None);
    }

    #[test]
    fn single_byte_flips_are_all_distinguishable() {
        // A minimal confidence check that the table-less bit-by-bit implementation
        // doesn't collapse distinct single-byte payloads onto the same CRC.
        let mut seen = std::collections::HashSet::new();
        for byte in 0u8..=255 {
            seen.insert(crc8(&[byte]));
        }
        assert!(seen.len() > 200);
    }
}
