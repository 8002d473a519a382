//! Mode S CRC-24 engine.
//!
//! The checksum is not a byte-wise polynomial division: it's the bit-walk
//! table lookup used by the reference decoder, generator `0xFFF409`. Entry
//! `i` of [`CHECKSUM_TABLE`] is the contribution of message bit `i` (counted
//! from the start of a 112-bit frame) to the final 24-bit checksum; the last
//! 24 entries are zero because those bits are the checksum field itself.

/// Long (DF16/17/19/20/21) message length in bits.
pub const LONG_MSG_BITS: usize = 112;
/// Short message length in bits.
pub const SHORT_MSG_BITS: usize = 56;

#[rustfmt::skip]
const CHECKSUM_TABLE: [u32; 112] = [
    0x3935ea, 0x1c9af5, 0xf1b77e, 0x78dbbf, 0xc397db, 0x9e31e9, 0xb0e2f0, 0x587178,
    0x2c38bc, 0x161c5e, 0x0b0e2f, 0xfa7d13, 0x82c48d, 0xbe9842, 0x5f4c21, 0xd05c14,
    0x682e0a, 0x341705, 0xe5f186, 0x72f8c3, 0xc68665, 0x9cb936, 0x4e5c9b, 0xd8d449,
    0x939020, 0x49c810, 0x24e408, 0x127204, 0x093902, 0x049c81, 0xfdb444, 0x7eda22,
    0x3f6d11, 0xe04c8c, 0x702646, 0x381323, 0xe3f395, 0x8e03ce, 0x4701e7, 0xdc7af7,
    0x91c77f, 0xb719bb, 0xa476d9, 0xadc168, 0x56e0b4, 0x2b705a, 0x15b82d, 0xf52612,
    0x7a9309, 0xc2b380, 0x6159c0, 0x30ace0, 0x185670, 0x0c2b38, 0x06159c, 0x030ace,
    0x018567, 0xff38b7, 0x80665f, 0xbfc92b, 0xa01e91, 0xaff54c, 0x57faa6, 0x2bfd53,
    0xea04ad, 0x8af852, 0x457c29, 0xdd4410, 0x6ea208, 0x375104, 0x1ba882, 0x0dd441,
    0xf91024, 0x7c8812, 0x3e4409, 0xe0d800, 0x706c00, 0x383600, 0x1c1b00, 0x0e0d80,
    0x0706c0, 0x038360, 0x01c1b0, 0x00e0d8, 0x00706c, 0x003836, 0x001c1b, 0xfff409,
    0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000,
    0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000,
    0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000,
];

/// Walk the message bit by bit, XORing in the table entry for every set bit.
///
/// `bits` is 56 or 112; short frames start at table offset `112 - bits` so
/// that the last 24 bits of either length line up with the same trailing
/// zero run.
pub fn checksum(msg: &[u8], bits: usize) -> u32 {
    let offset = if bits == LONG_MSG_BITS { 0 } else { LONG_MSG_BITS - SHORT_MSG_BITS };
    let mut crc: u32 = 0;
    for j in 0..bits {
        let byte = j / 8;
        let bitmask = 1u8 << (7 - (j % 8));
        if msg[byte] & bitmask != 0 {
            crc ^= CHECKSUM_TABLE[j + offset];
        }
    }
    crc
}

/// Last three bytes of the frame, read big-endian.
pub fn observed_crc(msg: &[u8], bits: usize) -> u32 {
    let last = bits / 8 - 1;
    ((msg[last - 2] as u32) << 16) | ((msg[last - 1] as u32) << 8) | (msg[last] as u32)
}

/// Try every single-bit flip until the observed trailing CRC matches the
/// recomputed checksum. On success `msg` is overwritten with the corrected
/// bytes and the flipped bit index is returned.
pub fn fix_single_bit_errors(msg: &mut [u8], bits: usize) -> i32 {
    let nbytes = bits / 8;
    let mut aux = vec![0u8; nbytes];
    for j in 0..bits {
        let byte = j / 8;
        let bitmask = 1u8 << (7 - (j % 8));
        aux.copy_from_slice(&msg[..nbytes]);
        aux[byte] ^= bitmask;

        if observed_crc(&aux, bits) == checksum(&aux, bits) {
            msg[..nbytes].copy_from_slice(&aux);
            return j as i32;
        }
    }
    -1
}

/// Exhaustive two-bit repair, DF17-only and gated by `--aggressive` by the
/// caller. Returns the flipped pair encoded as `j | (i << 8)` — only valid
/// for 112-bit frames since `i` must fit in a byte.
pub fn fix_two_bits_errors(msg: &mut [u8], bits: usize) -> i32 {
    let nbytes = bits / 8;
    let mut aux = vec![0u8; nbytes];
    for j in 0..bits {
        let byte1 = j / 8;
        let bitmask1 = 1u8 << (7 - (j % 8));
        for i in (j + 1)..bits {
            let byte2 = i / 8;
            let bitmask2 = 1u8 << (7 - (i % 8));

            aux.copy_from_slice(&msg[..nbytes]);
            aux[byte1] ^= bitmask1;
            aux[byte2] ^= bitmask2;

            if observed_crc(&aux, bits) == checksum(&aux, bits) {
                msg[..nbytes].copy_from_slice(&aux);
                return (j as i32) | ((i as i32) << 8);
            }
        }
    }
    -1
}

/// Recover the ICAO address of an AP-checksummed reply (DF 0,4,5,16,20,21,24)
/// by XORing the recomputed CRC into the trailing three bytes: since the
/// wire value is `addr XOR crc`, XORing `crc` back out leaves `addr`.
/// Does not by itself validate the recovered address against any whitelist.
pub fn recover_ap_address(msg: &[u8], bits: usize) -> u32 {
    let nbytes = bits / 8;
    let crc = checksum(msg, bits);
    let last = nbytes - 1;
    let b0 = msg[last - 2] ^ ((crc >> 16) & 0xFF) as u8;
    let b1 = msg[last - 1] ^ ((crc >> 8) & 0xFF) as u8;
    let b2 = msg[last] ^ (crc & 0xFF) as u8;
    ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32)
}

/// Downlink formats whose trailing 24 bits are `ICAO XOR CRC` rather than a
/// bare CRC.
pub const AP_DOWNLINK_FORMATS: &[u8] = &[0, 4, 5, 16, 20, 21, 24];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{hex_decode, hex_encode};

    const VALID_FRAMES: &[&str] = &[
        "8D4840D6202CC371C32CE0576098",
        "8D40621D58C382D690C8AC2863A7",
        "8D485020994409940838175B284F",
    ];

    #[test]
    fn table_last_24_entries_are_zero() {
        assert!(CHECKSUM_TABLE[88..].iter().all(|&v| v == 0));
    }

    #[test]
    fn valid_df17_frames_checksum_to_observed() {
        for hex in VALID_FRAMES {
            let data = hex_decode(hex).unwrap();
            assert_eq!(checksum(&data, 112), observed_crc(&data, 112), "{hex}");
        }
    }

    #[test]
    fn single_bit_error_is_found_and_fixed() {
        let mut data = hex_decode(VALID_FRAMES[0]).unwrap();
        data[4] ^= 1 << 2; // flip bit 37
        let bit = fix_single_bit_errors(&mut data, 112);
        assert_eq!(bit, 37);
        assert_eq!(checksum(&data, 112), observed_crc(&data, 112));
        assert_eq!(hex_encode(&data), VALID_FRAMES[0]);
    }

    #[test]
    fn two_bit_error_is_found_and_fixed() {
        let mut data = hex_decode(VALID_FRAMES[0]).unwrap();
        data[2] ^= 0x10;
        data[9] ^= 0x04;
        let pair = fix_two_bits_errors(&mut data, 112);
        assert!(pair >= 0);
        assert_eq!(checksum(&data, 112), observed_crc(&data, 112));
    }

    #[test]
    fn unfixable_frame_returns_minus_one() {
        let mut data = hex_decode(VALID_FRAMES[0]).unwrap();
        data[0] ^= 0xFF;
        data[1] ^= 0xFF;
        data[2] ^= 0xFF;
        assert_eq!(fix_single_bit_errors(&mut data, 112), -1);
    }
}
