//! Turn a raw byte buffer into a [`DecodedMessage`].
//!
//! Owns the CRC validation / repair dance and the DF dispatch; doesn't
//! touch the aircraft table (that's [`crate::tracker`]).

use crate::crc;
use crate::decode;
use crate::icao::IcaoRecencyCache;
use crate::types::{
    df_bit_length, icao_from_u32, AdsbError, AltitudeUnit, DecodedMessage, PositionFields,
    Result, SpeedType, VelocityFields,
};

/// Decoder-wide settings that affect CRC handling — these map directly to
/// the `--no-fix` / `--no-crc-check` / `--aggressive` CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Attempt single-bit repair on DF11/DF17 frames that fail CRC.
    pub fix_errors: bool,
    /// Attempt two-bit repair (DF17 only, after single-bit repair fails).
    pub aggressive: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions { fix_errors: true, aggressive: false }
    }
}

/// Decode one frame. The Downlink Format (byte 0's high 5 bits) determines
/// the real frame length; trailing bytes beyond that length are ignored.
///
/// Fails only on a short buffer (`AdsbError::InvalidLength`) — CRC outcome
/// is informational (`DecodedMessage::crc_ok`), not a rejection here.
pub fn decode_frame(
    raw: &[u8],
    opts: DecodeOptions,
    icao_cache: &mut IcaoRecencyCache,
    now_epoch_s: u64,
) -> Result<DecodedMessage> {
    if raw.is_empty() {
        return Err(AdsbError::InvalidLength { expected: 56, actual: 0 });
    }
    let df = raw[0] >> 3;
    let bit_length = df_bit_length(df);
    let nbytes = bit_length / 8;
    if raw.len() < nbytes {
        return Err(AdsbError::InvalidLength { expected: bit_length, actual: raw.len() * 8 });
    }

    let mut msg = raw[..nbytes].to_vec();
    let crc_observed = crc::observed_crc(&msg, bit_length);
    let mut crc_ok = crc_observed == crc::checksum(&msg, bit_length);
    let mut error_bit: i32 = -1;

    if !crc_ok && opts.fix_errors && (df == 11 || df == 17) {
        error_bit = crc::fix_single_bit_errors(&mut msg, bit_length);
        if error_bit != -1 {
            crc_ok = true;
        } else if opts.aggressive && df == 17 {
            error_bit = crc::fix_two_bits_errors(&mut msg, bit_length);
            if error_bit != -1 {
                crc_ok = true;
            }
        }
    }

    let ca = msg[0] & 7;
    let fs = msg[0] & 7;
    let dr = (msg[1] >> 3) & 0x1F;
    let um = ((msg[1] & 7) << 3) | (msg[2] >> 5);
    let squawk_val = decode::decode_squawk(msg[2], msg[3]);

    let mut icao = [msg[1], msg[2], msg[3]];

    if df != 11 && df != 17 {
        if crc::AP_DOWNLINK_FORMATS.contains(&df) {
            let candidate = crc::recover_ap_address(&msg, bit_length);
            let candidate_icao = icao_from_u32(candidate);
            if icao_cache.contains_recent(&candidate_icao, now_epoch_s) {
                icao = candidate_icao;
                crc_ok = true;
            } else {
                crc_ok = false;
            }
        } else {
            crc_ok = false;
        }
    } else if crc_ok && error_bit == -1 {
        icao_cache.insert(&icao, now_epoch_s);
    }

    let mut altitude_ft = None;
    let mut altitude_unit = None;
    if matches!(df, 0 | 4 | 16 | 20) {
        if let Some((alt, unit)) = decode::decode_ac13(msg[2], msg[3]) {
            altitude_ft = Some(alt);
            altitude_unit = Some(unit);
        }
    }

    let mut me_type = None;
    let mut me_sub = None;
    let mut identification = None;
    let mut position = None;
    let mut velocity = None;

    if df == 17 {
        let mt = msg[4] >> 3;
        let ms = msg[4] & 7;
        me_type = Some(mt);
        me_sub = Some(ms);

        if (1..=4).contains(&mt) {
            identification = Some(decode::decode_identification(&msg));
        } else if (9..=18).contains(&mt) {
            let pos = decode::decode_airborne_position(&msg);
            altitude_ft = pos.altitude_ft;
            altitude_unit = pos.altitude_ft.map(|_| AltitudeUnit::Feet);
            position = Some(PositionFields {
                raw_lat: pos.raw_lat,
                raw_lon: pos.raw_lon,
                odd: pos.odd,
                utc_sync: pos.utc_sync,
                altitude_ft: pos.altitude_ft,
            });
        } else if mt == 19 && (1..=4).contains(&ms) {
            let v = decode::decode_airborne_velocity(ms, &msg);
            let speed_type = if ms <= 2 { SpeedType::Ground } else { SpeedType::IAS };
            velocity = Some(VelocityFields {
                speed_type,
                speed_kts: v.ground_speed_kts,
                heading_deg: v.heading_deg,
                vertical_rate_fpm: v.vertical_rate_fpm,
            });
        }
    }

    // Computed for every frame, same as the original's unconditional
    // `mm->identity = a*1000+...` — DF4's emergency-squawk check in the
    // SBS formatter depends on this being present outside DF5/DF21 too.
    let squawk = Some(format!("{squawk_val:04}"));

    Ok(DecodedMessage {
        bytes: msg,
        bit_length,
        downlink_format: df,
        crc_observed,
        crc_ok,
        error_bit,
        icao,
        ca,
        fs,
        dr,
        um,
        squawk,
        altitude_ft,
        altitude_unit,
        me_type,
        me_sub,
        identification,
        position,
        velocity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hex_decode;

    fn decode_hex(hex: &str, opts: DecodeOptions, cache: &mut IcaoRecencyCache) -> DecodedMessage {
        let bytes = hex_decode(hex).unwrap();
        decode_frame(&bytes, opts, cache, 1_000).unwrap()
    }

    #[test]
    fn df17_identification_scenario() {
        let mut cache = IcaoRecencyCache::new();
        let mm = decode_hex(
            "8D4840D6202CC371C32CE0576098",
            DecodeOptions::default(),
            &mut cache,
        );
        assert_eq!(mm.downlink_format, 17);
        assert_eq!(mm.icao, [0x48, 0x40, 0xD6]);
        assert_eq!(mm.me_type, Some(4));
        assert_eq!(mm.identification.as_deref(), Some("KLM1023 "));
        assert!(mm.crc_ok);
    }

    #[test]
    fn ap_recovery_hit_when_seeded() {
        let mut cache = IcaoRecencyCache::new();
        cache.insert(&[0xAB, 0xCD, 0xEF], 1_000);

        // Build a DF4 frame whose AP XOR recovers to ABCDEF.
        let mut msg = vec![4u8 << 3, 0, 0, 0, 0, 0, 0];
        let crc = crc::checksum(&msg, 56);
        msg[4] = 0xAB ^ ((crc >> 16) & 0xFF) as u8;
        msg[5] = 0xCD ^ ((crc >> 8) & 0xFF) as u8;
        msg[6] = 0xEF ^ (crc & 0xFF) as u8;

        let mm = decode_frame(&msg, DecodeOptions::default(), &mut cache, 1_010).unwrap();
        assert!(mm.crc_ok);
        assert_eq!(mm.icao, [0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn ap_recovery_miss_without_seed() {
        let mut cache = IcaoRecencyCache::new();
        let mut msg = vec![4u8 << 3, 0, 0, 0, 0, 0, 0];
        let crc = crc::checksum(&msg, 56);
        msg[4] = 0xAB ^ ((crc >> 16) & 0xFF) as u8;
        msg[5] = 0xCD ^ ((crc >> 8) & 0xFF) as u8;
        msg[6] = 0xEF ^ (crc & 0xFF) as u8;

        let mm = decode_frame(&msg, DecodeOptions::default(), &mut cache, 1_010).unwrap();
        assert!(!mm.crc_ok);
    }

    #[test]
    fn single_bit_repair_does_not_seed_cache() {
        let mut cache = IcaoRecencyCache::new();
        let mut bytes = hex_decode("8D4840D6202CC371C32CE0576098").unwrap();
        bytes[4] ^= 1 << 2; // flip bit 37
        let mm = decode_frame(&bytes, DecodeOptions::default(), &mut cache, 1_000).unwrap();
        assert_eq!(mm.error_bit, 37);
        assert!(mm.crc_ok);
        assert!(!cache.contains_recent(&mm.icao, 1_000));
    }

    #[test]
    fn squawk_is_populated_outside_df5_df21() {
        // DF4 (altitude reply) carries the same 13-bit identity field as
        // DF5/DF21; the SBS formatter's DF4 emergency check depends on it
        // being decoded regardless of DF.
        let mut cache = IcaoRecencyCache::new();
        cache.insert(&[0xAB, 0xCD, 0xEF], 1_000);
        let mut msg = vec![4u8 << 3, 0, 0, 0, 0, 0, 0];
        let crc = crc::checksum(&msg, 56);
        msg[4] = 0xAB ^ ((crc >> 16) & 0xFF) as u8;
        msg[5] = 0xCD ^ ((crc >> 8) & 0xFF) as u8;
        msg[6] = 0xEF ^ (crc & 0xFF) as u8;

        let mm = decode_frame(&msg, DecodeOptions::default(), &mut cache, 1_010).unwrap();
        assert_eq!(mm.downlink_format, 4);
        assert!(mm.squawk.is_some());
    }

    #[test]
    fn short_buffer_is_an_invalid_length_error() {
        let mut cache = IcaoRecencyCache::new();
        let err = decode_frame(&[0x20, 0x00], DecodeOptions::default(), &mut cache, 1_000)
            .unwrap_err();
        assert!(matches!(err, crate::types::AdsbError::InvalidLength { expected: 56, actual: 16 }));
    }

    #[test]
    fn bit_length_matches_df() {
        let mut cache = IcaoRecencyCache::new();
        let mm = decode_hex(
            "8D4840D6202CC371C32CE0576098",
            DecodeOptions::default(),
            &mut cache,
        );
        assert_eq!(mm.bit_length, 112);
    }
}
