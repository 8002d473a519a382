//! Wire-format renderers: raw hex echo, SBS/BaseStation text, trajectory
//! text, and the JSON map snapshot. Pure functions — no I/O, no state.

use adsb_core::{icao_to_string, Aircraft, DecodedMessage};
use serde::Serialize;

/// `*HH...HH;` — uppercase hex, no trailing newline (the caller appends one).
pub fn raw_line(mm: &DecodedMessage) -> String {
    let mut s = String::with_capacity(mm.bytes.len() * 2 + 2);
    s.push('*');
    for b in &mm.bytes {
        s.push_str(&format!("{b:02X}"));
    }
    s.push(';');
    s
}

fn status_flags(mm: &DecodedMessage) -> (i32, i32, i32, i32) {
    // alert, emergency, spi, ground — only meaningful for DF4/5/21.
    if !matches!(mm.downlink_format, 4 | 5 | 21) {
        return (0, 0, 0, 0);
    }
    let squawk = mm.squawk.as_deref().and_then(|s| s.parse::<u32>().ok());
    let emergency = matches!(squawk, Some(7500 | 7600 | 7700));
    let ground = matches!(mm.fs, 1 | 3);
    let alert = matches!(mm.fs, 2..=4);
    let spi = matches!(mm.fs, 4 | 5);
    (
        if alert { -1 } else { 0 },
        if emergency { -1 } else { 0 },
        if spi { -1 } else { 0 },
        if ground { -1 } else { 0 },
    )
}

/// One `MSG,...` BaseStation line per the DF-specific schema, or `None` for
/// DFs the format doesn't cover.
pub fn sbs_line(mm: &DecodedMessage, aircraft: Option<&Aircraft>) -> Option<String> {
    let id = icao_to_string(&mm.icao);
    let (alert, emergency, spi, ground) = status_flags(mm);
    let alt = mm.altitude_ft.unwrap_or(0);

    let line = match (mm.downlink_format, mm.me_type) {
        (0, _) => format!("MSG,5,,,{id},,,,,,,{alt},,,,,,,,,,"),
        (4, _) => format!("MSG,5,,,{id},,,,,,,{alt},,,,,,,{alert},{emergency},{spi},{ground}"),
        (5, _) => {
            let squawk = mm.squawk.as_deref().unwrap_or("");
            format!("MSG,6,,,{id},,,,,,,,,,,,,{squawk},{alert},{emergency},{spi},{ground}")
        }
        (11, _) => format!("MSG,8,,,{id},,,,,,,,,,,,,,,,,"),
        (17, Some(4)) => {
            let callsign = mm.identification.as_deref().unwrap_or("");
            format!("MSG,1,,,{id},,,,,,{callsign},,,,,,,,0,0,0,0")
        }
        (17, Some(mt)) if (9..=18).contains(&mt) => {
            let has_pos = aircraft.is_some_and(|a| a.has_position());
            if has_pos {
                let a = aircraft.unwrap();
                format!(
                    "MSG,3,,,{id},,,,,,,{alt},,,{:.5},{:.5},,,0,0,0,0",
                    a.latitude, a.longitude
                )
            } else {
                format!("MSG,3,,,{id},,,,,,,{alt},,,,,,,0,0,0,0")
            }
        }
        (17, Some(19)) if mm.me_sub == Some(1) => {
            let a = aircraft?;
            let vr = mm.velocity.as_ref().and_then(|v| v.vertical_rate_fpm).unwrap_or(0);
            format!(
                "MSG,4,,,{id},,,,,,,,{},{},,,{},,0,0,0,0",
                a.ground_speed_kts.round() as i64,
                a.track_deg,
                vr
            )
        }
        (21, _) => {
            let squawk = mm.squawk.as_deref().unwrap_or("");
            format!("MSG,6,,,{id},,,,,,,,,,,,,{squawk},{alert},{emergency},{spi},{ground}")
        }
        _ => return None,
    };
    Some(line)
}

/// `!CALLSIGN,lon,lat,alt,speed,track,seen*`. `None` if the aircraft has no
/// resolved position.
pub fn trajectory_line(a: &Aircraft, metric: bool, now_epoch_s: u64) -> Option<String> {
    if !a.has_position() {
        return None;
    }
    let (alt, speed) = convert_units(a.altitude_ft, a.ground_speed_kts, metric);
    let seen = now_epoch_s.saturating_sub(a.last_seen_epoch_s);
    Some(format!(
        "!{},{:.4},{:.4},{},{},{},{}*",
        a.callsign.trim_end(),
        a.longitude,
        a.latitude,
        alt,
        speed.round() as i64,
        a.track_deg,
        seen
    ))
}

fn convert_units(altitude_ft: i32, speed_kts: f64, metric: bool) -> (i32, f64) {
    if metric {
        ((altitude_ft as f64 / 3.2828) as i32, speed_kts * 1.852)
    } else {
        (altitude_ft, speed_kts)
    }
}

#[derive(Serialize)]
pub struct AircraftJson {
    pub hex: String,
    pub flight: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude: i32,
    pub track: u16,
    pub speed: i32,
}

/// JSON snapshot of every aircraft with a resolved position, for `/data.json`.
pub fn aircraft_snapshot<'a>(
    aircraft: impl Iterator<Item = &'a Aircraft>,
    metric: bool,
) -> Vec<AircraftJson> {
    aircraft
        .filter(|a| a.has_position())
        .map(|a| {
            let (alt, speed) = convert_units(a.altitude_ft, a.ground_speed_kts, metric);
            AircraftJson {
                hex: a.hex_address.clone(),
                flight: a.callsign.trim_end().to_string(),
                lat: a.latitude,
                lon: a.longitude,
                altitude: alt,
                track: a.track_deg,
                speed: speed.round() as i32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adsb_core::{DecodeOptions, IcaoRecencyCache};

    fn decode(hex: &str) -> DecodedMessage {
        let bytes = adsb_core::hex_decode(hex).unwrap();
        let mut cache = IcaoRecencyCache::new();
        adsb_core::decode_frame(&bytes, DecodeOptions::default(), &mut cache, 1_000).unwrap()
    }

    #[test]
    fn raw_line_round_trips_hex() {
        let mm = decode("8D4840D6202CC371C32CE0576098");
        assert_eq!(raw_line(&mm), "*8D4840D6202CC371C32CE0576098;");
    }

    #[test]
    fn sbs_identification_line() {
        let mm = decode("8D4840D6202CC371C32CE0576098");
        let line = sbs_line(&mm, None).unwrap();
        assert_eq!(line, "MSG,1,,,4840D6,,,,,,KLM1023 ,,,,,,,,0,0,0,0");
    }

    #[test]
    fn sbs_df4_emergency_squawk_sets_emerg_flag() {
        // DF4 shares the SBS emergency check with DF5/DF21, so a squawk of
        // 7500 on a DF4 frame must still set EMERG in the SBS line.
        let (byte2, byte3) = (0u16..256)
            .flat_map(|b2| (0u16..256).map(move |b3| (b2 as u8, b3 as u8)))
            .find(|&(b2, b3)| adsb_core::decode::decode_squawk(b2, b3) == 7500)
            .expect("no byte pair decodes to squawk 7500");

        let mut cache = IcaoRecencyCache::new();
        cache.insert(&[0xAB, 0xCD, 0xEF], 1_000);
        let mut msg = vec![4u8 << 3, 0, byte2, byte3, 0, 0, 0];
        let crc = adsb_core::crc::checksum(&msg, 56);
        msg[4] = 0xAB ^ ((crc >> 16) & 0xFF) as u8;
        msg[5] = 0xCD ^ ((crc >> 8) & 0xFF) as u8;
        msg[6] = 0xEF ^ (crc & 0xFF) as u8;

        let mm = adsb_core::decode_frame(&msg, DecodeOptions::default(), &mut cache, 1_010).unwrap();
        assert_eq!(mm.downlink_format, 4);
        assert_eq!(mm.squawk.as_deref(), Some("7500"));

        let line = sbs_line(&mm, None).unwrap();
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields[19], "-1", "EMERG flag should be set: {line}");
    }

    #[test]
    fn sbs_velocity_line_matches_scenario_six() {
        let mut bytes = vec![0u8; 14];
        bytes[0] = 17u8 << 3;
        bytes[1] = 0x48;
        bytes[2] = 0x40;
        bytes[3] = 0xD6;
        bytes[4] = (19u8 << 3) | 1;
        bytes[5] = 1 << 2; // ew_dir bit; high ew bits are 0
        bytes[6] = 9;
        bytes[7] = ((160u32 >> 3) & 0x7f) as u8;
        bytes[8] = (((160u32 & 7) as u8) << 5) | (1 << 3); // vr=14 fits in low 6 bits of byte 9
        bytes[9] = (14u8 << 2) & 0xfc;
        let crc = adsb_core::crc::checksum(&bytes, 112);
        bytes[11] = (crc >> 16) as u8;
        bytes[12] = (crc >> 8) as u8;
        bytes[13] = crc as u8;
        let mut msg = bytes.clone();
        msg.truncate(14);
        let mut cache = IcaoRecencyCache::new();
        let mm = adsb_core::decode_frame(&msg, DecodeOptions::default(), &mut cache, 1_000)
            .unwrap();

        let mut tracker = adsb_core::Tracker::new(false, adsb_core::tracker::DEFAULT_TTL_SECONDS);
        tracker.ingest(&mm, 1_000, 1_000_000);
        let a = tracker.get(0x4840D6).unwrap();
        assert_eq!(a.track_deg, 357);
        assert_eq!(a.ground_speed_kts.round(), 160.0);

        let line = sbs_line(&mm, Some(a)).unwrap();
        assert_eq!(line, "MSG,4,,,4840D6,,,,,,,,160,357,,,-832,,0,0,0,0");
    }

    #[test]
    fn trajectory_line_skips_unresolved_position() {
        let mm = decode("8D4840D6202CC371C32CE0576098");
        let mut tracker = adsb_core::Tracker::new(false, adsb_core::tracker::DEFAULT_TTL_SECONDS);
        tracker.ingest(&mm, 1_000, 1_000_000);
        let a = tracker.get(0x4840D6).unwrap();
        assert!(trajectory_line(a, false, 1_000).is_none());
    }
}
