//! Per-aircraft live state, keyed by 24-bit ICAO address.
//!
//! Pure logic, no I/O: [`Tracker::ingest`] folds a decoded frame into the
//! aircraft table and [`Tracker::age_out`] drops stale entries. Both are
//! meant to run on a single task — nothing here is `Sync`.

use std::collections::HashMap;

use crate::cpr::{self, CprFrame};
use crate::types::{icao_to_string, icao_to_u32, DecodedMessage, Icao};

/// Default staleness window: an aircraft not heard from in this many
/// seconds is dropped by `age_out`.
pub const DEFAULT_TTL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, Default)]
struct CprSnapshot {
    frame: Option<CprFrame>,
}

/// Live state for one ICAO address.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub hex_address: String,
    pub callsign: String,
    pub altitude_ft: i32,
    pub ground_speed_kts: f64,
    pub track_deg: u16,
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen_epoch_s: u64,
    pub message_count: u64,

    even: CprSnapshot,
    odd: CprSnapshot,
}

impl Aircraft {
    fn new(icao: &Icao, now_epoch_s: u64) -> Self {
        Aircraft {
            hex_address: icao_to_string(icao).to_lowercase(),
            callsign: String::new(),
            altitude_ft: 0,
            ground_speed_kts: 0.0,
            track_deg: 0,
            latitude: 0.0,
            longitude: 0.0,
            last_seen_epoch_s: now_epoch_s,
            message_count: 0,
            even: CprSnapshot::default(),
            odd: CprSnapshot::default(),
        }
    }

    /// True once a non-zero lat/lon has been resolved.
    pub fn has_position(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }
}

/// The live aircraft table.
#[derive(Default)]
pub struct Tracker {
    aircraft: HashMap<u32, Aircraft>,
    /// If true, `ingest` drops frames whose CRC didn't validate.
    pub check_crc: bool,
    pub ttl_seconds: u64,
}

impl Tracker {
    pub fn new(check_crc: bool, ttl_seconds: u64) -> Self {
        Tracker { aircraft: HashMap::new(), check_crc, ttl_seconds }
    }

    /// Fold one decoded message into the aircraft table. Returns the
    /// updated aircraft's ICAO key, or `None` if the message was dropped
    /// (bad CRC under `check_crc`).
    pub fn ingest(&mut self, mm: &DecodedMessage, now_epoch_s: u64, now_ms: i64) -> Option<u32> {
        if self.check_crc && !mm.crc_ok {
            return None;
        }

        let key = icao_to_u32(&mm.icao);
        let aircraft = self
            .aircraft
            .entry(key)
            .or_insert_with(|| Aircraft::new(&mm.icao, now_epoch_s));

        aircraft.last_seen_epoch_s = now_epoch_s;
        aircraft.message_count += 1;

        match mm.downlink_format {
            0 | 4 | 20 => {
                if let Some(alt) = mm.altitude_ft {
                    aircraft.altitude_ft = alt;
                }
            }
            17 => match mm.me_type {
                Some(mt) if (1..=4).contains(&mt) => {
                    if let Some(ident) = &mm.identification {
                        aircraft.callsign = ident.clone();
                    }
                }
                Some(mt) if (9..=18).contains(&mt) => {
                    if let Some(alt) = mm.altitude_ft {
                        aircraft.altitude_ft = alt;
                    }
                    if let Some(pos) = &mm.position {
                        let frame = CprFrame {
                            raw_lat: pos.raw_lat,
                            raw_lon: pos.raw_lon,
                            captured_at_ms: now_ms,
                        };
                        if pos.odd {
                            aircraft.odd.frame = Some(frame);
                        } else {
                            aircraft.even.frame = Some(frame);
                        }
                        if let (Some(even), Some(odd)) = (aircraft.even.frame, aircraft.odd.frame)
                        {
                            if (even.captured_at_ms - odd.captured_at_ms).unsigned_abs() <= 10_000
                            {
                                if let Some((lat, lon)) = cpr::global_decode(even, odd) {
                                    aircraft.latitude = lat;
                                    aircraft.longitude = lon;
                                }
                            }
                        }
                    }
                }
                Some(19) => {
                    if let (Some(ms), Some(v)) = (mm.me_sub, &mm.velocity) {
                        if (1..=2).contains(&ms) {
                            if let Some(speed) = v.speed_kts {
                                aircraft.ground_speed_kts = speed;
                            }
                            if let Some(heading) = v.heading_deg {
                                aircraft.track_deg = heading.round() as u16 % 360;
                            }
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }

        Some(key)
    }

    /// Drop every aircraft not heard from in more than `ttl_seconds`.
    pub fn age_out(&mut self, now_epoch_s: u64) {
        let ttl = self.ttl_seconds;
        self.aircraft
            .retain(|_, a| now_epoch_s.saturating_sub(a.last_seen_epoch_s) <= ttl);
    }

    pub fn get(&self, key: u32) -> Option<&Aircraft> {
        self.aircraft.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &Aircraft)> {
        self.aircraft.iter()
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}
