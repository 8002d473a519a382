//! The single point of sequential processing: owns the ICAO cache and the
//! aircraft table, and folds one hex line at a time into tracker state and
//! the fan-out sinks. Nothing else touches `Tracker` or `IcaoRecencyCache`,
//! so none of it needs locking.

use adsb_core::{
    decode_frame, hex_decode, AdsbError, DecodeOptions, DecodedMessage, IcaoRecencyCache, Tracker,
};

use crate::formatters;

/// Strip `*` / `;` framing and whitespace, matching the reference decoder's
/// `hexToBin`: malformed lines (bad bracketing, odd digit count, too long,
/// non-hex characters) are rejected with `AdsbError::InvalidHex`. Callers
/// log and skip rather than treat this as fatal — a single garbled line on
/// the wire doesn't bring the ingest loop down.
pub fn parse_hex_record(line: &str) -> Result<Vec<u8>, AdsbError> {
    let trimmed = line.trim();
    let body = trimmed
        .strip_prefix('*')
        .and_then(|s| s.strip_suffix(';'))
        .ok_or_else(|| AdsbError::InvalidHex(trimmed.to_string()))?;
    if body.is_empty() || body.len() % 2 != 0 || body.len() > 28 {
        return Err(AdsbError::InvalidHex(body.to_string()));
    }
    hex_decode(body)
}

pub struct Engine {
    pub cache: IcaoRecencyCache,
    pub tracker: Tracker,
    pub opts: DecodeOptions,
    pub metric: bool,
    pub decoded_count: u64,
}

impl Engine {
    pub fn new(opts: DecodeOptions, check_crc: bool, ttl_seconds: u64, metric: bool) -> Self {
        Engine {
            cache: IcaoRecencyCache::new(),
            tracker: Tracker::new(check_crc, ttl_seconds),
            opts,
            metric,
            decoded_count: 0,
        }
    }

    /// Decode one raw byte frame and fold it into the tracker. Returns the
    /// decoded message and, if it wasn't dropped for failing `check_crc`,
    /// the aircraft's ICAO key.
    pub fn process_frame(
        &mut self,
        bytes: &[u8],
        now_epoch_s: u64,
        now_ms: i64,
    ) -> Option<(DecodedMessage, Option<u32>)> {
        let mm = decode_frame(bytes, self.opts, &mut self.cache, now_epoch_s).ok()?;
        self.decoded_count += 1;
        let key = self.tracker.ingest(&mm, now_epoch_s, now_ms);
        Some((mm, key))
    }

    pub fn sbs_line(&self, mm: &DecodedMessage, key: Option<u32>) -> Option<String> {
        let aircraft = key.and_then(|k| self.tracker.get(k));
        formatters::sbs_line(mm, aircraft)
    }

    pub fn trajectory_line(&self, key: Option<u32>, now_epoch_s: u64) -> Option<String> {
        let aircraft = key.and_then(|k| self.tracker.get(k))?;
        formatters::trajectory_line(aircraft, self.metric, now_epoch_s)
    }

    pub fn json_snapshot(&self) -> String {
        let rows = formatters::aircraft_snapshot(self.tracker.iter().map(|(_, a)| a), self.metric);
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }
}
