//! Global CPR (Compact Position Reporting) decode.
//!
//! ADS-B airborne position reports never carry an absolute lat/lon — each
//! report is 17 bits of latitude and 17 of longitude within one of two
//! (odd/even) overlapping grids. A pair of reports, one of each parity,
//! pins down the aircraft's zone unambiguously; this is the "global"
//! decode, as opposed to a local decode relative to a known reference
//! position (not implemented here — nothing in this system tracks a
//! receiver position to decode against).

/// CPR coordinates are 17-bit values, i.e. `0..2^17`.
const CPR_SCALE: f64 = 131_072.0; // 2^17

const AIR_DLAT_EVEN: f64 = 360.0 / 60.0;
const AIR_DLAT_ODD: f64 = 360.0 / 59.0;

/// Always-positive remainder, needed because CPR's zone arithmetic wraps.
fn modulo(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r < 0.0 {
        r + b
    } else {
        r
    }
}

/// Number of CPR longitude zones (`NL`) for a latitude, from the
/// precomputed 58-step staircase of 1090-WP-9-14. Symmetric about the
/// equator; returns 1 near the poles, 59 at the equator.
pub fn nl(lat: f64) -> i32 {
    let lat = lat.abs();
    const THRESHOLDS: [(f64, i32); 58] = [
        (10.47047130, 59), (14.82817437, 58), (18.18626357, 57), (21.02939493, 56),
        (23.54504487, 55), (25.82924707, 54), (27.93898710, 53), (29.91135686, 52),
        (31.77209708, 51), (33.53993436, 50), (35.22899598, 49), (36.85025108, 48),
        (38.41241892, 47), (39.92256684, 46), (41.38651832, 45), (42.80914012, 44),
        (44.19454951, 43), (45.54626723, 42), (46.86733252, 41), (48.16039128, 40),
        (49.42776439, 39), (50.67150166, 38), (51.89342469, 37), (53.09516153, 36),
        (54.27817472, 35), (55.44378444, 34), (56.59318756, 33), (57.72747354, 32),
        (58.84763776, 31), (59.95459277, 30), (61.04917774, 29), (62.13216659, 28),
        (63.20427479, 27), (64.26616523, 26), (65.31845310, 25), (66.36171008, 24),
        (67.39646774, 23), (68.42322022, 22), (69.44242631, 21), (70.45451075, 20),
        (71.45986473, 19), (72.45884545, 18), (73.45177442, 17), (74.43893416, 16),
        (75.42056257, 15), (76.39684391, 14), (77.36789461, 13), (78.33374083, 12),
        (79.29428225, 11), (80.24923213, 10), (81.19801349, 9), (82.13956981, 8),
        (83.07199445, 7), (83.99173563, 6), (84.89166191, 5), (85.75541621, 4),
        (86.53536998, 3), (87.00000000, 2),
    ];
    for (threshold, value) in THRESHOLDS {
        if lat < threshold {
            return value;
        }
    }
    1
}

fn n_zones(lat: f64, odd: bool) -> i32 {
    (nl(lat) - odd as i32).max(1)
}

fn dlon(lat: f64, odd: bool) -> f64 {
    360.0 / n_zones(lat, odd) as f64
}

/// One airborne-position report's CPR payload, as captured by the tracker.
#[derive(Debug, Clone, Copy)]
pub struct CprFrame {
    pub raw_lat: u32,
    pub raw_lon: u32,
    pub captured_at_ms: i64,
}

/// Resolve an odd/even pair into an absolute lat/lon.
///
/// Returns `None` if the pair straddles a CPR zone boundary (`NL` differs
/// between the two candidate latitudes) or if they're more than 10 s apart
/// — the caller is expected to have already checked the latter, but the
/// guard is repeated here since it's part of the decode's correctness, not
/// just a tracker policy.
pub fn global_decode(even: CprFrame, odd: CprFrame) -> Option<(f64, f64)> {
    if (even.captured_at_ms - odd.captured_at_ms).unsigned_abs() > 10_000 {
        return None;
    }

    let lat_even = even.raw_lat as f64;
    let lon_even = even.raw_lon as f64;
    let lat_odd = odd.raw_lat as f64;
    let lon_odd = odd.raw_lon as f64;

    let j = ((59.0 * lat_even - 60.0 * lat_odd) / CPR_SCALE + 0.5).floor();
    let mut rlat_even = AIR_DLAT_EVEN * (modulo(j, 60.0) + lat_even / CPR_SCALE);
    let mut rlat_odd = AIR_DLAT_ODD * (modulo(j, 59.0) + lat_odd / CPR_SCALE);
    if rlat_even >= 270.0 {
        rlat_even -= 360.0;
    }
    if rlat_odd >= 270.0 {
        rlat_odd -= 360.0;
    }

    if nl(rlat_even) != nl(rlat_odd) {
        return None;
    }

    // The newer packet decides which grid resolves the longitude; ties
    // favor the odd frame (strict `>`, matching decodeCPR()).
    let (lat, lon) = if even.captured_at_ms > odd.captured_at_ms {
        let ni = n_zones(rlat_even, false);
        let m = (lon_even * (nl(rlat_even) - 1) as f64 - lon_odd * nl(rlat_even) as f64) / CPR_SCALE
            + 0.5;
        let lon = dlon(rlat_even, false) * (modulo(m.floor(), ni as f64) + lon_even / CPR_SCALE);
        (rlat_even, lon)
    } else {
        let ni = n_zones(rlat_odd, true);
        let m = (lon_even * (nl(rlat_odd) - 1) as f64 - lon_odd * nl(rlat_odd) as f64) / CPR_SCALE
            + 0.5;
        let lon = dlon(rlat_odd, true) * (modulo(m.floor(), ni as f64) + lon_odd / CPR_SCALE);
        (rlat_odd, lon)
    };

    let lon = if lon > 180.0 { lon - 360.0 } else { lon };
    Some((lat, lon))
}
