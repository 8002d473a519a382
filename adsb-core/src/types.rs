//! Shared types, error enum, and the decoded message record for adsb-core.

use serde::Serialize;
use thiserror::Error;

/// Errors produced by adsb-core's real fallible entry points — parsing
/// external hex text and decoding a frame buffer. A frame that decodes but
/// fails CRC, or a CPR pair that can't resolve, is a routine outcome (a
/// field on [`DecodedMessage`], or a `None` from [`crate::cpr::global_decode`]),
/// not an error here.
#[derive(Debug, Error)]
pub enum AdsbError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    #[error("invalid frame length: expected {expected} bits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AdsbError>;

// ---------------------------------------------------------------------------
// Downlink Format metadata
// ---------------------------------------------------------------------------

/// Bit length of a message with the given Downlink Format.
///
/// DF ∈ {16,17,19,20,21} are 112 bits; everything else is 56.
pub fn df_bit_length(df: u8) -> usize {
    match df {
        16 | 17 | 19 | 20 | 21 => 112,
        _ => 56,
    }
}

/// Downlink Formats whose ICAO address is explicit in bytes 1-3.
pub const DF_EXPLICIT_ICAO: &[u8] = &[11, 17];

/// Downlink Formats eligible for Address/Parity brute-force recovery.
pub const DF_AP_RECOVERABLE: &[u8] = &[0, 4, 5, 16, 20, 21, 24];

// ---------------------------------------------------------------------------
// ICAO address helpers
// ---------------------------------------------------------------------------

/// 3-byte ICAO address. Stored as raw bytes to avoid per-frame String allocation.
pub type Icao = [u8; 3];

/// Format ICAO address as 6-char uppercase hex string.
pub fn icao_to_string(icao: &Icao) -> String {
    format!("{:02X}{:02X}{:02X}", icao[0], icao[1], icao[2])
}

/// Parse a 6-char hex string into an ICAO address.
pub fn icao_from_hex(hex: &str) -> Option<Icao> {
    if hex.len() != 6 {
        return None;
    }
    let val = u32::from_str_radix(hex, 16).ok()?;
    Some(icao_from_u32(val))
}

/// Convert ICAO bytes to u32 for numeric comparisons.
pub fn icao_to_u32(icao: &Icao) -> u32 {
    ((icao[0] as u32) << 16) | ((icao[1] as u32) << 8) | (icao[2] as u32)
}

/// Build ICAO from a 24-bit integer.
pub fn icao_from_u32(val: u32) -> Icao {
    [
        ((val >> 16) & 0xFF) as u8,
        ((val >> 8) & 0xFF) as u8,
        (val & 0xFF) as u8,
    ]
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Result<Vec<u8>> {
    let trimmed = hex.trim();
    if !trimmed.len().is_multiple_of(2) {
        return Err(AdsbError::InvalidHex(hex.to_string()));
    }
    let mut bytes = Vec::with_capacity(trimmed.len() / 2);
    for chunk in trimmed.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0]).ok_or_else(|| AdsbError::InvalidHex(hex.to_string()))?;
        let low = hex_digit(chunk[1]).ok_or_else(|| AdsbError::InvalidHex(hex.to_string()))?;
        bytes.push((high << 4) | low);
    }
    Ok(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ADS-B identification character set
// ---------------------------------------------------------------------------

/// AIS 6-bit character set used to decode DF17 TC1-4 identification fields.
pub const CALLSIGN_CHARSET: &[u8; 64] =
    b"?ABCDEFGHIJKLMNOPQRSTUVWXYZ????? ???????????????0123456789??????";

// ---------------------------------------------------------------------------
// Unit of an altitude reading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AltitudeUnit {
    Feet,
    Meters,
}

// ---------------------------------------------------------------------------
// Velocity subtype and fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpeedType {
    Ground,
    IAS,
    TAS,
}

/// DF17 TC9-18/20-22 position fields, not yet resolved to lat/lon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionFields {
    pub raw_lat: u32,
    pub raw_lon: u32,
    pub odd: bool,
    pub utc_sync: bool,
    pub altitude_ft: Option<i32>,
}

/// DF17 TC19 velocity fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityFields {
    pub speed_type: SpeedType,
    pub speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
}

/// One decoded frame. Fields outside the ones common to every Downlink
/// Format are populated only when the frame's DF/type-code calls for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    pub bytes: Vec<u8>,
    pub bit_length: usize,
    pub downlink_format: u8,
    pub crc_observed: u32,
    pub crc_ok: bool,
    /// -1 = no correction, 0..bit_length = single-bit index,
    /// `j | (i<<8)` = two-bit pair (only ever produced for 112-bit frames).
    pub error_bit: i32,
    pub icao: Icao,

    pub ca: u8,
    pub fs: u8,
    pub dr: u8,
    pub um: u8,

    pub squawk: Option<String>,
    pub altitude_ft: Option<i32>,
    pub altitude_unit: Option<AltitudeUnit>,

    pub me_type: Option<u8>,
    pub me_sub: Option<u8>,
    pub identification: Option<String>,
    pub position: Option<PositionFields>,
    pub velocity: Option<VelocityFields>,
}

impl DecodedMessage {
    pub fn was_corrected(&self) -> bool {
        self.error_bit >= 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
