//! adsb-core: Mode S / ADS-B decode and tracking.
//!
//! No async, no network I/O — just the CRC engine, the DF/ME field
//! decoders, the CPR resolver, and the aircraft tracker. Consumed by the
//! `adsb` binary in `adsb-server`, which owns ingest and the network
//! fan-out.

pub mod cpr;
pub mod crc;
pub mod decode;
pub mod frame;
pub mod icao;
pub mod tracker;
pub mod types;

pub use frame::{decode_frame, DecodeOptions};
pub use icao::IcaoRecencyCache;
pub use tracker::{Aircraft, Tracker};
pub use types::*;
