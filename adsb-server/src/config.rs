//! CLI flags. A flat [`clap::Parser`] rather than subcommands — this
//! system models one continuous process, not a batch of one-shot actions.

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_RAW_OUT_PORT: u16 = 30002;
pub const DEFAULT_RAW_IN_PORT: u16 = 30001;
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_SBS_PORT: u16 = 30003;
pub const DEFAULT_TRAJECTORY_PORT: u16 = 30004;

#[derive(Parser, Debug)]
#[command(name = "adsb", about = "Mode S / ADS-B downlink frame decoder")]
pub struct Cli {
    /// Serial device path (`com<N>`/`COM<N>` is rewritten to `/dev/ttyS<N-1>`).
    #[arg(long = "name")]
    pub serial_name: Option<String>,

    /// Serial baud rate.
    #[arg(long, default_value_t = 3_000_000)]
    pub speed: u32,

    /// Enable serial parity.
    #[arg(long)]
    pub parity: bool,

    /// Read hex records from a file (`-` for stdin) instead of a serial device.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Enable the TCP fan-out services alongside serial/file input.
    #[arg(long)]
    pub net: bool,

    /// Enable the TCP fan-out services and skip serial/file input entirely.
    #[arg(long = "net-only")]
    pub net_only: bool,

    #[arg(long = "net-ro-port", default_value_t = DEFAULT_RAW_OUT_PORT)]
    pub net_ro_port: u16,
    #[arg(long = "net-ri-port", default_value_t = DEFAULT_RAW_IN_PORT)]
    pub net_ri_port: u16,
    #[arg(long = "net-http-port", default_value_t = DEFAULT_HTTP_PORT)]
    pub net_http_port: u16,
    #[arg(long = "net-sbs-port", default_value_t = DEFAULT_SBS_PORT)]
    pub net_sbs_port: u16,
    #[arg(long = "net-trj-port", default_value_t = DEFAULT_TRAJECTORY_PORT)]
    pub net_trj_port: u16,

    /// Disable single-bit CRC repair.
    #[arg(long = "no-fix")]
    pub no_fix: bool,

    /// Emit messages regardless of CRC outcome.
    #[arg(long = "no-crc-check")]
    pub no_crc_check: bool,

    /// Enable two-bit repair for DF17.
    #[arg(long)]
    pub aggressive: bool,

    /// Print only `*...;` raw lines.
    #[arg(long)]
    pub raw: bool,

    /// Print only the 6-hex ICAO address.
    #[arg(long)]
    pub onlyaddr: bool,

    /// Periodically print the live aircraft table.
    #[arg(long)]
    pub interactive: bool,

    #[arg(long = "interactive-rows", default_value_t = 15)]
    pub interactive_rows: usize,

    #[arg(long = "interactive-ttl", default_value_t = adsb_core::tracker::DEFAULT_TTL_SECONDS)]
    pub interactive_ttl: u64,

    /// Convert altitude to metres and speed to km/h in formatter output.
    #[arg(long)]
    pub metric: bool,

    /// With `--file`, print the decoded message count on exit.
    #[arg(long)]
    pub stats: bool,

    /// Bitmask of debug flags (subset honored: `j` writes `frames.js`).
    #[arg(long, default_value = "")]
    pub debug: String,

    /// List known aircraft types and exit (out of scope for this build).
    #[arg(long)]
    pub list: bool,

    /// Capture raw I/Q samples at the given level (out of scope for this build).
    #[arg(long)]
    pub snip: Option<u32>,
}

impl Cli {
    pub fn debug_js_sink(&self) -> bool {
        self.debug.contains('j')
    }

    pub fn rewrite_serial_name(name: &str) -> String {
        let upper = name.to_uppercase();
        if let Some(suffix) = upper.strip_prefix("COM") {
            if let Ok(n) = suffix.parse::<u32>() {
                if n > 0 {
                    return format!("/dev/ttyS{}", n - 1);
                }
            }
        }
        name.to_string()
    }
}
