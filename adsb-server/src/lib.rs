//! Library surface for the `adsb` binary: the ingest engine, wire
//! formatters, HTTP routing, and TCP fan-out. `main.rs` wires these
//! together into a running process; `tests/` exercises this crate's public
//! API directly (real loopback `TcpStream`s against `net`, a real file
//! against the ingest path) without going through the binary.

pub mod config;
pub mod engine;
pub mod formatters;
pub mod http;
pub mod ingest;
pub mod net;

use tokio::sync::oneshot;

/// Units of work the single engine task consumes, in arrival order — this
/// is the one place decoded frames are processed, so no two frames are
/// ever handled concurrently.
pub enum Work {
    Frame(Vec<u8>),
    AgeOut,
    JsonQuery(oneshot::Sender<String>),
    /// The file/stdin input reader hit EOF. In pure file/stdin mode (no
    /// `--net`/`--net-only`) this ends the process, per §4.6's "when the
    /// input is a regular file and EOF is reached, set an exit flag and
    /// stop" — the age-out ticker alone would otherwise keep `work_tx`
    /// alive forever.
    InputDone,
}
