//! `adsb`: ingest Mode S / ADS-B hex frames from a file, stdin, or TCP,
//! decode and track them, and fan the results out to raw/SBS/trajectory/
//! HTTP sinks.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, warn};

use adsb_core::DecodeOptions;

use adsb_server::config::Cli;
use adsb_server::engine::Engine;
use adsb_server::ingest::{bind_tcp, open_input, run_input};
use adsb_server::net;
use adsb_server::{formatters, Work};

fn now_epoch_s() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

fn now_epoch_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Some(name) = &cli.serial_name {
        let rewritten = Cli::rewrite_serial_name(name);
        warn!(path = %rewritten, "serial input is out of scope for this build; ignoring --name");
    }
    if cli.parity {
        warn!("--parity has no effect without serial input, which this build does not support");
    }
    if cli.list {
        eprintln!("--list is out of scope for this build (no aircraft type database)");
        return std::process::ExitCode::FAILURE;
    }
    if cli.snip.is_some() {
        eprintln!("--snip is out of scope for this build (no raw I/Q capture)");
        return std::process::ExitCode::FAILURE;
    }

    let opts = DecodeOptions { fix_errors: !cli.no_fix, aggressive: cli.aggressive };
    let check_crc = !cli.no_crc_check;
    let (work_tx, mut work_rx) = mpsc::channel::<Work>(1024);

    let (raw_tx, _) = broadcast::channel::<String>(256);
    let (sbs_tx, _) = broadcast::channel::<String>(256);
    let (trj_tx, _) = broadcast::channel::<String>(256);

    // Bind every listening socket up front, synchronously: a bind failure
    // (e.g. port already in use) is a fatal initialization error (§6's exit
    // code table), so it must be observed and reported before any task is
    // spawned, not dropped silently inside a detached `JoinHandle`.
    if cli.net || cli.net_only {
        let raw_out = match bind_tcp("raw-out", cli.net_ro_port).await {
            Ok(l) => l,
            Err(()) => return std::process::ExitCode::FAILURE,
        };
        let sbs_out = match bind_tcp("sbs-out", cli.net_sbs_port).await {
            Ok(l) => l,
            Err(()) => return std::process::ExitCode::FAILURE,
        };
        let trj_out = match bind_tcp("trajectory-out", cli.net_trj_port).await {
            Ok(l) => l,
            Err(()) => return std::process::ExitCode::FAILURE,
        };
        let raw_in = match bind_tcp("raw-in", cli.net_ri_port).await {
            Ok(l) => l,
            Err(()) => return std::process::ExitCode::FAILURE,
        };
        let http_listener = match bind_tcp("http", cli.net_http_port).await {
            Ok(l) => l,
            Err(()) => return std::process::ExitCode::FAILURE,
        };

        tokio::spawn(net::serve_broadcast_sink("raw-out", raw_out, raw_tx.clone()));
        tokio::spawn(net::serve_broadcast_sink("sbs-out", sbs_out, sbs_tx.clone()));
        tokio::spawn(net::serve_broadcast_sink("trajectory-out", trj_out, trj_tx.clone()));
        tokio::spawn(net::serve_raw_in(raw_in, work_tx.clone()));
        tokio::spawn(net::serve_http(http_listener, PathBuf::from("gmap.html"), work_tx.clone()));
    }

    if !cli.net_only {
        let reader = match open_input(cli.file.as_deref()).await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "failed to open input");
                return std::process::ExitCode::FAILURE;
            }
        };
        let input_tx = work_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = run_input(reader, input_tx.clone()).await {
                warn!(error = %e, "input stream ended with an error");
            }
            let _ = input_tx.send(Work::InputDone).await;
        });
    }

    {
        let tick_tx = work_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                interval.tick().await;
                if tick_tx.send(Work::AgeOut).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(work_tx);

    let mut engine = Engine::new(opts, check_crc, cli.interactive_ttl, cli.metric);
    let debug_js_sink = cli.debug_js_sink();

    while let Some(work) = work_rx.recv().await {
        match work {
            Work::Frame(bytes) => {
                let now_s = now_epoch_s();
                let now_ms = now_epoch_ms();
                if let Some((mm, key)) = engine.process_frame(&bytes, now_s, now_ms) {
                    if cli.raw {
                        println!("{}", formatters::raw_line(&mm));
                    } else if cli.onlyaddr {
                        println!("{}", adsb_core::icao_to_string(&mm.icao));
                    }

                    let _ = raw_tx.send(formatters::raw_line(&mm));
                    if let Some(line) = engine.sbs_line(&mm, key) {
                        let _ = sbs_tx.send(line);
                    }
                    if let Some(line) = engine.trajectory_line(key, now_s) {
                        let _ = trj_tx.send(line);
                    }
                    if debug_js_sink {
                        write_debug_js(&mm);
                    }
                }
            }
            Work::AgeOut => {
                engine.tracker.age_out(now_epoch_s());
                if cli.interactive {
                    print_interactive(&engine, cli.interactive_rows);
                }
            }
            Work::JsonQuery(reply) => {
                let _ = reply.send(engine.json_snapshot());
            }
            Work::InputDone => {
                if !cli.net && !cli.net_only {
                    break;
                }
            }
        }
    }

    if cli.stats && cli.file.is_some() {
        println!("{} messages decoded", engine.decoded_count);
    }

    std::process::ExitCode::SUCCESS
}

fn print_interactive(engine: &Engine, max_rows: usize) {
    for (_, a) in engine.tracker.iter().take(max_rows) {
        println!(
            "{:<8} {:<9} {:>7} {:>5} {:>5} {:>10.4} {:>10.4}",
            a.hex_address,
            a.callsign.trim_end(),
            a.altitude_ft,
            a.ground_speed_kts.round() as i64,
            a.track_deg,
            a.latitude,
            a.longitude,
        );
    }
}

fn write_debug_js(mm: &adsb_core::DecodedMessage) {
    use std::io::Write;
    let descr = format!("DF{}", mm.downlink_format);
    let hex = mm.bytes.iter().map(|b| format!("{b:02X}")).collect::<String>();
    let line = format!(
        "frames.push({{descr: \"{descr}\", fix1: {}, fix2: {}, bits: {}, hex: \"{hex}\"}});\n",
        if mm.error_bit >= 0 { mm.error_bit } else { -1 },
        -1,
        mm.bit_length,
    );
    if let Ok(mut f) = std::fs::OpenOptions::new().create(true).append(true).open("frames.js") {
        let _ = f.write_all(line.as_bytes());
    }
}
