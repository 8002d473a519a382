//! Input-source setup: opening the file/stdin reader and binding listening
//! sockets. Both are fatal-at-startup concerns (§6's exit-code table), so
//! they're plain functions the caller awaits directly rather than deferring
//! the failure into a detached task.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{engine, Work};

/// Open the configured input source. A failure here (bad path, permission
/// denied) is a fatal initialization error per §6, so it's awaited directly
/// in `main` rather than surfacing only once the reader task is running.
pub async fn open_input(
    file: Option<&std::path::Path>,
) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
    match file {
        Some(path) if path == std::path::Path::new("-") => Ok(Box::new(tokio::io::stdin())),
        Some(path) => Ok(Box::new(tokio::fs::File::open(path).await?)),
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

/// Read `*...;`-framed hex lines from an already-open reader until EOF,
/// forwarding each one that parses as `Work::Frame`. Malformed lines are
/// logged and skipped, not fatal.
pub async fn run_input(
    reader: Box<dyn AsyncRead + Unpin + Send>,
    work_tx: mpsc::Sender<Work>,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        match engine::parse_hex_record(&line) {
            Ok(bytes) => {
                if work_tx.send(Work::Frame(bytes)).await.is_err() {
                    break;
                }
            }
            Err(e) => debug!(error = %e, "malformed hex record"),
        }
    }
    info!("input stream closed");
    Ok(())
}

/// Bind a TCP listener or report why not; the caller treats any error as
/// fatal and exits the process rather than leaving the service silently
/// absent.
pub async fn bind_tcp(name: &'static str, port: u16) -> Result<TcpListener, ()> {
    match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => {
            info!(service = name, port, "listening");
            Ok(listener)
        }
        Err(e) => {
            tracing::error!(service = name, port, error = %e, "failed to bind listening socket");
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_input_rejects_a_missing_file() {
        match open_input(Some(std::path::Path::new("/no/such/file-xyz"))).await {
            Err(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            Ok(_) => panic!("expected a NotFound error"),
        }
    }

    #[tokio::test]
    async fn bind_tcp_reports_a_conflicting_port() {
        let held = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = held.local_addr().unwrap().port();
        // bind to 0.0.0.0 on the same port as the held 127.0.0.1 listener
        assert!(bind_tcp("test", port).await.is_err());
    }
}
