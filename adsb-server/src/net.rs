//! The five TCP fan-out services. Each runs as its own Tokio task; the
//! non-blocking `select`-over-sockets loop from the reference decoder is
//! modelled here as independent accept/read tasks plus broadcast channels,
//! per the design notes' allowance to substitute an idiomatic readiness
//! mechanism without changing the wire protocol.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::http;
use crate::Work;

/// Accept loop for a broadcast-fed output sink (raw-out, SBS-out,
/// trajectory-out): every accepted client gets its own subscription and
/// writes lines until a send fails, at which point the client is dropped.
///
/// Takes an already-bound listener: binding happens eagerly in `main`
/// before any service task is spawned, so a bind failure (port in use) is
/// fatal at startup per the exit-code table, not a silently dropped error
/// from a detached task.
pub async fn serve_broadcast_sink(name: &'static str, listener: TcpListener, tx: broadcast::Sender<String>) {
    loop {
        let (mut socket, peer) = match listener.accept().await {
            Ok(x) => x,
            Err(e) => {
                warn!(service = name, error = %e, "accept failed");
                continue;
            }
        };
        let mut rx = tx.subscribe();
        tokio::spawn(async move {
            debug!(service = name, %peer, "client connected");
            loop {
                match rx.recv().await {
                    Ok(line) => {
                        let mut out = line.into_bytes();
                        out.push(b'\n');
                        if socket.write_all(&out).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(service = name, %peer, "client disconnected");
        });
    }
}

/// Raw-in: clients feed `*...;`-delimited hex frames back into the
/// decoder, same as file/stdin input.
pub async fn serve_raw_in(listener: TcpListener, work_tx: mpsc::Sender<Work>) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(x) => x,
            Err(e) => {
                warn!(service = "raw-in", error = %e, "accept failed");
                continue;
            }
        };
        let work_tx = work_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(socket).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match crate::engine::parse_hex_record(&line) {
                        Ok(bytes) => {
                            if work_tx.send(Work::Frame(bytes)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!(%peer, error = %e, "malformed hex record"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!(%peer, error = %e, "raw-in read error");
                        break;
                    }
                }
            }
        });
    }
}

pub async fn serve_http(listener: TcpListener, gmap_path: PathBuf, work_tx: mpsc::Sender<Work>) {
    let gmap_path = Arc::new(gmap_path);
    loop {
        let (mut socket, peer) = match listener.accept().await {
            Ok(x) => x,
            Err(e) => {
                warn!(service = "http", error = %e, "accept failed");
                continue;
            }
        };
        let work_tx = work_tx.clone();
        let gmap_path = gmap_path.clone();
        tokio::spawn(async move {
            loop {
                let mut buf = Vec::with_capacity(1024);
                let request = match read_http_request(&mut socket, &mut buf).await {
                    Some(r) => r,
                    None => break,
                };
                let Some(req) = http::parse_request(&request) else { break };

                let json = if req.url.contains("/data.json") {
                    let (reply_tx, reply_rx) = oneshot::channel();
                    if work_tx.send(Work::JsonQuery(reply_tx)).await.is_err() {
                        break;
                    }
                    reply_rx.await.unwrap_or_else(|_| "[]".to_string())
                } else {
                    String::new()
                };

                let response = http::build_response(&req, &json, &gmap_path);
                if socket.write_all(&response).await.is_err() {
                    break;
                }
                if !req.keep_alive {
                    break;
                }
            }
            debug!(%peer, "http client disconnected");
        });
    }
}

async fn read_http_request(
    socket: &mut tokio::net::TcpStream,
    buf: &mut Vec<u8>,
) -> Option<String> {
    use tokio::io::AsyncReadExt;
    let mut chunk = [0u8; 512];
    loop {
        if let Some(pos) = find_subslice(buf, b"\r\n\r\n") {
            let request = String::from_utf8_lossy(&buf[..pos + 4]).to_string();
            return Some(request);
        }
        if buf.len() > 8192 {
            return None;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
