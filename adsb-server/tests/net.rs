//! Integration tests for the TCP fan-out services in `net`, driven over
//! real loopback `TcpStream`s rather than calling the accept loops directly.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

use adsb_server::net;
use adsb_server::Work;

async fn loopback() -> (TcpListener, std::net::SocketAddr) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn broadcast_sink_fans_a_line_out_to_a_connected_client() {
    let (listener, addr) = loopback().await;
    let (tx, _rx) = broadcast::channel::<String>(16);
    tokio::spawn(net::serve_broadcast_sink("test-sink", listener, tx.clone()));

    let mut client = TcpStream::connect(addr).await.unwrap();
    // give the accept loop a moment to register the subscription before we publish
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send("*8D4840D6202CC371C32CE0576098;".to_string()).unwrap();

    let mut reader = BufReader::new(&mut client);
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("timed out waiting for broadcast line")
        .unwrap();
    assert_eq!(line.trim_end(), "*8D4840D6202CC371C32CE0576098;");
}

#[tokio::test]
async fn broadcast_sink_serves_multiple_clients_independently() {
    let (listener, addr) = loopback().await;
    let (tx, _rx) = broadcast::channel::<String>(16);
    tokio::spawn(net::serve_broadcast_sink("test-sink", listener, tx.clone()));

    let mut a = TcpStream::connect(addr).await.unwrap();
    let mut b = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send("hello".to_string()).unwrap();

    for client in [&mut a, &mut b] {
        let mut reader = BufReader::new(client);
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
            .await
            .expect("timed out waiting for broadcast line")
            .unwrap();
        assert_eq!(line.trim_end(), "hello");
    }
}

#[tokio::test]
async fn raw_in_feeds_a_frame_from_a_client_into_the_work_channel() {
    let (listener, addr) = loopback().await;
    let (work_tx, mut work_rx) = mpsc::channel::<Work>(8);
    tokio::spawn(net::serve_raw_in(listener, work_tx));

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"*8D4840D6202CC371C32CE0576098;\n")
        .await
        .unwrap();

    let work = tokio::time::timeout(Duration::from_secs(2), work_rx.recv())
        .await
        .expect("timed out waiting for Work::Frame")
        .expect("channel closed");
    match work {
        Work::Frame(bytes) => assert_eq!(bytes.len(), 14),
        _ => panic!("expected Work::Frame"),
    }
}

#[tokio::test]
async fn raw_in_ignores_malformed_lines_without_closing_the_connection() {
    let (listener, addr) = loopback().await;
    let (work_tx, mut work_rx) = mpsc::channel::<Work>(8);
    tokio::spawn(net::serve_raw_in(listener, work_tx));

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"not-a-frame\n").await.unwrap();
    client
        .write_all(b"*8D4840D6202CC371C32CE0576098;\n")
        .await
        .unwrap();

    let work = tokio::time::timeout(Duration::from_secs(2), work_rx.recv())
        .await
        .expect("timed out waiting for Work::Frame")
        .expect("channel closed");
    assert!(matches!(work, Work::Frame(_)));
}

#[tokio::test]
async fn http_serves_data_json_from_a_json_query() {
    let (listener, addr) = loopback().await;
    let (work_tx, mut work_rx) = mpsc::channel::<Work>(8);
    tokio::spawn(net::serve_http(listener, "gmap.html".into(), work_tx));

    tokio::spawn(async move {
        while let Some(work) = work_rx.recv().await {
            if let Work::JsonQuery(reply) = work {
                let _ = reply.send("[]".to_string());
            }
        }
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /data.json HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(
        Duration::from_secs(2),
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut response),
    )
    .await
    .expect("timed out waiting for HTTP response")
    .unwrap();

    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.1 200 OK"));
    assert!(text.contains("application/json"));
    assert!(text.ends_with("[]"));
}
