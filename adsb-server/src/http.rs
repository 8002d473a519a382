//! The map UI's HTTP responder: parses a request line well enough to route
//! `/data.json` vs a static file, and builds the matching response.

use std::path::Path;

const CONTENT_TYPE_HTML: &str = "text/html;charset=utf-8";
const CONTENT_TYPE_JSON: &str = "application/json;charset=utf-8";

pub struct Request {
    pub url: String,
    pub keep_alive: bool,
}

/// Parse just enough of an HTTP request to route it: method, URL, and
/// whether the connection should stay open afterward.
pub fn parse_request(raw: &str) -> Option<Request> {
    let first_line = raw.lines().next()?;
    let mut parts = first_line.split(' ');
    let _method = parts.next()?;
    let url = parts.next()?.to_string();

    let http11 = first_line.contains("HTTP/1.1");
    let keep_alive = if http11 {
        !raw.contains("Connection: close")
    } else {
        raw.contains("Connection: keep-alive")
    };

    Some(Request { url, keep_alive })
}

/// Build the full response (headers + body) for a parsed request. `json`
/// supplies the `/data.json` body; `gmap_path` is read from disk for
/// everything else.
pub fn build_response(req: &Request, json: &str, gmap_path: &Path) -> Vec<u8> {
    let (content_type, body): (&str, Vec<u8>) = if req.url.contains("/data.json") {
        (CONTENT_TYPE_JSON, json.as_bytes().to_vec())
    } else {
        match std::fs::read(gmap_path) {
            Ok(bytes) => (CONTENT_TYPE_HTML, bytes),
            Err(e) => (
                CONTENT_TYPE_HTML,
                format!("Error opening HTML file: {e}").into_bytes(),
            ),
        }
    };

    let header = format!(
        "HTTP/1.1 200 OK\r\n\
         Server: Dump1090\r\n\
         Content-Type: {content_type}\r\n\
         Connection: {}\r\n\
         Content-Length: {}\r\n\
         Access-Control-Allow-Origin: *\r\n\r\n",
        if req.keep_alive { "keep-alive" } else { "close" },
        body.len(),
    );

    let mut out = header.into_bytes();
    out.extend_from_slice(&body);
    out
}
