#![allow(dead_code)]
//! Shared helpers for the end-to-end tests.

use h1_collator::{Message, MessageCollator, Mode};

/// Parse a whole stream in one call and return the completed messages.
pub fn collect(mode: Mode, input: &[u8]) -> Vec<Message> {
    let mut collator = MessageCollator::new(mode);
    collator.parse(input).expect("stream should parse")
}

/// Parse the same stream in fixed-size pieces.
pub fn collect_in_pieces(mode: Mode, input: &[u8], piece: usize) -> Vec<Message> {
    let mut collator = MessageCollator::new(mode);
    let mut messages = Vec::new();
    for chunk in input.chunks(piece) {
        messages.extend(collator.parse(chunk).expect("piece should parse"));
    }
    messages
}

/// A request with a Content-Length body.
pub fn request_with_body(path: &str, body: &str) -> Vec<u8> {
    format!(
        "POST {path} HTTP/1.1\r\nHost: example.com\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

/// A chunked response built from (extension-line, data) pairs and
/// terminated with the zero chunk.
pub fn chunked_response(chunks: &[(&str, &str)]) -> Vec<u8> {
    let mut out = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    for (ext, data) in chunks {
        out.extend_from_slice(format!("{:x}{ext}\r\n", data.len()).as_bytes());
        out.extend_from_slice(data.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}
