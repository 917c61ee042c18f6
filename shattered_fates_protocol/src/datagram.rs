// Datagram payload encoding.
//
// Payloads are UTF-8 text. Decoding never fails: invalid byte sequences are
// dropped (not replaced with U+FFFD), so a corrupted datagram degrades into
// shorter text rather than an error. Whether that text still parses as a
// frame is the receiver's problem.

/// Receive buffer size. Larger datagrams are truncated by the OS.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Encode text as a datagram payload.
pub fn encode(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Decode a datagram payload, skipping invalid UTF-8 sequences.
pub fn decode(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}
