use crate::prelude::*;

use serde::de::DeserializeOwned;

/// Pops one complete line off the front of `buf`, without its terminator.
/// Returns `None` until a full line has arrived; the partial tail stays in
/// `buf` for the next socket read.
pub fn take_line(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buf.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buf.drain(..=end).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

/// Decodes one JSON message. Anything unparseable costs the sender its
/// connection.
pub fn decode<T: DeserializeOwned>(line: &[u8]) -> Result<T, Disconnection> {
    serde_json::from_slice(line).map_err(|e| {
        log::debug!("malformed message: {e}");
        Disconnection
    })
}
