//! Millisecond send-time prefix carried by client payloads.
//!
//! Clients stamp the first six payload bytes with a big-endian Unix time in
//! milliseconds so relays and subscribers can report delivery latency.

use std::time::{SystemTime, UNIX_EPOCH};

/// Length of the timestamp prefix in bytes.
pub const TIMESTAMP_PREFIX_LEN: usize = 6;

/// Current Unix time in milliseconds.
pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Prepends the low 48 bits of `now_ms` to `body`.
pub fn stamp_payload(now_ms: u64, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(TIMESTAMP_PREFIX_LEN + body.len());
    out.extend_from_slice(&now_ms.to_be_bytes()[8 - TIMESTAMP_PREFIX_LEN..]);
    out.extend_from_slice(body);
    out
}

/// Reads the timestamp prefix, if the payload is long enough to carry one.
pub fn payload_timestamp_ms(payload: &[u8]) -> Option<u64> {
    let prefix = payload.get(..TIMESTAMP_PREFIX_LEN)?;
    Some(prefix.iter().fold(0_u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Milliseconds elapsed since the payload's stamp, saturating at zero.
pub fn payload_latency_ms(payload: &[u8], now_ms: u64) -> Option<u64> {
    payload_timestamp_ms(payload).map(|then| now_ms.saturating_sub(then))
}
