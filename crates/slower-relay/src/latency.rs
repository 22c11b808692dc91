use slower_core::timestamp::payload_latency_ms;
use slower_core::{decode_name, ShortName};

/// Delivery latency of a publication, when it is a timestamped system message.
///
/// Only names in the system namespace on the message path qualify, and the
/// payload must carry the six-byte timestamp prefix.
pub fn publish_latency_ms(name: ShortName, payload: &[u8], now_ms: u64) -> Option<u64> {
    if !decode_name(name).is_system_message() {
        return None;
    }
    payload_latency_ms(payload, now_ms)
}

#[cfg(test)]
mod tests {
    use slower_core::timestamp::stamp_payload;
    use slower_core::{encode_message_name, ShortName};

    use super::publish_latency_ms;

    #[test]
    fn system_messages_report_latency() {
        let name = encode_message_name(1, 2, 3, 4, 5).expect("in range");
        let payload = stamp_payload(10_000, b"body");
        assert_eq!(publish_latency_ms(name, &payload, 10_250), Some(250));
    }

    #[test]
    fn foreign_names_and_short_payloads_do_not() {
        let foreign = ShortName::new(0x0000_0001_0100_0000, 0);
        let payload = stamp_payload(10_000, b"body");
        assert_eq!(publish_latency_ms(foreign, &payload, 10_250), None);

        let name = encode_message_name(1, 2, 3, 4, 5).expect("in range");
        assert_eq!(publish_latency_ms(name, b"short", 10_250), None);
    }
}
