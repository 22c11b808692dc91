use slower_codec::{decode_message, encode_message, CodecError, SlowerMessage};
use slower_core::ShortName;
use thiserror::Error;

use crate::adapter::TransportAdapter;

/// One decoded inbound message tagged with the endpoint that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlowerEvent<P> {
    Publish {
        name: ShortName,
        payload: Vec<u8>,
        sender: P,
    },
    Subscribe {
        name: ShortName,
        mask_bits: u8,
        sender: P,
    },
    Unsubscribe {
        name: ShortName,
        mask_bits: u8,
        sender: P,
    },
    Ack {
        name: ShortName,
        sender: P,
    },
}

impl<P> SlowerEvent<P> {
    fn from_message(message: SlowerMessage, sender: P) -> Self {
        match message {
            SlowerMessage::Publish { name, payload } => Self::Publish {
                name,
                payload,
                sender,
            },
            SlowerMessage::Subscribe { name, mask_bits } => Self::Subscribe {
                name,
                mask_bits,
                sender,
            },
            SlowerMessage::Unsubscribe { name, mask_bits } => Self::Unsubscribe {
                name,
                mask_bits,
                sender,
            },
            SlowerMessage::Ack { name } => Self::Ack { name, sender },
        }
    }

    pub fn sender(&self) -> &P {
        match self {
            Self::Publish { sender, .. }
            | Self::Subscribe { sender, .. }
            | Self::Unsubscribe { sender, .. }
            | Self::Ack { sender, .. } => sender,
        }
    }

    pub fn name(&self) -> ShortName {
        match self {
            Self::Publish { name, .. }
            | Self::Subscribe { name, .. }
            | Self::Unsubscribe { name, .. }
            | Self::Ack { name, .. } => *name,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError<E> {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("transport send failed: {0}")]
    Send(E),
    #[error("no relay configured")]
    NoRelay,
}

/// A datagram that arrived but did not decode into a valid message.
#[derive(Debug, Error)]
#[error("malformed datagram ({len} bytes) from {sender}: {source}")]
pub struct MalformedDatagram<P> {
    pub sender: P,
    pub len: usize,
    #[source]
    pub source: CodecError,
}

/// Typed protocol endpoint over a datagram adapter.
///
/// `relays` is the default destination set for messages sent without an
/// explicit peer, mirroring how a client talks to its configured relays.
#[derive(Debug)]
pub struct SlowerConnection<A: TransportAdapter> {
    adapter: A,
    relays: Vec<A::Peer>,
}

impl<A: TransportAdapter> SlowerConnection<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            relays: Vec::new(),
        }
    }

    pub fn with_relays(adapter: A, relays: Vec<A::Peer>) -> Self {
        let mut connection = Self::new(adapter);
        for relay in relays {
            connection.add_relay(relay);
        }
        connection
    }

    /// Adds a default relay. Returns `false` if it was already present.
    pub fn add_relay(&mut self, relay: A::Peer) -> bool {
        if self.relays.contains(&relay) {
            return false;
        }
        self.relays.push(relay);
        true
    }

    pub fn relays(&self) -> &[A::Peer] {
        &self.relays
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Sends `payload` under `name` to `dest`, or to every default relay.
    ///
    /// Returns the number of datagrams handed to the transport.
    pub fn send_publish(
        &mut self,
        name: ShortName,
        payload: &[u8],
        dest: Option<&A::Peer>,
    ) -> Result<usize, ConnectionError<A::Error>> {
        let bytes = encode_message(&SlowerMessage::Publish {
            name,
            payload: payload.to_vec(),
        })?;
        match dest {
            Some(peer) => self.send_bytes(peer, &bytes).map(|()| 1),
            None => self.broadcast(&bytes),
        }
    }

    pub fn send_subscribe(
        &mut self,
        name: ShortName,
        mask_bits: u8,
    ) -> Result<usize, ConnectionError<A::Error>> {
        let bytes = encode_message(&SlowerMessage::Subscribe { name, mask_bits })?;
        self.broadcast(&bytes)
    }

    pub fn send_unsubscribe(
        &mut self,
        name: ShortName,
        mask_bits: u8,
    ) -> Result<usize, ConnectionError<A::Error>> {
        let bytes = encode_message(&SlowerMessage::Unsubscribe { name, mask_bits })?;
        self.broadcast(&bytes)
    }

    pub fn send_ack(
        &mut self,
        name: ShortName,
        dest: &A::Peer,
    ) -> Result<(), ConnectionError<A::Error>> {
        let bytes = encode_message(&SlowerMessage::Ack { name })?;
        self.send_bytes(dest, &bytes)
    }

    /// Polls the adapter once. `Ok(None)` means nothing arrived.
    pub fn receive_next(&mut self) -> Result<Option<SlowerEvent<A::Peer>>, MalformedDatagram<A::Peer>> {
        let Some((sender, bytes)) = self.adapter.recv() else {
            return Ok(None);
        };
        match decode_message(&bytes) {
            Ok(message) => Ok(Some(SlowerEvent::from_message(message, sender))),
            Err(source) => Err(MalformedDatagram {
                sender,
                len: bytes.len(),
                source,
            }),
        }
    }

    fn send_bytes(&mut self, dest: &A::Peer, bytes: &[u8]) -> Result<(), ConnectionError<A::Error>> {
        self.adapter.send(dest, bytes).map_err(ConnectionError::Send)
    }

    fn broadcast(&mut self, bytes: &[u8]) -> Result<usize, ConnectionError<A::Error>> {
        if self.relays.is_empty() {
            return Err(ConnectionError::NoRelay);
        }
        for relay in &self.relays {
            self.adapter
                .send(relay, bytes)
                .map_err(ConnectionError::Send)?;
        }
        Ok(self.relays.len())
    }
}

#[cfg(test)]
mod tests {
    use slower_codec::{decode_message, encode_message, SlowerMessage};
    use slower_core::ShortName;

    use super::{ConnectionError, SlowerConnection, SlowerEvent};
    use crate::adapter::InMemoryAdapter;

    const NAME: ShortName = ShortName::new(0x0000_8888_0100_0041, 0x0004_0200_0030_0004);

    #[test]
    fn publish_goes_to_explicit_destination_only() {
        let mut conn = SlowerConnection::with_relays(
            InMemoryAdapter::default(),
            vec!["relay-a".to_string(), "relay-b".to_string()],
        );
        let sent = conn
            .send_publish(NAME, b"hi", Some(&"client-1".to_string()))
            .expect("publish should send");
        assert_eq!(sent, 1);

        let outbound = conn.adapter_mut().take_outbound();
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].0, "client-1");
        assert_eq!(
            decode_message(&outbound[0].1).expect("decodes"),
            SlowerMessage::Publish {
                name: NAME,
                payload: b"hi".to_vec()
            }
        );
    }

    #[test]
    fn subscribe_fans_out_to_every_relay() {
        let mut conn = SlowerConnection::with_relays(
            InMemoryAdapter::default(),
            vec!["relay-a".to_string(), "relay-b".to_string(), "relay-a".to_string()],
        );
        assert_eq!(conn.relays().len(), 2);
        assert_eq!(conn.send_subscribe(NAME, 88).expect("subscribe"), 2);
        let dests: Vec<String> = conn
            .adapter_mut()
            .take_outbound()
            .into_iter()
            .map(|(dest, _)| dest)
            .collect();
        assert_eq!(dests, vec!["relay-a".to_string(), "relay-b".to_string()]);
    }

    #[test]
    fn broadcast_without_relays_fails() {
        let mut conn = SlowerConnection::new(InMemoryAdapter::default());
        assert!(matches!(
            conn.send_unsubscribe(NAME, 88),
            Err(ConnectionError::NoRelay)
        ));
    }

    #[test]
    fn invalid_messages_never_reach_the_transport() {
        let mut conn = SlowerConnection::new(InMemoryAdapter::default());
        let err = conn
            .send_publish(NAME, &[], Some(&"client-1".to_string()))
            .expect_err("empty publish must fail");
        assert!(matches!(err, ConnectionError::Codec(_)));
        assert!(conn.adapter_mut().take_outbound().is_empty());
    }

    #[test]
    fn transport_failures_surface_as_send_errors() {
        let mut adapter = InMemoryAdapter::default();
        adapter.set_fail_sends(true);
        let mut conn = SlowerConnection::new(adapter);
        let err = conn
            .send_ack(NAME, &"client-1".to_string())
            .expect_err("send should fail");
        assert!(matches!(err, ConnectionError::Send("send disabled")));
    }

    #[test]
    fn receive_decodes_events_and_reports_garbage() {
        let mut adapter = InMemoryAdapter::default();
        adapter.enqueue_inbound(
            "client-1",
            encode_message(&SlowerMessage::Subscribe {
                name: NAME,
                mask_bits: 108,
            })
            .expect("encodes"),
        );
        adapter.enqueue_inbound("client-2", vec![0xff, 0x00, 0x13]);
        let mut conn = SlowerConnection::new(adapter);

        let event = conn
            .receive_next()
            .expect("valid datagram")
            .expect("event expected");
        assert_eq!(
            event,
            SlowerEvent::Subscribe {
                name: NAME,
                mask_bits: 108,
                sender: "client-1".to_string()
            }
        );
        assert_eq!(event.sender(), "client-1");
        assert_eq!(event.name(), NAME);

        let bad = conn.receive_next().expect_err("garbage should not decode");
        assert_eq!(bad.sender, "client-2");
        assert_eq!(bad.len, 3);

        assert!(matches!(conn.receive_next(), Ok(None)));
    }
}
