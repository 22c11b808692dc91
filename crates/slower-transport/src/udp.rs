use std::io;
use std::net::{IpAddr, SocketAddr, SocketAddrV6, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use slower_codec::SLOWER_MTU;
use thiserror::Error;
use tracing::{debug, warn};

use crate::adapter::{TransportAdapter, TransportHealthSnapshot};

/// Port assumed when a relay endpoint does not name one.
pub const DEFAULT_PORT: u16 = 5004;
/// How long a single `recv` waits before yielding `None`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum UdpAdapterError {
    #[error("failed to bind udp socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("udp socket error: {0}")]
    Io(#[from] io::Error),
    #[error("payload exceeds max payload hint ({hint} bytes)")]
    PayloadTooLarge { hint: usize },
    #[error("short write: sent {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },
    #[error("invalid endpoint `{0}`, expected host[:port]")]
    InvalidPeer(String),
    #[error("failed to resolve `{entry}`: {reason}")]
    Resolve { entry: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpAdapterConfig {
    pub bind_addr: SocketAddr,
    pub poll_interval: Duration,
    pub max_datagram: usize,
}

impl UdpAdapterConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_datagram: SLOWER_MTU,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Single-socket UDP transport. Peers are remote socket addresses.
#[derive(Debug)]
pub struct UdpAdapter {
    socket: UdpSocket,
    ipv6_socket: bool,
    max_datagram: usize,
    recv_buf: Vec<u8>,
    send_ok: u64,
    send_err: u64,
    recv_ok: u64,
    recv_dropped: u64,
    last_error: Option<String>,
}

impl UdpAdapter {
    pub fn bind(config: UdpAdapterConfig) -> Result<Self, UdpAdapterError> {
        let socket = UdpSocket::bind(config.bind_addr).map_err(|source| UdpAdapterError::Bind {
            addr: config.bind_addr,
            source,
        })?;
        socket.set_read_timeout(Some(config.poll_interval.max(MIN_POLL_INTERVAL)))?;
        debug!(
            bind = %config.bind_addr,
            poll_ms = config.poll_interval.as_millis() as u64,
            "udp socket bound"
        );
        Ok(Self {
            socket,
            ipv6_socket: config.bind_addr.is_ipv6(),
            max_datagram: config.max_datagram,
            // One spare byte so oversized datagrams are detected instead of silently truncated.
            recv_buf: vec![0; config.max_datagram + 1],
            send_ok: 0,
            send_err: 0,
            recv_ok: 0,
            recv_dropped: 0,
            last_error: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, UdpAdapterError> {
        Ok(self.socket.local_addr()?)
    }

    /// Address handed to the socket for `peer`. An IPv6 socket reaches IPv4
    /// peers through their mapped form.
    fn wire_addr(&self, peer: &SocketAddr) -> SocketAddr {
        match peer {
            SocketAddr::V4(v4) if self.ipv6_socket => {
                SocketAddr::V6(SocketAddrV6::new(v4.ip().to_ipv6_mapped(), v4.port(), 0, 0))
            }
            _ => *peer,
        }
    }

    fn record_send_error(&mut self, err: &UdpAdapterError) {
        self.send_err += 1;
        self.last_error = Some(err.to_string());
    }
}

impl TransportAdapter for UdpAdapter {
    type Peer = SocketAddr;
    type Error = UdpAdapterError;

    fn send(&mut self, peer: &Self::Peer, bytes: &[u8]) -> Result<(), Self::Error> {
        if bytes.len() > self.max_datagram {
            let err = UdpAdapterError::PayloadTooLarge {
                hint: self.max_datagram,
            };
            self.record_send_error(&err);
            return Err(err);
        }
        match self.socket.send_to(bytes, self.wire_addr(peer)) {
            Ok(sent) if sent == bytes.len() => {
                self.send_ok += 1;
                Ok(())
            }
            Ok(sent) => {
                let err = UdpAdapterError::ShortWrite {
                    sent,
                    expected: bytes.len(),
                };
                self.record_send_error(&err);
                Err(err)
            }
            Err(source) => {
                let err = UdpAdapterError::Io(source);
                self.record_send_error(&err);
                Err(err)
            }
        }
    }

    fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)> {
        match self.socket.recv_from(&mut self.recv_buf) {
            Ok((0, from)) => {
                debug!(peer = %from, "ignoring empty datagram");
                self.recv_dropped += 1;
                None
            }
            Ok((len, from)) if len > self.max_datagram => {
                warn!(peer = %from, len, "dropping oversized datagram");
                self.recv_dropped += 1;
                None
            }
            Ok((len, from)) => {
                self.recv_ok += 1;
                Some((canonical_addr(from), self.recv_buf[..len].to_vec()))
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                None
            }
            Err(err) => {
                // ICMP port-unreachable from an earlier send surfaces here on some platforms.
                warn!(error = %err, "udp receive failed");
                self.recv_dropped += 1;
                self.last_error = Some(err.to_string());
                None
            }
        }
    }

    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot {
            outbound_send_ok: self.send_ok,
            outbound_send_err: self.send_err,
            inbound_received: self.recv_ok,
            inbound_dropped: self.recv_dropped,
            last_error: self.last_error.clone(),
        }
    }
}

/// Folds IPv4-mapped IPv6 addresses back to plain IPv4 so one host has one
/// peer identity whichever socket family observed it.
pub fn canonical_addr(addr: SocketAddr) -> SocketAddr {
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}

/// Resolves a relay endpoint written as `ip`, `ip:port`, `host` or `host:port`.
///
/// A missing port falls back to `default_port`. When a hostname resolves to
/// several addresses the first IPv4 one is preferred. The result is in
/// [`canonical_addr`] form, matching senders reported by [`UdpAdapter`].
pub fn resolve_endpoint(entry: &str, default_port: u16) -> Result<SocketAddr, UdpAdapterError> {
    resolve_raw(entry, default_port).map(canonical_addr)
}

fn resolve_raw(entry: &str, default_port: u16) -> Result<SocketAddr, UdpAdapterError> {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return Err(UdpAdapterError::InvalidPeer(entry.to_string()));
    }
    if let Ok(addr) = trimmed.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
    {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let (host, port) = match trimmed.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| UdpAdapterError::InvalidPeer(entry.to_string()))?;
            (host, port)
        }
        None => (trimmed, default_port),
    };
    if host.is_empty() {
        return Err(UdpAdapterError::InvalidPeer(entry.to_string()));
    }

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|err| UdpAdapterError::Resolve {
            entry: entry.to_string(),
            reason: err.to_string(),
        })?
        .collect();
    addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .or_else(|| addrs.first().copied())
        .ok_or_else(|| UdpAdapterError::Resolve {
            entry: entry.to_string(),
            reason: "no addresses returned".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::time::{Duration, Instant};

    use super::{
        canonical_addr, resolve_endpoint, UdpAdapter, UdpAdapterConfig, UdpAdapterError,
        DEFAULT_PORT,
    };
    use crate::adapter::TransportAdapter;

    fn loopback_adapter() -> UdpAdapter {
        UdpAdapter::bind(
            UdpAdapterConfig::new(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
                .with_poll_interval(Duration::from_millis(50)),
        )
        .expect("loopback bind should succeed")
    }

    #[test]
    fn resolves_literal_addresses() {
        assert_eq!(
            resolve_endpoint("127.0.0.1:7000", DEFAULT_PORT).expect("literal"),
            SocketAddr::from(([127, 0, 0, 1], 7000))
        );
        assert_eq!(
            resolve_endpoint(" 10.0.0.2 ", DEFAULT_PORT).expect("bare ip"),
            SocketAddr::from(([10, 0, 0, 2], DEFAULT_PORT))
        );
        assert_eq!(
            resolve_endpoint("::1", 6000).expect("bare v6"),
            "[::1]:6000".parse::<SocketAddr>().expect("addr")
        );
    }

    #[test]
    fn mapped_ipv4_folds_to_plain_ipv4() {
        let mapped: SocketAddr = "[::ffff:10.0.0.9]:5004".parse().expect("addr");
        assert_eq!(canonical_addr(mapped), SocketAddr::from(([10, 0, 0, 9], 5004)));
        assert_eq!(
            resolve_endpoint("::ffff:10.0.0.9", 5004).expect("mapped literal"),
            SocketAddr::from(([10, 0, 0, 9], 5004))
        );

        let v6: SocketAddr = "[2001:db8::1]:5004".parse().expect("addr");
        assert_eq!(canonical_addr(v6), v6);
    }

    #[test]
    fn resolves_localhost_by_name() {
        let addr = resolve_endpoint("localhost", 6001).expect("localhost should resolve");
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 6001);
    }

    #[test]
    fn rejects_malformed_endpoints() {
        assert!(matches!(
            resolve_endpoint("", DEFAULT_PORT),
            Err(UdpAdapterError::InvalidPeer(_))
        ));
        assert!(matches!(
            resolve_endpoint("relay:notaport", DEFAULT_PORT),
            Err(UdpAdapterError::InvalidPeer(_))
        ));
        assert!(matches!(
            resolve_endpoint(":5004", DEFAULT_PORT),
            Err(UdpAdapterError::InvalidPeer(_))
        ));
    }

    #[test]
    fn loopback_datagram_is_delivered_with_sender() {
        let mut a = loopback_adapter();
        let mut b = loopback_adapter();
        let a_addr = a.local_addr().expect("local addr");
        let b_addr = b.local_addr().expect("local addr");

        a.send(&b_addr, b"ping").expect("send should succeed");

        let deadline = Instant::now() + Duration::from_secs(2);
        let received = loop {
            if let Some(msg) = b.recv() {
                break msg;
            }
            assert!(Instant::now() < deadline, "datagram never arrived");
        };
        assert_eq!(received, (a_addr, b"ping".to_vec()));
        assert_eq!(a.health_snapshot().outbound_send_ok, 1);
        assert_eq!(b.health_snapshot().inbound_received, 1);
    }

    #[test]
    fn idle_recv_times_out_with_none() {
        let mut adapter = loopback_adapter();
        let started = Instant::now();
        assert!(adapter.recv().is_none());
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn oversized_send_is_rejected_before_the_socket() {
        let mut adapter = loopback_adapter();
        let dest = adapter.local_addr().expect("local addr");
        let err = adapter
            .send(&dest, &vec![0; 1201])
            .expect_err("oversized send must fail");
        assert!(matches!(err, UdpAdapterError::PayloadTooLarge { hint: 1200 }));
        assert_eq!(adapter.health_snapshot().outbound_send_err, 1);
    }
}
