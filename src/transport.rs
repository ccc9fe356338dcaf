use pnet::packet::icmp::IcmpPacket;
use pnet::packet::icmpv6::Icmpv6Packet;
use pnet::packet::Packet;
use pnet::transport::{TransportReceiver, TransportSender};
use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::error::{PingError, PingResult};
use crate::target::Family;

/// Size of the receive buffer of the transport channel
const BUFFER_SIZE: usize = 4096;

/// Shortest receive timeout the socket can express
///
/// `SO_RCVTIMEO` has microsecond resolution, and a zero timeout means blocking forever.
const MIN_RECV_TIMEOUT: Duration = Duration::from_micros(1);

/// Round a receive timeout up to something the socket treats as a real timeout
fn socket_timeout(timeout: Duration) -> Duration {
    timeout.max(MIN_RECV_TIMEOUT)
}

/// A message handed up by the transport
///
/// `bytes` starts at the ICMP header, any IP header has already been stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub bytes: Vec<u8>,
    pub source: IpAddr,
    pub arrival: Instant,
}

/// Datagram endpoint for ICMP messages of one address family
///
/// Implementations timestamp every packet right before it is handed to the network and right
/// after it has been taken from it, so round-trip times do not include any parsing.
pub trait Transport {
    /// Send an encoded ICMP message and return the departure instant
    fn send_to(&mut self, packet: &[u8], dest: IpAddr) -> io::Result<Instant>;

    /// Wait at most `timeout` for the next ICMP message
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    fn recv_from(&mut self, timeout: Duration) -> io::Result<Option<Incoming>>;
}

/// pnet transport channel carrying ICMP or ICMPv6
///
/// The underlying raw socket is opened once and closed when the `IcmpTransport` is dropped.
pub struct IcmpTransport {
    family: Family,
    tx: TransportSender,
    rx: TransportReceiver,
}

impl IcmpTransport {
    /// Open a transport channel for `family`
    ///
    /// TTL is part of the IPv4 header. The IPv6 counterpart would be the hop limit, which pnet
    /// does not expose on this protocol layer, so `ttl` is ignored for IPv6.
    ///
    /// # Errors
    ///
    /// Opening a raw socket usually requires elevated privileges (root or `CAP_NET_RAW`). The OS
    /// error is passed on as `PingError::SocketOpen`.
    pub fn open(family: Family, ttl: Option<u8>) -> PingResult<Self> {
        use pnet::packet::ip::IpNextHeaderProtocols::{Icmp, Icmpv6};
        use pnet::transport::{self, TransportChannelType::*, TransportProtocol::*};

        trace!("Opening transport channel to transmit network packets");

        let protocol = match family {
            Family::V4 => Layer4(Ipv4(Icmp)),
            Family::V6 => Layer4(Ipv6(Icmpv6)),
        };
        let (mut tx, rx) =
            transport::transport_channel(BUFFER_SIZE, protocol).map_err(PingError::SocketOpen)?;

        if let Some(ttl) = ttl {
            match family {
                Family::V4 => {
                    info!("Set time to live: {}", ttl);
                    tx.set_ttl(ttl).map_err(PingError::SocketOpen)?;
                }
                Family::V6 => {
                    warn!("Setting TTL with IPv6 is currently not supported");
                    warn!("Continuing with your system default...");
                }
            }
        }

        Ok(Self { family, tx, rx })
    }
}

impl Transport for IcmpTransport {
    fn send_to(&mut self, packet: &[u8], dest: IpAddr) -> io::Result<Instant> {
        let invalid = || io::Error::new(io::ErrorKind::InvalidInput, "packet shorter than header");

        // Stop time and send packet out into the aether
        let departure = Instant::now();
        match self.family {
            Family::V4 => self
                .tx
                .send_to(IcmpPacket::new(packet).ok_or_else(invalid)?, dest)?,
            Family::V6 => self
                .tx
                .send_to(Icmpv6Packet::new(packet).ok_or_else(invalid)?, dest)?,
        };
        Ok(departure)
    }

    fn recv_from(&mut self, timeout: Duration) -> io::Result<Option<Incoming>> {
        use pnet::transport::{icmp_packet_iter, icmpv6_packet_iter};

        let timeout = socket_timeout(timeout);
        let received = match self.family {
            Family::V4 => icmp_packet_iter(&mut self.rx)
                .next_with_timeout(timeout)?
                .map(|(packet, source)| (packet.packet().to_vec(), source)),
            Family::V6 => icmpv6_packet_iter(&mut self.rx)
                .next_with_timeout(timeout)?
                .map(|(packet, source)| (packet.packet().to_vec(), source)),
        };
        let arrival = Instant::now();

        Ok(received.map(|(bytes, source)| Incoming {
            bytes,
            source,
            arrival,
        }))
    }
}
