use pnet::packet::{
    icmp::{self, echo_request::MutableEchoRequestPacket, IcmpPacket, IcmpTypes},
    icmpv6::{Icmpv6Types, MutableIcmpv6Packet},
    Packet,
};

use crate::error::{PingError, PingResult};
use crate::target::Family;

/// Size of the echo header: type, code, checksum, identifier and sequence number
pub(super) const ECHO_HEADER_LEN: usize = 8;

/// A ping packet before send-out
///
/// Low-level wire layout of an outgoing echo request. The layout is chosen by the address family
/// of the session; both variants own their buffer so the finished bytes can be handed to any
/// transport.
#[derive(Debug)]
pub(super) enum RequestPacket {
    Icmp(MutableEchoRequestPacket<'static>),
    Icmpv6(MutableIcmpv6Packet<'static>),
}

impl RequestPacket {
    /// Create new echo request packet with room for `size` bytes of payload
    ///
    /// # Errors
    ///
    /// Only fails if the buffer were smaller than the fixed header, which cannot happen as the
    /// header length is always added on top of the payload size.
    pub fn new(family: Family, size: usize) -> PingResult<Self> {
        let buffer = vec![0u8; size + ECHO_HEADER_LEN];
        let packet = match family {
            Family::V4 => MutableEchoRequestPacket::owned(buffer)
                .map(Self::Icmp)
                .ok_or(PingError::Encode("icmp buffer too small")),
            Family::V6 => MutableIcmpv6Packet::owned(buffer)
                .map(Self::Icmpv6)
                .ok_or(PingError::Encode("icmpv6 buffer too small")),
        };
        packet.map(Self::set_to_echo_request)
    }

    /// Set the type field to echo request
    ///
    /// The type is 8 for ICMP and 128 for ICMPv6. The code stays zero from initialization.
    fn set_to_echo_request(mut self) -> Self {
        match &mut self {
            Self::Icmp(pkg) => pkg.set_icmp_type(IcmpTypes::EchoRequest),
            Self::Icmpv6(pkg) => pkg.set_icmpv6_type(Icmpv6Types::EchoRequest),
        };
        self
    }

    /// Populate identifier and sequence number and append the payload
    ///
    /// pnet only knows the generic ICMPv6 layout, so for IPv6 identifier and sequence number are
    /// written to the front of the message body by hand. The byte layout is the same for both
    /// families.
    pub fn set_header_and_payload(&mut self, id: u16, sequence: u16, payload: &[u8]) {
        match self {
            Self::Icmp(pkg) => {
                pkg.set_identifier(id);
                pkg.set_sequence_number(sequence);
                pkg.set_payload(payload);
            }
            Self::Icmpv6(pkg) => {
                let mut body = Vec::with_capacity(payload.len() + 4);
                body.extend_from_slice(&id.to_be_bytes());
                body.extend_from_slice(&sequence.to_be_bytes());
                body.extend_from_slice(payload);
                pkg.set_payload(&body);
            }
        };
    }

    /// Set the checksum field of the packet
    ///
    /// The ICMPv6 checksum covers a pseudo-header with both IP addresses, which only the kernel
    /// knows. Linux fills it in for raw ICMPv6 sockets, so it is left at zero here.
    pub fn set_checksum(&mut self) {
        match self {
            Self::Icmp(pkg) => {
                pkg.set_checksum(0);
                let checksum = IcmpPacket::new(pkg.packet()).map(|p| icmp::checksum(&p));
                if let Some(checksum) = checksum {
                    pkg.set_checksum(checksum);
                }
            }
            Self::Icmpv6(pkg) => pkg.set_checksum(0),
        };
    }
}

impl Packet for RequestPacket {
    fn packet(&self) -> &[u8] {
        match self {
            Self::Icmp(pkg) => pkg.packet(),
            Self::Icmpv6(pkg) => pkg.packet(),
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            Self::Icmp(pkg) => pkg.payload(),
            Self::Icmpv6(pkg) => pkg.payload(),
        }
    }
}
