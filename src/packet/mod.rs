use pnet::packet::{
    icmp::{self, echo_reply::EchoReplyPacket, IcmpPacket, IcmpType, IcmpTypes},
    icmpv6::{Icmpv6Packet, Icmpv6Type, Icmpv6Types},
    Packet,
};
use std::net::IpAddr;

use crate::error::PingResult;
use crate::target::Family;
use request::RequestPacket;

mod request;

/// An echo request before serialization
///
/// Created fresh for every probe. The sequence number on the wire is only 16 bits wide, the
/// caller passes it already truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest<'a> {
    pub identifier: u16,
    pub sequence: u16,
    pub payload: &'a [u8],
}

impl EchoRequest<'_> {
    /// Serialize into the wire layout of `family`, checksum included
    pub fn encode(&self, family: Family) -> PingResult<Vec<u8>> {
        let mut packet = RequestPacket::new(family, self.payload.len())?;
        packet.set_header_and_payload(self.identifier, self.sequence, self.payload);
        packet.set_checksum();
        Ok(packet.packet().to_vec())
    }
}

/// A received ICMP message, classified
///
/// `Matched` only says the message is an echo reply of the session's family. Whether it answers
/// one of our requests is decided by comparing identifier and sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoReply {
    Matched {
        identifier: u16,
        sequence: u16,
        payload: Vec<u8>,
        source: IpAddr,
    },
    Other {
        raw_type: u8,
        raw_code: u8,
    },
    Malformed,
}

impl EchoReply {
    /// Parse the ICMP bytes of a received message
    ///
    /// Never fails: anything that cannot be read as an ICMP message of `family` is `Malformed`.
    pub fn parse(bytes: &[u8], source: IpAddr, family: Family) -> Self {
        match family {
            Family::V4 => Self::parse_icmp(bytes, source),
            Family::V6 => Self::parse_icmpv6(bytes, source),
        }
    }

    fn parse_icmp(bytes: &[u8], source: IpAddr) -> Self {
        let packet = match IcmpPacket::new(bytes) {
            Some(packet) => packet,
            None => return EchoReply::Malformed,
        };
        if icmp::checksum(&packet) != packet.get_checksum() {
            return EchoReply::Malformed;
        }
        if packet.get_icmp_type() != IcmpTypes::EchoReply {
            return EchoReply::Other {
                raw_type: packet.get_icmp_type().0,
                raw_code: packet.get_icmp_code().0,
            };
        }

        match EchoReplyPacket::new(bytes) {
            Some(echo) => EchoReply::Matched {
                identifier: echo.get_identifier(),
                sequence: echo.get_sequence_number(),
                payload: echo.payload().to_vec(),
                source,
            },
            None => EchoReply::Malformed,
        }
    }

    fn parse_icmpv6(bytes: &[u8], source: IpAddr) -> Self {
        let packet = match Icmpv6Packet::new(bytes) {
            Some(packet) => packet,
            None => return EchoReply::Malformed,
        };
        if packet.get_icmpv6_type() != Icmpv6Types::EchoReply {
            return EchoReply::Other {
                raw_type: packet.get_icmpv6_type().0,
                raw_code: packet.get_icmpv6_code().0,
            };
        }

        // Identifier and sequence number lead the ICMPv6 message body
        let body = packet.payload();
        if body.len() < 4 {
            return EchoReply::Malformed;
        }
        EchoReply::Matched {
            identifier: u16::from_be_bytes([body[0], body[1]]),
            sequence: u16::from_be_bytes([body[2], body[3]]),
            payload: body[4..].to_vec(),
            source,
        }
    }

    /// Return `true` for echo requests, which a raw socket also sees when pinging the local host
    pub fn is_echo_request(&self, family: Family) -> bool {
        match (self, family) {
            (EchoReply::Other { raw_type, .. }, Family::V4) => {
                *raw_type == IcmpTypes::EchoRequest.0
            }
            (EchoReply::Other { raw_type, .. }, Family::V6) => {
                *raw_type == Icmpv6Types::EchoRequest.0
            }
            _ => false,
        }
    }

    /// Return `true` for ICMPv6 neighbor discovery traffic
    ///
    /// A raw ICMPv6 socket sees router and neighbor solicitations, advertisements and redirects,
    /// typically right before the first reply from an on-link host.
    pub fn is_neighbor_discovery(&self, family: Family) -> bool {
        match (self, family) {
            (EchoReply::Other { raw_type, .. }, Family::V6) => matches!(
                Icmpv6Type::new(*raw_type),
                Icmpv6Types::RouterSolicit
                    | Icmpv6Types::RouterAdvert
                    | Icmpv6Types::NeighborSolicit
                    | Icmpv6Types::NeighborAdvert
                    | Icmpv6Types::Redirect
            ),
            _ => false,
        }
    }

    /// Human readable name of the message type, for diagnostics
    pub fn describe(&self, family: Family) -> &'static str {
        match self {
            EchoReply::Matched { .. } => "echo reply",
            EchoReply::Malformed => "malformed message",
            EchoReply::Other { raw_type, .. } => match family {
                Family::V4 => describe_icmp(IcmpType::new(*raw_type)),
                Family::V6 => describe_icmpv6(Icmpv6Type::new(*raw_type)),
            },
        }
    }
}

fn describe_icmp(ty: IcmpType) -> &'static str {
    match ty {
        IcmpTypes::DestinationUnreachable => "destination unreachable",
        IcmpTypes::EchoReply => "echo reply",
        IcmpTypes::EchoRequest => "echo request",
        IcmpTypes::TimeExceeded => "time exceeded",
        IcmpTypes::ParameterProblem => "parameter problem",
        IcmpTypes::RedirectMessage => "redirect",
        _ => "unknown",
    }
}

fn describe_icmpv6(ty: Icmpv6Type) -> &'static str {
    match ty {
        Icmpv6Types::DestinationUnreachable => "destination unreachable",
        Icmpv6Types::PacketTooBig => "packet too big",
        Icmpv6Types::EchoReply => "echo reply",
        Icmpv6Types::EchoRequest => "echo request",
        Icmpv6Types::TimeExceeded => "time exceeded",
        Icmpv6Types::ParameterProblem => "parameter problem",
        Icmpv6Types::NeighborSolicit => "neighbor solicitation",
        Icmpv6Types::NeighborAdvert => "neighbor advertisement",
        _ => "unknown",
    }
}
