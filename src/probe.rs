use std::time::{Duration, Instant};

use crate::error::{PingError, PingResult};
use crate::interrupt::Interrupt;
use crate::packet::{EchoReply, EchoRequest};
use crate::stats::{Outcome, ProbeResult};
use crate::target::Target;
use crate::transport::{Incoming, Transport};

/// Receives block at most this long before the interrupt is checked again
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One echo request/reply exchange
///
/// The `Probe` holds everything that stays the same across the exchanges of a session: the
/// identifier that marks our packets, the payload and the time to wait for a reply.
#[derive(Debug, Clone)]
pub struct Probe {
    identifier: u16,
    payload: Vec<u8>,
    timeout: Option<Duration>,
}

impl Probe {
    /// `timeout` of `None` waits for a reply indefinitely
    pub fn new(identifier: u16, payload: Vec<u8>, timeout: Option<Duration>) -> Self {
        Self {
            identifier,
            payload,
            timeout,
        }
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Send one echo request and wait for its reply
    ///
    /// Returns the result of the exchange, or `None` if an interrupt arrived while waiting. An
    /// abandoned exchange is not recorded anywhere.
    ///
    /// Messages that are not meant for this exchange are skipped: our own requests looped back
    /// by the local host, ICMPv6 neighbor discovery and replies to earlier sequence numbers. Any
    /// other message ends the exchange, as `Other` unless it is the matching reply.
    ///
    /// # Errors
    ///
    /// Encoding, send and receive failures are passed up; they end the session.
    pub fn run_once<T: Transport>(
        &self,
        transport: &mut T,
        target: &Target,
        sequence: u64,
        interrupt: &Interrupt,
    ) -> PingResult<Option<ProbeResult>> {
        let family = target.family();

        // Only the low 16 bits travel on the wire
        let wire_sequence = sequence as u16;
        let packet = EchoRequest {
            identifier: self.identifier,
            sequence: wire_sequence,
            payload: &self.payload,
        }
        .encode(family)?;

        let departure = transport
            .send_to(&packet, target.addr())
            .map_err(PingError::Send)?;
        trace!("Sent icmp_seq={} to {}", sequence, target.addr());

        let deadline = self.timeout.map(|timeout| departure + timeout);

        loop {
            if interrupt.is_raised() {
                debug!("Abandoning icmp_seq={} on interrupt", sequence);
                return Ok(None);
            }

            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        println!("Request timeout for icmp_seq={}", sequence);
                        return Ok(Some(ProbeResult {
                            sequence,
                            elapsed: now.saturating_duration_since(departure),
                            outcome: Outcome::Lost,
                        }));
                    }
                    POLL_INTERVAL.min(deadline - now)
                }
                None => POLL_INTERVAL,
            };

            let incoming = match transport.recv_from(slice).map_err(PingError::Receive)? {
                Some(incoming) => incoming,
                None => continue,
            };

            if let Some(outcome) = self.classify(&incoming, target, wire_sequence) {
                let elapsed = incoming.arrival.saturating_duration_since(departure);
                if outcome == Outcome::Received {
                    println!(
                        "{} bytes from {}: icmp_seq={} time={:.3} ms",
                        incoming.bytes.len(),
                        incoming.source,
                        sequence,
                        elapsed.as_secs_f64() * 1000f64
                    );
                }
                return Ok(Some(ProbeResult {
                    sequence,
                    elapsed,
                    outcome,
                }));
            }
        }
    }

    /// Decide what a received message means for the current exchange
    ///
    /// Returns `None` for messages that are skipped.
    fn classify(&self, incoming: &Incoming, target: &Target, sequence: u16) -> Option<Outcome> {
        let family = target.family();
        let reply = EchoReply::parse(&incoming.bytes, incoming.source, family);

        match &reply {
            EchoReply::Matched {
                identifier,
                sequence: seq,
                payload,
                ..
            } if *identifier == self.identifier => {
                if *seq != sequence {
                    info!(
                        "Skipping stale reply icmp_seq={} while waiting for icmp_seq={}",
                        seq, sequence
                    );
                    return None;
                }

                debug!("{:?}", reply);
                debug!("Data: {:?}", String::from_utf8_lossy(payload));
                if payload[..] != self.payload[..] {
                    debug!("Reply payload differs from request payload");
                }
                Some(Outcome::Received)
            }
            _ if reply.is_echo_request(family) => {
                trace!("Skipping echo request seen on the socket");
                None
            }
            _ if reply.is_neighbor_discovery(family) => {
                trace!("Skipping {} from {}", reply.describe(family), incoming.source);
                None
            }
            _ => {
                info!(
                    "Got something else from {}: {} {:?}",
                    incoming.source,
                    reply.describe(family),
                    reply
                );
                Some(Outcome::Other)
            }
        }
    }
}
