use rand::Rng;
use std::process;
use std::time::{Duration, Instant};

use super::Config;
use crate::error::{PingError, PingResult};
use crate::interrupt::Interrupt;
use crate::probe::Probe;
use crate::stats::{Ledger, Summary};
use crate::target::Target;
use crate::transport::{IcmpTransport, Transport};

/// Meta information about ping session
#[derive(Debug)]
struct Meta {
    count: Option<u64>,
    interval: Duration,
    ttl: Option<u8>,
}

/// Outcome of a ping session
///
/// The summary is always present, also when the session ended on an interrupt or a transport
/// error. It then covers the probes completed up to that point.
#[derive(Debug)]
pub struct Report {
    pub summary: Summary,
    pub error: Option<PingError>,
}

/// Sender context
///
/// Drives the probes of one session one after another: a new echo request is only sent once the
/// previous exchange has finished, so identifier and sequence number are enough to pair replies
/// with requests.
#[derive(Debug)]
pub struct Sender {
    meta: Meta,
    target: Target,
    probe: Probe,
}

impl Sender {
    /// Create new Sender context from provided configuration
    ///
    /// Resolves the destination once; for the rest of the session only the resolved address
    /// matters, the host name is kept for display. The low 16 bits of the process id serve as
    /// identifier, the payload is random but the same for every packet of the session.
    ///
    /// # Errors
    ///
    /// Fails if the destination cannot be resolved to an address of the requested family.
    pub fn new(config: Config) -> PingResult<Self> {
        let target = Target::resolve(&config.dest, config.family)?;

        let mut payload = vec![0u8; config.size];
        rand::thread_rng().fill(&mut payload[..]);
        let probe = Probe::new(process::id() as u16, payload, config.timeout);

        let meta = Meta {
            count: config.count,
            interval: config.interval,
            ttl: config.ttl,
        };

        Ok(Self {
            meta,
            target,
            probe,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Line announcing the session, printed before the first probe
    pub fn banner(&self) -> String {
        format!(
            "PING {} ({}): {} data bytes",
            self.target.host(),
            self.target.addr(),
            self.probe.payload_len()
        )
    }

    /// Open the ICMP transport matching the target's address family
    pub fn open_transport(&self) -> PingResult<IcmpTransport> {
        IcmpTransport::open(self.target.family(), self.meta.ttl)
    }

    /// Send a sequence of echo requests
    ///
    /// The first probe goes out immediately. Each following probe starts one interval after the
    /// start of the previous one, or right away if the previous exchange took longer than that.
    /// The session ends when the count is reached, on interrupt, or on the first transport error.
    ///
    /// Whatever ends the session, the returned report carries the statistics over all completed
    /// probes.
    pub fn ping<T: Transport>(&self, transport: &mut T, interrupt: &Interrupt) -> Report {
        trace!("Start ping session");

        let mut ledger = Ledger::new();
        let error = self.probe_loop(transport, interrupt, &mut ledger).err();

        trace!("Draining ping session after {} probes", ledger.results().len());

        Report {
            summary: Summary {
                host: self.target.host().to_string(),
                statistics: ledger.summarize(),
            },
            error,
        }
    }

    fn probe_loop<T: Transport>(
        &self,
        transport: &mut T,
        interrupt: &Interrupt,
        ledger: &mut Ledger,
    ) -> PingResult<()> {
        let mut sequence = 0u64;

        while !interrupt.is_raised() {
            let start = Instant::now();
            match self
                .probe
                .run_once(transport, &self.target, sequence, interrupt)?
            {
                Some(result) => ledger.record(result),
                None => break,
            }

            sequence += 1;
            if self.meta.count.map_or(false, |count| sequence >= count) {
                break;
            }

            if let Some(rest) = self.meta.interval.checked_sub(start.elapsed()) {
                if interrupt.wait(rest) {
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Outcome, RoundTrip};
    use crate::target::Family;
    use crate::transport::tests::{Script, ScriptedTransport};
    use std::net::{IpAddr, Ipv4Addr};

    fn sender(count: Option<u64>, interval: Duration) -> Sender {
        Sender {
            meta: Meta {
                count,
                interval,
                ttl: None,
            },
            target: Target::new("example.com", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))),
            probe: Probe::new(0x4242, b"FOO".to_vec(), Some(Duration::from_millis(100))),
        }
    }

    fn replies(millis: &[u64]) -> Vec<Script> {
        millis
            .iter()
            .map(|&ms| Script::Reply(Duration::from_millis(ms)))
            .collect()
    }

    #[test]
    fn create_sender_from_config() {
        let config = Config {
            dest: "127.0.0.1".to_string(),
            family: Family::V4,
            count: Some(3),
            interval: Duration::from_millis(500),
            timeout: None,
            ttl: Some(50),
            size: 56,
            debug: false,
        };

        let sender = Sender::new(config).expect("Failed configuring sender");

        assert_eq!(sender.target().addr(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(sender.meta.count, Some(3));
        assert_eq!(sender.meta.interval, Duration::from_millis(500));
        assert_eq!(sender.meta.ttl, Some(50));
        assert_eq!(sender.banner(), "PING 127.0.0.1 (127.0.0.1): 56 data bytes");
    }

    #[test]
    fn create_sender_for_missing_family() {
        let config = Config {
            dest: "127.0.0.1".to_string(),
            family: Family::V6,
            count: None,
            interval: Duration::from_secs(1),
            timeout: None,
            ttl: None,
            size: 56,
            debug: false,
        };

        assert!(matches!(
            Sender::new(config),
            Err(PingError::NoAddressForFamily { .. })
        ));
    }

    #[test]
    fn three_immediate_replies() {
        let mut transport = ScriptedTransport::new(Family::V4, replies(&[10, 20, 30]));
        let (_trigger, interrupt) = Interrupt::channel();

        let report = sender(Some(3), Duration::from_secs(0)).ping(&mut transport, &interrupt);
        let stats = &report.summary.statistics;

        assert!(report.error.is_none());
        assert_eq!(stats.sent, 3);
        assert_eq!(stats.received, 3);
        assert_eq!(stats.loss_percent, 0.0);
        assert_eq!(
            stats.round_trip,
            Some(RoundTrip {
                min: Duration::from_millis(10),
                avg: Duration::from_millis(20),
                max: Duration::from_millis(30),
            })
        );
        assert_eq!(
            report.summary.to_string(),
            "--- example.com ping statistics ---\n\
             3 packets transmitted, 3 packets received, 0.0% packet loss\n\
             round-trip min/avg/max = 10.000/20.000/30.000 ms"
        );
    }

    #[test]
    fn count_bounds_sequence() {
        let mut transport = ScriptedTransport::new(
            Family::V4,
            vec![
                Script::Reply(Duration::from_millis(1)),
                Script::Silence,
                Script::Unreachable(Duration::from_millis(1)),
                Script::Reply(Duration::from_millis(1)),
                Script::Reply(Duration::from_millis(1)),
            ],
        );
        let (_trigger, interrupt) = Interrupt::channel();

        let sender = sender(Some(5), Duration::from_secs(0));
        let mut ledger = Ledger::new();
        sender
            .probe_loop(&mut transport, &interrupt, &mut ledger)
            .unwrap();

        let sequences: Vec<u64> = ledger.results().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);

        let outcomes: Vec<Outcome> = ledger.results().iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Received,
                Outcome::Lost,
                Outcome::Other,
                Outcome::Received,
                Outcome::Received
            ]
        );

        let stats = ledger.summarize();
        let not_received = ledger
            .results()
            .iter()
            .filter(|r| r.outcome != Outcome::Received)
            .count();
        assert_eq!(stats.received + not_received, stats.sent);
        assert_eq!(stats.loss_percent, 40.0);
        assert_eq!(transport.sent.len(), 5);
    }

    #[test]
    fn send_failure_reports_partial_statistics() {
        let mut transport = ScriptedTransport::new(Family::V4, vec![Script::SendFails]);
        let (_trigger, interrupt) = Interrupt::channel();

        let report = sender(Some(2), Duration::from_secs(0)).ping(&mut transport, &interrupt);
        let stats = &report.summary.statistics;

        assert!(matches!(report.error, Some(PingError::Send(_))));
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.received, 0);
        assert_eq!(stats.loss_percent, 0.0);
        assert_eq!(stats.round_trip, None);
    }

    #[test]
    fn receive_failure_keeps_completed_probes() {
        let mut transport = ScriptedTransport::new(
            Family::V4,
            vec![Script::Reply(Duration::from_millis(5)), Script::ReceiveFails],
        );
        let (_trigger, interrupt) = Interrupt::channel();

        let report = sender(None, Duration::from_secs(0)).ping(&mut transport, &interrupt);

        assert!(matches!(report.error, Some(PingError::Receive(_))));
        assert_eq!(report.summary.statistics.sent, 1);
        assert_eq!(report.summary.statistics.received, 1);
    }

    #[test]
    fn interrupt_before_start_sends_nothing() {
        let mut transport = ScriptedTransport::new(Family::V4, replies(&[1]));
        let (trigger, interrupt) = Interrupt::channel();
        trigger.raise();

        let report = sender(None, Duration::from_secs(0)).ping(&mut transport, &interrupt);

        assert!(report.error.is_none());
        assert_eq!(report.summary.statistics.sent, 0);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn interrupt_during_interval_stops_unbounded_session() {
        let mut transport = ScriptedTransport::new(Family::V4, replies(&[1, 1, 1]));
        let (trigger, interrupt) = Interrupt::channel();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            trigger.raise();
        });

        let start = Instant::now();
        let report = sender(None, Duration::from_secs(30)).ping(&mut transport, &interrupt);
        handle.join().unwrap();

        assert!(start.elapsed() < Duration::from_secs(30));
        assert!(report.error.is_none());
        assert_eq!(report.summary.statistics.sent, 1);
        assert_eq!(report.summary.statistics.received, 1);
    }

    #[test]
    fn interrupt_while_waiting_for_reply_keeps_earlier_results() {
        let mut transport = ScriptedTransport::new(
            Family::V4,
            vec![Script::Reply(Duration::from_millis(2)), Script::Silence],
        );
        let (trigger, interrupt) = Interrupt::channel();
        let sender = Sender {
            probe: Probe::new(0x4242, b"FOO".to_vec(), None),
            ..sender(None, Duration::from_secs(0))
        };
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(250));
            trigger.raise();
        });

        let mut ledger = Ledger::new();
        sender
            .probe_loop(&mut transport, &interrupt, &mut ledger)
            .unwrap();
        handle.join().unwrap();

        // The second request went out and was abandoned without a record
        assert_eq!(transport.sent.len(), 2);
        assert_eq!(ledger.results().len(), 1);
        assert_eq!(ledger.results()[0].outcome, Outcome::Received);

        let stats = ledger.summarize();
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.received, 1);
    }

    #[test]
    fn interval_spaces_probe_starts() {
        let mut transport = ScriptedTransport::new(Family::V4, replies(&[1, 1, 1]));
        let (_trigger, interrupt) = Interrupt::channel();

        let start = Instant::now();
        let report = sender(Some(3), Duration::from_millis(40)).ping(&mut transport, &interrupt);

        // Two waits between three probes, none after the last
        assert!(start.elapsed() >= Duration::from_millis(80));
        assert_eq!(report.summary.statistics.sent, 3);
    }
}
