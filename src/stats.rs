use std::fmt;
use std::time::Duration;

/// How a single probe ended
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A matching echo reply arrived
    Received,
    /// No reply arrived before the deadline
    Lost,
    /// Something else arrived: an ICMP error, a foreign reply or unparseable bytes
    Other,
}

/// Record of one completed probe, never changed after creation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub sequence: u64,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

/// Append-only ledger of the probes of one session
///
/// The ledger is owned by the session that drives the probes. Statistics are computed from the
/// full record on demand rather than kept up to date incrementally.
#[derive(Debug, Default)]
pub struct Ledger {
    results: Vec<ProbeResult>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: ProbeResult) {
        trace!(
            "Recording icmp_seq={} as {:?}",
            result.sequence,
            result.outcome
        );
        self.results.push(result);
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    /// Compute the session statistics over everything recorded so far
    ///
    /// Round-trip times only take received replies into account. Without any reply there are no
    /// round-trip figures at all.
    pub fn summarize(&self) -> Statistics {
        let sent = self.results.len();
        let rtts: Vec<Duration> = self
            .results
            .iter()
            .filter(|result| result.outcome == Outcome::Received)
            .map(|result| result.elapsed)
            .collect();
        let received = rtts.len();

        let loss_percent = if sent == 0 {
            0.0
        } else {
            (sent - received) as f64 * 100.0 / sent as f64
        };

        let round_trip = match (rtts.iter().min(), rtts.iter().max()) {
            (Some(&min), Some(&max)) => Some(RoundTrip {
                min,
                avg: average(&rtts),
                max,
            }),
            _ => None,
        };

        Statistics {
            sent,
            received,
            loss_percent,
            round_trip,
        }
    }
}

/// Mean of a non-empty list of durations, exact to the nanosecond
fn average(durations: &[Duration]) -> Duration {
    let total: u128 = durations.iter().map(Duration::as_nanos).sum();
    let mean = total / durations.len().max(1) as u128;
    // The mean never exceeds the largest input, so the seconds fit into u64
    Duration::new((mean / 1_000_000_000) as u64, (mean % 1_000_000_000) as u32)
}

/// Minimum, average and maximum round-trip time over received replies
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RoundTrip {
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
}

/// Summary statistics of a session
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub sent: usize,
    pub received: usize,
    pub loss_percent: f64,
    pub round_trip: Option<RoundTrip>,
}

/// Final report of a session, ready for printing
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub host: String,
    pub statistics: Statistics,
}

/// Milliseconds with three decimals
fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000f64
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.statistics;
        writeln!(f, "--- {} ping statistics ---", self.host)?;
        writeln!(
            f,
            "{} packets transmitted, {} packets received, {:.1}% packet loss",
            stats.sent, stats.received, stats.loss_percent
        )?;
        match stats.round_trip {
            Some(rtt) => write!(
                f,
                "round-trip min/avg/max = {:.3}/{:.3}/{:.3} ms",
                millis(rtt.min),
                millis(rtt.avg),
                millis(rtt.max)
            ),
            None => write!(f, "round-trip min/avg/max = n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(sequence: u64, millis: u64, outcome: Outcome) -> ProbeResult {
        ProbeResult {
            sequence,
            elapsed: Duration::from_millis(millis),
            outcome,
        }
    }

    #[test]
    fn empty_ledger() {
        let stats = Ledger::new().summarize();

        assert_eq!(stats.sent, 0);
        assert_eq!(stats.received, 0);
        assert_eq!(stats.loss_percent, 0.0);
        assert_eq!(stats.round_trip, None);
    }

    #[test]
    fn round_trip_over_received_only() {
        let mut ledger = Ledger::new();
        ledger.record(result(0, 10, Outcome::Received));
        ledger.record(result(1, 1000, Outcome::Lost));
        ledger.record(result(2, 30, Outcome::Received));
        ledger.record(result(3, 5, Outcome::Other));

        let stats = ledger.summarize();

        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 2);
        assert_eq!(stats.loss_percent, 50.0);
        assert_eq!(
            stats.round_trip,
            Some(RoundTrip {
                min: Duration::from_millis(10),
                avg: Duration::from_millis(20),
                max: Duration::from_millis(30),
            })
        );
    }

    #[test]
    fn no_round_trip_without_replies() {
        let mut ledger = Ledger::new();
        ledger.record(result(0, 1000, Outcome::Lost));
        ledger.record(result(1, 2, Outcome::Other));

        let stats = ledger.summarize();

        assert_eq!(stats.loss_percent, 100.0);
        assert_eq!(stats.round_trip, None);
    }

    #[test]
    fn average_over_nanoseconds() {
        let durations = vec![Duration::from_millis(3); 4];
        assert_eq!(average(&durations), Duration::from_millis(3));
        assert_eq!(
            average(&[Duration::from_nanos(1), Duration::from_nanos(2)]),
            Duration::from_nanos(1)
        );

        // Far beyond what a u64 of nanoseconds could carry
        let long = Duration::from_secs(u64::MAX / 2);
        assert_eq!(average(&[long, long, long]), long);
    }

    #[test]
    fn summarize_is_idempotent() {
        let mut ledger = Ledger::new();
        ledger.record(result(0, 12, Outcome::Received));

        assert_eq!(ledger.summarize(), ledger.summarize());
        assert_eq!(ledger.results().len(), 1);
    }

    #[test]
    fn display_report() {
        let mut ledger = Ledger::new();
        ledger.record(result(0, 10, Outcome::Received));
        ledger.record(result(1, 20, Outcome::Received));
        ledger.record(result(2, 1000, Outcome::Lost));
        let summary = Summary {
            host: "example.com".to_string(),
            statistics: ledger.summarize(),
        };

        assert_eq!(
            summary.to_string(),
            "--- example.com ping statistics ---\n\
             3 packets transmitted, 2 packets received, 33.3% packet loss\n\
             round-trip min/avg/max = 10.000/15.000/20.000 ms"
        );
    }

    #[test]
    fn display_report_without_replies() {
        let summary = Summary {
            host: "example.com".to_string(),
            statistics: Ledger::new().summarize(),
        };

        assert_eq!(
            summary.to_string(),
            "--- example.com ping statistics ---\n\
             0 packets transmitted, 0 packets received, 0.0% packet loss\n\
             round-trip min/avg/max = n/a"
        );
    }
}
