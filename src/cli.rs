//! Command line interface

use clap::{App as Clap, Arg, ArgMatches};
use std::env;
use std::error::Error;
use std::time::Duration;

use super::Config;
use crate::logger::StdLogger;
use crate::target::Family;

/// Largest payload that fits into a 1500 byte Ethernet frame after IPv4 and ICMP headers
const MTU_PAYLOAD: usize = 1472;

/// Application initialization
pub struct App;

impl App {
    /// Retrieve user input from command line
    ///
    /// The user can modify the following parameters of the application:
    /// - destination: Either as IP address or domain name (required)
    /// - count: Number of pings to send, 0 or negative pings until interrupted (default 0)
    /// - interval: Time between the starts of two pings (default 1s)
    /// - version: IP version to resolve the destination to, 4 or 6 (default 4)
    /// - timeout: Time to wait for each reply, 0 waits forever (default 1s)
    /// - ttl: The time to live for packets - not available for IPv6
    /// - size: The payload size per packet (default 56 bytes)
    /// - debug: Log every reply in detail
    ///
    /// `--help` and `--version` print and exit the process.
    pub fn parse_args() -> Result<Config, Box<dyn Error>> {
        let matches = match Self::app().get_matches_from_safe(normalize(env::args())) {
            Ok(matches) => matches,
            Err(e) if !e.use_stderr() => e.exit(),
            Err(e) => return Err(e.into()),
        };
        let config = Self::config_from(&matches)?;
        StdLogger::set_debug(config.debug);

        trace!("Parsed configuration.");
        Ok(config)
    }

    /// Parse a configuration from an explicit argument list, program name first
    pub fn parse_from<I>(args: I) -> Result<Config, Box<dyn Error>>
    where
        I: IntoIterator<Item = String>,
    {
        let matches = Self::app().get_matches_from_safe(normalize(args))?;
        Self::config_from(&matches)
    }

    fn app() -> Clap<'static, 'static> {
        Clap::new("echoping")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Send ICMP echo requests to a host and report round-trip statistics")
            .arg(
                Arg::with_name("destination")
                    .required(true)
                    .help("Host name or destination address"),
            )
            .arg(
                Arg::with_name("count")
                    .short("c")
                    .takes_value(true)
                    .allow_hyphen_values(true)
                    .help("Number of pings to send, 0 or negative pings forever"),
            )
            .arg(
                Arg::with_name("interval")
                    .short("i")
                    .takes_value(true)
                    .help("Interval between pings, e.g. 1.5s or 200ms"),
            )
            .arg(
                Arg::with_name("version")
                    .short("v")
                    .takes_value(true)
                    .help("IP version to use when looking up the host, 4 or 6"),
            )
            .arg(
                Arg::with_name("timeout")
                    .short("W")
                    .takes_value(true)
                    .help("Time to wait for a reply, 0 waits forever"),
            )
            .arg(
                Arg::with_name("ttl")
                    .short("t")
                    .takes_value(true)
                    .help("Sets the time to live (TTL) - not supported on IPv6"),
            )
            .arg(
                Arg::with_name("size")
                    .short("s")
                    .takes_value(true)
                    .help("Sets packet payload size (in Bytes)"),
            )
            .arg(Arg::with_name("debug").long("debug").help("Show debug info"))
    }

    fn config_from(matches: &ArgMatches<'_>) -> Result<Config, Box<dyn Error>> {
        // Clap states a required value is always present
        let dest = matches.value_of("destination").unwrap_or_default().to_string();

        let count = matches.value_of("count").unwrap_or("0").parse::<i64>()?;
        let count = if count > 0 { Some(count as u64) } else { None };

        let interval = parse_duration(matches.value_of("interval").unwrap_or("1s"))?;

        let family = matches.value_of("version").unwrap_or("4").parse::<Family>()?;

        let timeout = parse_duration(matches.value_of("timeout").unwrap_or("1s"))?;
        let timeout = if timeout == Duration::from_secs(0) {
            None
        } else {
            Some(timeout)
        };

        let ttl = match matches.value_of("ttl") {
            Some(val) => Some(val.parse::<u8>()?),
            None => None,
        };

        let size = matches.value_of("size").unwrap_or("56").parse::<usize>()?;
        if size > MTU_PAYLOAD {
            warn!("Beware of the Maximum Transmission Unit supported by your network device");
            warn!("If you do not receive any responses, try a smaller packet size");
        }

        Ok(Config {
            dest,
            family,
            count,
            interval,
            timeout,
            ttl,
            size,
            debug: matches.is_present("debug"),
        })
    }
}

/// Accept the single-dash long flag `-debug` next to `--debug`
fn normalize<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "-debug" {
                "--debug".to_string()
            } else {
                arg
            }
        })
        .collect()
}

/// Parse a duration literal such as `1.5s`, `200ms` or `1m30s`
///
/// Recognized units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A plain number is read as
/// seconds.
pub fn parse_duration(literal: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid duration {:?}", literal);
    let is_number = |c: char| c.is_ascii_digit() || c == '.';

    let mut rest = literal.trim();
    if rest.is_empty() || rest.starts_with('-') {
        return Err(invalid());
    }

    // Sum up in nanoseconds, which keeps common literals exact
    let mut nanos = 0f64;
    if rest.chars().all(is_number) {
        nanos = rest.parse::<f64>().map_err(|_| invalid())? * 1e9;
        rest = "";
    }

    while !rest.is_empty() {
        let split = rest.find(|c: char| !is_number(c)).ok_or_else(invalid)?;
        if split == 0 {
            return Err(invalid());
        }
        let value = rest[..split].parse::<f64>().map_err(|_| invalid())?;
        rest = &rest[split..];

        let split = rest.find(is_number).unwrap_or_else(|| rest.len());
        let scale = match &rest[..split] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        rest = &rest[split..];

        nanos += value * scale;
    }

    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}
