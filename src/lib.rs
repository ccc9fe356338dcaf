//! # ECHOPING ping application
//!
//! This crate provides the components of a UNIX ping application. It consists of these parts:
//! - The `Sender` context which resolves the destination and drives the session
//! - The `Probe` which runs a single echo request/reply exchange over a `Transport`
//! - The `Ledger` which records every exchange and computes the summary statistics
//!
//! Probes run strictly one after another: a new echo request only goes out once the previous one
//! has been answered, has timed out, or the session has been interrupted. Each packet is
//! timestamped right before it is passed down to the transport and again right after the
//! transport has handed it up.

#[macro_use]
extern crate log;

use std::time::Duration;

pub mod cli;
pub mod error;
pub mod interrupt;
pub mod logger;
pub mod packet;
pub mod probe;
pub mod sender;
pub mod stats;
pub mod target;
pub mod transport;

use target::Family;

/// Application configuration
///
/// The `Config` will be consumed by the `Sender`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub(crate) dest: String,
    pub(crate) family: Family,
    pub(crate) count: Option<u64>,
    pub(crate) interval: Duration,
    pub(crate) timeout: Option<Duration>,
    pub(crate) ttl: Option<u8>,
    pub(crate) size: usize,
    pub(crate) debug: bool,
}
