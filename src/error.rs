use std::error::Error;
use std::fmt;
use std::io;

use crate::target::Family;

pub type PingResult<T> = Result<T, PingError>;

/// Failures that stop a ping session
///
/// Each variant names the operation that failed. Startup variants (`Resolve`, `NoAddress`,
/// `NoAddressForFamily`, `SocketOpen`, `Signal`) abort before the first probe. `Encode`, `Send`
/// and `Receive` end a running session, after which the statistics gathered so far are still
/// reported.
#[derive(Debug)]
pub enum PingError {
    Resolve { host: String, source: io::Error },
    NoAddress { host: String },
    NoAddressForFamily { host: String, family: Family },
    SocketOpen(io::Error),
    Signal(ctrlc::Error),
    Encode(&'static str),
    Send(io::Error),
    Receive(io::Error),
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingError::Resolve { host, source } => {
                write!(f, "failed to look up host {}: {}", host, source)
            }
            PingError::NoAddress { host } => write!(f, "got no addresses for host {}", host),
            PingError::NoAddressForFamily { host, family } => {
                write!(f, "host {} has no {} address", host, family)
            }
            PingError::SocketOpen(e) => write!(f, "failed to open ICMP socket: {}", e),
            PingError::Signal(e) => write!(f, "failed to install interrupt handler: {}", e),
            PingError::Encode(what) => write!(f, "failed to encode echo request: {}", what),
            PingError::Send(e) => write!(f, "failed to send echo request: {}", e),
            PingError::Receive(e) => write!(f, "failed to receive echo reply: {}", e),
        }
    }
}

impl Error for PingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PingError::Resolve { source, .. } => Some(source),
            PingError::SocketOpen(e) | PingError::Send(e) | PingError::Receive(e) => Some(e),
            PingError::Signal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ctrlc::Error> for PingError {
    fn from(error: ctrlc::Error) -> Self {
        PingError::Signal(error)
    }
}
