use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::cell::Cell;
use std::thread;
use std::time::Duration;

use crate::error::PingResult;

/// Raises the interrupt of its paired `Interrupt`
#[derive(Debug, Clone)]
pub struct Trigger(Sender<()>);

impl Trigger {
    pub fn raise(&self) {
        // A full channel means an interrupt is already pending
        let _ = self.0.try_send(());
    }
}

/// Receiving end of a user interrupt
///
/// Once an interrupt has been observed it stays raised for the rest of the session.
#[derive(Debug)]
pub struct Interrupt {
    rx: Receiver<()>,
    raised: Cell<bool>,
}

impl Interrupt {
    /// Create a connected trigger/interrupt pair
    pub fn channel() -> (Trigger, Interrupt) {
        let (tx, rx) = channel::bounded(1);
        let interrupt = Interrupt {
            rx,
            raised: Cell::new(false),
        };
        (Trigger(tx), interrupt)
    }

    /// Route Ctrl + C to a new `Interrupt`
    ///
    /// # Errors
    ///
    /// Fails if a signal handler has already been installed for this process.
    pub fn install() -> PingResult<Interrupt> {
        let (trigger, interrupt) = Interrupt::channel();
        ctrlc::set_handler(move || {
            println!();
            trigger.raise();
        })?;
        Ok(interrupt)
    }

    /// Return `true` if an interrupt has arrived, without blocking
    pub fn is_raised(&self) -> bool {
        if self.raised.get() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(()) => {
                self.raised.set(true);
                trace!("Registered signal interrupt");
                true
            }
            // A dropped trigger can never raise
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Sleep for `timeout` unless an interrupt arrives first
    ///
    /// Returns `true` if the wait was cut short by an interrupt.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.raised.get() {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(()) => {
                self.raised.set(true);
                trace!("Registered signal interrupt");
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn not_raised_by_default() {
        let (_trigger, interrupt) = Interrupt::channel();
        assert!(!interrupt.is_raised());
        assert!(!interrupt.wait(Duration::from_millis(1)));
    }

    #[test]
    fn raise_latches() {
        let (trigger, interrupt) = Interrupt::channel();
        trigger.raise();
        trigger.raise();

        assert!(interrupt.is_raised());
        assert!(interrupt.is_raised());
        assert!(interrupt.wait(Duration::from_secs(10)));
    }

    #[test]
    fn raise_cuts_wait_short() {
        let (trigger, interrupt) = Interrupt::channel();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.raise();
        });

        let start = Instant::now();
        assert!(interrupt.wait(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(10));
        handle.join().unwrap();
    }

    #[test]
    fn dropped_trigger_still_waits() {
        let (trigger, interrupt) = Interrupt::channel();
        drop(trigger);

        let start = Instant::now();
        assert!(!interrupt.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
