#[macro_use]
extern crate log;

use echoping::{cli::App, interrupt::Interrupt, logger::StdLogger, sender::Sender};

fn main() {
    StdLogger::init();

    let config = match App::parse_args() {
        Ok(config) => config,
        Err(e) => {
            error!("Could not parse provided argument: {}", e);
            std::process::exit(1);
        }
    };

    trace!("Set up new sender context");

    let sender = match Sender::new(config) {
        Ok(tx) => tx,
        Err(e) => {
            error!("Could not configure ping session: {}", e);
            std::process::exit(1);
        }
    };

    let mut transport = match sender.open_transport() {
        Ok(transport) => transport,
        Err(e) => {
            error!("Could not open transport channel: {}", e);
            std::process::exit(1);
        }
    };

    let interrupt = match Interrupt::install() {
        Ok(interrupt) => interrupt,
        Err(e) => {
            error!("Could not set up interrupt handling: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", sender.banner());

    let report = sender.ping(&mut transport, &interrupt);

    // The transport closes its socket here, before the report goes out
    drop(transport);

    if let Some(e) = &report.error {
        error!("An error occurred during a running ping session: {}", e);
    }
    println!("{}", report.summary);

    trace!("Shutting down...");

    if report.error.is_some() {
        std::process::exit(1);
    }
}
