//! TUI binary entry point for serial-term.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin serial-term-tui --features tui
//! ```

use serial_term::config::ConfigLoader;
use serial_term::logging;
use serial_term::port::SystemPortOpener;
use serial_term::tui::{App, EventHandler};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match ConfigLoader::load() {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("Warning: Failed to load config, using defaults: {}", e);
            ConfigLoader::with_defaults().into_config()
        }
    };

    // Anything on stderr would corrupt the screen, so only log to a file.
    if let Err(e) = logging::init_file_only(&config.logging) {
        eprintln!("Warning: File logging disabled: {}", e);
    }

    let events = EventHandler::new(config.terminal.refresh_interval());
    let opener = SystemPortOpener::new(config.serial.read_timeout());
    let mut app = App::new(config, opener, events.sender());

    match app.run(&events) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("serial-term-tui: {}", e);
            ExitCode::FAILURE
        }
    }
}
