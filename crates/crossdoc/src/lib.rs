pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

use tracing::Level;

/// Install the stderr log subscriber; `verbose` enables debug events.
pub fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
