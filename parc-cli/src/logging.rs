//! Log output of the binaries: message text only, on standard output.

use std::io::Write;

use env_logger::{Builder, Env, Target};

/// Install the process logger.
///
/// The level defaults to `info` and follows `RUST_LOG` when set. Repeated
/// calls leave the first logger in place.
pub fn init_logging() {
    let installed = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .target(Target::Stdout)
        .try_init();
    if installed.is_err() {
        log::debug!("Logger already installed");
    }
}
