//! logging
//!
//! Diagnostic logging to stderr via `tracing`.
//!
//! `RUST_LOG` wins when set. Otherwise the level comes from the global
//! flags: `--debug` gives `debug`, `--quiet` gives `error`, and the
//! default is `warn`. Stdout is reserved for command output.

use tracing_subscriber::EnvFilter;

use crate::ui::output::Verbosity;

/// Default filter directive for a verbosity.
pub fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Debug => "measurekeep=debug,warn",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity == Verbosity::Debug)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_parse() {
        for v in [Verbosity::Quiet, Verbosity::Normal, Verbosity::Debug] {
            assert!(EnvFilter::try_new(default_directive(v)).is_ok());
        }
    }

    #[test]
    fn init_twice_is_harmless() {
        init(Verbosity::Normal);
        init(Verbosity::Debug);
    }
}
