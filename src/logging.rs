//! Logging setup
//!
//! The library only emits `tracing` events. Binaries call [`init`] once to
//! install a formatting subscriber; `RUST_LOG` overrides the default level.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber at `default_level`
///
/// Returns `false` if a subscriber was already installed, which is harmless
/// when a host application sets up its own.
pub fn init(default_level: Level) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Default level for a `-v` count given on the command line
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init(Level::DEBUG);
        assert!(!init(Level::DEBUG));
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for_verbosity(0), Level::WARN);
        assert_eq!(level_for_verbosity(1), Level::INFO);
        assert_eq!(level_for_verbosity(2), Level::DEBUG);
        assert_eq!(level_for_verbosity(9), Level::TRACE);
    }
}
