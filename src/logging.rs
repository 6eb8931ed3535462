use env_logger::{Builder, Env};

/// Default log level for the command-line flags, `RUST_LOG` still wins
pub fn default_level(quiet: bool, verbose: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, true) => "debug",
        (false, false) => "info",
    }
}

/// Install the global logger. Safe to call more than once; later calls are
/// ignored.
pub fn init(quiet: bool, verbose: bool) {
    let _ = Builder::from_env(Env::default().default_filter_or(default_level(quiet, verbose)))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_beats_verbose() {
        assert_eq!(default_level(true, true), "warn");
        assert_eq!(default_level(false, true), "debug");
        assert_eq!(default_level(false, false), "info");
    }

    #[test]
    fn test_init_twice() {
        init(false, false);
        init(true, false);
    }
}
