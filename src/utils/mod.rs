//! Utilities: logging setup (tracing subscriber on stderr, verbosity from CLI flags).
//!
//! Key items:
//!   init_logging / derive_level

/// Logging helpers.
pub mod logging {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;

    /// Map `-v` / `-q` counts to a level. `-q` wins over any `-v`.
    pub fn derive_level(verbose: u8, quiet: bool) -> LevelFilter {
        if quiet {
            return LevelFilter::ERROR;
        }
        match verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Filter used when `RUST_LOG` is unset or unparsable.
    fn fallback_filter(level: LevelFilter) -> EnvFilter {
        EnvFilter::default().add_directive(level.into())
    }

    /// Install the global subscriber.
    ///
    /// Output always goes to stderr: stdout carries the MCP stream when serving.
    /// `RUST_LOG` overrides the CLI-derived level.
    pub fn init_logging(level: LevelFilter) {
        let filter = match std::env::var("RUST_LOG") {
            Ok(spec) if !spec.trim().is_empty() => {
                EnvFilter::try_new(spec).unwrap_or_else(|_| fallback_filter(level))
            }
            _ => fallback_filter(level),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
            .try_init();
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn quiet_wins() {
            assert_eq!(derive_level(2, true), LevelFilter::ERROR);
        }

        #[test]
        fn verbosity_steps() {
            assert_eq!(derive_level(0, false), LevelFilter::INFO);
            assert_eq!(derive_level(1, false), LevelFilter::DEBUG);
            assert_eq!(derive_level(5, false), LevelFilter::TRACE);
        }
    }
}

pub use logging::{derive_level, init_logging};
