use tracing_subscriber::{EnvFilter, fmt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "git_committer=info";

/// Initialize logging on stderr; stdout carries the protocol.
///
/// Uses the `RUST_LOG` environment variable if set, otherwise falls back
/// to `default_level`. Safe to call multiple times (e.g. in tests),
/// subsequent calls are no-ops.
pub fn init_logging(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .with_level(true);

    if json {
        builder.json().try_init().ok();
    } else {
        builder.try_init().ok();
    }

    tracing::debug!(json, "logging initialised");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging("debug", false);
        init_logging("info", true);
    }
}
