use tracing_subscriber::EnvFilter;

/// Default filter directive for a `--verbosity` level.
pub fn level_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "debug",
        1 => "info",
        2 | 3 => "warn",
        _ => "error",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbosity`;
/// `silent` turns all output off.
pub fn init(verbosity: u8, silent: bool) {
    let filter = if silent {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_directive(verbosity)))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_verbosity_levels() {
        assert_eq!(level_directive(0), "debug");
        assert_eq!(level_directive(1), "info");
        assert_eq!(level_directive(2), "warn");
        assert_eq!(level_directive(3), "warn");
        assert_eq!(level_directive(4), "error");
        assert_eq!(level_directive(9), "error");
    }
}
