use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` takes precedence over
/// `level`; an unparsable level falls back to `info`. Calling this more than
/// once is harmless.
pub fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_filter(env_filter),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing("debug");
        init_tracing("not a valid directive [");
        tracing::info!("still logging");
    }
}
