use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialise the tracing stack. `RUST_LOG` wins; the default keeps the
/// gateway chatty enough to follow request flow.
pub fn setup_logging() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,heron=debug,heron_server=debug")),
        )
        .init();
}
