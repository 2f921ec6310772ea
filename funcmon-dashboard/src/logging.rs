use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive for the dashboard crate's events.
pub fn log_directive(quiet: bool) -> &'static str {
    if quiet { "funcmon_dashboard=error" } else { "funcmon_dashboard=info" }
}

/// Initialize JSON logging to stderr.
///
/// When `quiet` is true, only error-level events are emitted.
/// `RUST_LOG` directives are applied on top.
pub fn init_logging(quiet: bool) {
    let directive = log_directive(quiet);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("Invalid log directive")),
        )
        .init();
}
