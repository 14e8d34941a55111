use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, filter::Directive, fmt, layer::SubscriberExt as _};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

// HTTP plumbing under the RPC and price clients is too chatty below warn.
const QUIET: &[&str] = &["h2", "hyper_util", "reqwest", "alloy_transport_http"];

/// Install the global tracing subscriber. Level comes from `RUST_LOG`;
/// panics if called twice.
pub fn init() {
    let mut filter = EnvFilter::from_default_env();
    for target in QUIET {
        let directive: Directive = format!("{target}=warn")
            .parse()
            .expect("static directive is well-formed");
        filter = filter.add_directive(directive);
    }

    let subscriber = tracing_subscriber::Registry::default()
        .with(filter)
        .with(fmt::layer().with_file(true).with_line_number(true));

    TELEMETRY_INIT
        .set(())
        .expect("global tracing subscriber already set");
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}
