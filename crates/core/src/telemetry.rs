use tracing_subscriber::{EnvFilter, fmt};

/// Initialise the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to `info` with hyper's connection noise
/// turned down, since every RPC call goes over HTTP.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,alloy_transport_http=warn"));

    fmt().with_env_filter(filter).with_target(true).init();
}
