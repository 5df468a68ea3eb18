use tracing_subscriber::{
    fmt::Layer, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Installs the JSON subscriber, filtered by `RUST_LOG`. Safe to call more than once.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(Layer::default().json().flatten_event(true))
        .with(EnvFilter::from_default_env())
        .try_init();
}
