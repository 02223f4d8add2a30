use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber. `RUST_LOG` wins over the `--debug` flag.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
