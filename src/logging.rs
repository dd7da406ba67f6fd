// logging.rs - tracing subscriber for the command-line tools

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `level` and
/// everything else at `warn`. Stdout stays free for prompts and results.
pub fn init_logging(level: &str) -> Result<(), TryInitError> {
    let default_filter = format!("warn,eigenset={level},verify={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .try_init()
}
