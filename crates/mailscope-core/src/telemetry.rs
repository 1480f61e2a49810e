//! Log setup and lifecycle events.
//!
//! `mailscope` prints reports on stdout, often piped into `jq`, so every log
//! line goes to stderr. `RUST_LOG` overrides the level chosen by the caller.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr subscriber, as text or newline-delimited JSON.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry.with(stderr.json()).try_init()
    } else {
        registry.with(stderr).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Emit event: an analysis started for a resolved domain.
pub fn emit_analysis_started(domain: &str, probe_count: usize) {
    tracing::info!(event = "analysis.started", domain = %domain, probes = probe_count);
}

/// Emit event: a probe degraded to a failure outcome.
pub fn emit_probe_failed(component: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "probe.failed", component = %component, error = %error);
}

/// Emit event: an analysis finished.
pub fn emit_analysis_finished(domain: &str, elapsed_seconds: f64, error_count: usize) {
    tracing::info!(
        event = "analysis.finished",
        domain = %domain,
        elapsed_seconds = elapsed_seconds,
        errors = error_count,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
        emit_analysis_started("example.com", 2);
        emit_probe_failed("mx", &"boom");
        emit_analysis_finished("example.com", 0.5, 1);
    }
}
