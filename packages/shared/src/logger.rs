//! Logging setup utilities for the Lockstep binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are enabled by the default filter.
const WORKSPACE_TARGETS: [&str; 3] = ["lockstep_server", "lockstep_client", "lockstep_shared"];

/// Build the default filter directive for a binary.
///
/// Hyphens are replaced because tracing targets use the crate's module path.
pub fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let mut directives = vec![format!(
        "{}={}",
        binary_name.replace('-', "_"),
        default_log_level
    )];
    for target in WORKSPACE_TARGETS {
        let directive = format!("{}={}", target, default_log_level);
        if !directives.contains(&directive) {
            directives.push(directive);
        }
    }
    directives.push(format!("tower_http={}", default_log_level));
    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "lockstep-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use lockstep_shared::logger::setup_logger;
///
/// setup_logger("lockstep-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
