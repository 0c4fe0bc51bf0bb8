//! Logging prelude module for convenient access to tracing macros.
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("[SYNC] Sending index.html.gz...");
//! warn!("[PRUNE] Deleting: old.css.gz");
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (from the config's
/// `logLevel` or `--verbose`) is used:
///
/// ```bash
/// RUST_LOG=debug assetsync deploy
/// RUST_LOG=assetsync::transfer=trace assetsync deploy
/// ```
pub fn init_tracing(default_level: &str) {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.init();
}

// vim: ts=4
