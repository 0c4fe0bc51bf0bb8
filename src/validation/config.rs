//! Configuration validation functions

use super::ValidationError;

/// Validate a network timeout in seconds
pub fn validate_timeout_secs(name: &str, timeout_secs: u64) -> Result<(), ValidationError> {
	if timeout_secs == 0 {
		return Err(ValidationError::ConfigError(format!("{} must be greater than 0", name)));
	}
	if timeout_secs > 3600 {
		return Err(ValidationError::ConfigError(format!(
			"{} too large: {} seconds (max 3600)",
			name, timeout_secs
		)));
	}
	Ok(())
}

/// Validate the inter-upload pause
///
/// The device is slow, but anything above ten seconds per file is a typo.
pub fn validate_pause_ms(pause_ms: u64) -> Result<(), ValidationError> {
	if pause_ms > 10_000 {
		return Err(ValidationError::ConfigError(format!(
			"pause_ms too large: {} (max 10000)",
			pause_ms
		)));
	}
	Ok(())
}

/// Validate a compressible extension entry (`.html` or `html`)
pub fn validate_extension(ext: &str) -> Result<(), ValidationError> {
	let bare = ext.strip_prefix('.').unwrap_or(ext);
	if bare.is_empty() {
		return Err(ValidationError::ConfigError("Empty compressible extension".to_string()));
	}
	if bare.contains('.') || bare.contains('/') || bare.contains('\\') {
		return Err(ValidationError::ConfigError(format!(
			"Compressible extension must be a single suffix, got {:?}",
			ext
		)));
	}
	Ok(())
}

/// Validate an ignore-directory name (a single path component)
pub fn validate_ignore_dir(name: &str) -> Result<(), ValidationError> {
	if name.is_empty() || name == "." || name == ".." {
		return Err(ValidationError::ConfigError(format!("Invalid ignore directory {:?}", name)));
	}
	if name.contains('/') || name.contains('\\') {
		return Err(ValidationError::ConfigError(format!(
			"Ignore directory must be a single name, got {:?}",
			name
		)));
	}
	Ok(())
}


// vim: ts=4
