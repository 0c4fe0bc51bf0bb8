//! Configuration for the build and deploy pipelines
//!
//! Everything the pipelines need (paths, SSIDs, extension set, timeouts) lives
//! in one `Config` that is passed into each engine at construction.
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (`assetsync.toml`, or `.json`/`.json5`)
//! 3. Environment variables (ASSETSYNC_* prefix)
//! 4. CLI flags (applied by the binary, highest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PipelineError;
use crate::validation::{
	validate_extension, validate_ignore_dir, validate_pause_ms, validate_timeout_secs,
	ValidationError, Validator,
};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "assetsync.toml";

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "ASSETSYNC_";

/// Manifest file name used when `manifestFile` has none
pub const DEFAULT_MANIFEST_NAME: &str = ".file_hashes.json";

/// Extensions that are gzip-compressed by both pipelines
pub const DEFAULT_COMPRESSIBLE: &[&str] = &[".html", ".css", ".js", ".json", ".xml", ".svg", ".txt"];

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// SOURCE & BUILD OUTPUT
	// ========================================================================
	/// Website source tree
	pub source_dir: PathBuf,

	/// Build output (filesystem image contents)
	pub output_dir: PathBuf,

	/// Where timestamped copies of the previous output go
	pub backup_dir: PathBuf,

	/// Last successful build's tree hash
	pub build_hash_file: PathBuf,

	/// Optional file holding the build message
	pub message_file: PathBuf,

	// ========================================================================
	// DEPLOY STATE
	// ========================================================================
	/// Per-file digest manifest of the last deploy
	pub manifest_file: PathBuf,

	/// Lock file guarding concurrent deploys
	pub lock_file: PathBuf,

	// ========================================================================
	// REMOTE
	// ========================================================================
	/// Device base URL (e.g. `http://192.168.4.1`)
	pub remote_url: Option<String>,

	/// File the base URL is read from when `remote_url` is unset
	pub url_file: PathBuf,

	/// Upload request timeout
	pub upload_timeout_secs: u64,

	/// Delete request timeout
	pub delete_timeout_secs: u64,

	/// Pause after each upload, so the device can flush to flash
	pub pause_ms: u64,

	// ========================================================================
	// NETWORK SWITCHING
	// ========================================================================
	/// Switch Wi-Fi networks around a web deploy
	pub switch_network: bool,

	/// Access point the device exposes
	pub device_ssid: String,

	pub device_password: Option<String>,

	/// Network to return to after the deploy
	pub home_ssid: Option<String>,

	pub home_password: Option<String>,

	// ========================================================================
	// FILE SELECTION
	// ========================================================================
	/// Extensions to gzip (leading dot optional)
	pub compressible_extensions: Vec<String>,

	/// Directory names skipped at any depth by the deploy scan
	pub ignore_dirs: Vec<String>,

	/// Glob patterns (relative to the source root) skipped by the deploy scan
	pub exclude_patterns: Vec<String>,

	// ========================================================================
	// OUTPUT & LOGGING
	// ========================================================================
	/// Log level (trace, debug, info, warn, error)
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			// Source & build
			source_dir: PathBuf::from("site"),
			output_dir: PathBuf::from("data"),
			backup_dir: PathBuf::from("backups"),
			build_hash_file: PathBuf::from(".last_build_hash"),
			message_file: PathBuf::from("commit_message.txt"),

			// Deploy state
			manifest_file: PathBuf::from(DEFAULT_MANIFEST_NAME),
			lock_file: PathBuf::from(".assetsync.lock"),

			// Remote
			remote_url: None,
			url_file: PathBuf::from("website_upload_link.txt"),
			upload_timeout_secs: 15,
			delete_timeout_secs: 5,
			pause_ms: 150,

			// Network
			switch_network: true,
			device_ssid: String::new(),
			device_password: None,
			home_ssid: None,
			home_password: None,

			// Selection
			compressible_extensions: DEFAULT_COMPRESSIBLE.iter().map(|s| s.to_string()).collect(),
			ignore_dirs: vec![".git".to_string()],
			exclude_patterns: vec![],

			// Output
			log_level: "info".to_string(),
		}
	}
}

impl Config {
	/// Load configuration: defaults, then an optional file, then environment
	///
	/// With `path == None` the default config file is used if it exists.
	pub fn load(path: Option<&Path>) -> Result<Config, PipelineError> {
		let mut config = match path {
			Some(p) => Config::from_file(p)?,
			None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
				Config::from_file(Path::new(DEFAULT_CONFIG_FILE))?
			}
			None => Config::default(),
		};
		config.apply_env(|key| std::env::var(key).ok());
		config.validate()?;
		Ok(config)
	}

	/// Parse a config file; the format is picked from the extension
	pub fn from_file(path: &Path) -> Result<Config, PipelineError> {
		let contents = std::fs::read_to_string(path).map_err(|e| PipelineError::InvalidConfig {
			message: format!("cannot read {}: {}", path.display(), e),
		})?;
		let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
		Config::parse(&contents, &ext).map_err(|message| PipelineError::InvalidConfig {
			message: format!("{}: {}", path.display(), message),
		})
	}

	/// Parse config text in the given format (`toml`, `json`, `json5`)
	pub fn parse(contents: &str, format: &str) -> Result<Config, String> {
		match format {
			"toml" | "" => toml::from_str(contents).map_err(|e| e.to_string()),
			"json" | "json5" => json5::from_str(contents).map_err(|e| e.to_string()),
			other => Err(format!("unsupported config format '{}'", other)),
		}
	}

	/// Apply `ASSETSYNC_*` overrides from the given lookup
	pub fn apply_env<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

		if let Some(v) = var("SOURCE_DIR") {
			self.source_dir = PathBuf::from(v);
		}
		if let Some(v) = var("OUTPUT_DIR") {
			self.output_dir = PathBuf::from(v);
		}
		if let Some(v) = var("MANIFEST_FILE") {
			self.manifest_file = PathBuf::from(v);
		}
		if let Some(v) = var("REMOTE_URL") {
			self.remote_url = Some(v);
		}
		if let Some(v) = var("DEVICE_SSID") {
			self.device_ssid = v;
		}
		if let Some(v) = var("DEVICE_PASSWORD") {
			self.device_password = Some(v);
		}
		if let Some(v) = var("HOME_SSID") {
			self.home_ssid = Some(v);
		}
		if let Some(v) = var("HOME_PASSWORD") {
			self.home_password = Some(v);
		}
		if let Some(v) = var("SWITCH_NETWORK") {
			self.switch_network = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
		}
		if let Some(v) = var("LOG_LEVEL") {
			self.log_level = v;
		}
	}

	/// Resolve the device base URL from config or the URL file
	///
	/// This is a setup step: failing here must stop the deploy before any
	/// network switching happens.
	pub fn resolve_remote_url(&self) -> Result<String, PipelineError> {
		if let Some(url) = self.remote_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
			return Ok(url.to_string());
		}

		let contents = std::fs::read_to_string(&self.url_file).map_err(|e| {
			PipelineError::RemoteUnconfigured {
				message: format!(
					"no remoteUrl configured and cannot read {}: {}",
					self.url_file.display(),
					e
				),
			}
		})?;
		let url = contents.trim();
		if url.is_empty() {
			return Err(PipelineError::RemoteUnconfigured {
				message: format!("{} is empty", self.url_file.display()),
			});
		}
		Ok(url.to_string())
	}

	pub fn upload_timeout(&self) -> Duration {
		Duration::from_secs(self.upload_timeout_secs)
	}

	pub fn delete_timeout(&self) -> Duration {
		Duration::from_secs(self.delete_timeout_secs)
	}

	pub fn pause(&self) -> Duration {
		Duration::from_millis(self.pause_ms)
	}

	/// Manifest for an SD-card deploy, kept on the card itself
	///
	/// It travels with the card, so a card and the device never share state.
	pub fn sd_manifest_file(&self, target: &Path) -> PathBuf {
		match self.manifest_file.file_name() {
			Some(name) => target.join(name),
			None => target.join(DEFAULT_MANIFEST_NAME),
		}
	}
}

impl Validator for Config {
	fn validate(&self) -> Result<(), ValidationError> {
		if self.source_dir.as_os_str().is_empty() {
			return Err(ValidationError::ConfigError("sourceDir must not be empty".to_string()));
		}
		if self.output_dir.as_os_str().is_empty() {
			return Err(ValidationError::ConfigError("outputDir must not be empty".to_string()));
		}
		// The tree hash covers everything under sourceDir
		if self.output_dir.starts_with(&self.source_dir) {
			return Err(ValidationError::ConfigError(
				"outputDir must not be sourceDir or inside it".to_string(),
			));
		}
		if self.backup_dir.starts_with(&self.source_dir) {
			return Err(ValidationError::ConfigError(
				"backupDir must not be sourceDir or inside it".to_string(),
			));
		}
		validate_timeout_secs("uploadTimeoutSecs", self.upload_timeout_secs)?;
		validate_timeout_secs("deleteTimeoutSecs", self.delete_timeout_secs)?;
		validate_pause_ms(self.pause_ms)?;
		for ext in &self.compressible_extensions {
			validate_extension(ext)?;
		}
		for dir in &self.ignore_dirs {
			validate_ignore_dir(dir)?;
		}
		Ok(())
	}
}


// vim: ts=4
