//! Error types for assetsync operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::validation::ValidationError;

/// Top-level error for the build and deploy pipelines
///
/// Only setup failures and whole-pipeline I/O surface here. Per-file transfer
/// failures are recorded in the transfer report instead.
#[derive(Debug)]
pub enum PipelineError {
	/// Source directory does not exist
	SourceMissing { path: String },

	/// Remote endpoint is not configured
	RemoteUnconfigured { message: String },

	/// Could not join the device network
	NetworkSwitchFailed { ssid: String },

	/// I/O error
	Io(io::Error),

	/// Invalid configuration
	InvalidConfig { message: String },

	/// Remote error (nested)
	Remote(RemoteError),

	/// State error (nested)
	State(StateError),

	/// Build error (nested)
	Build(BuildError),

	/// Validation error (nested)
	Validation(ValidationError),
}

impl fmt::Display for PipelineError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PipelineError::SourceMissing { path } => {
				write!(f, "Source directory not found: {}", path)
			}
			PipelineError::RemoteUnconfigured { message } => {
				write!(f, "Remote not configured: {}", message)
			}
			PipelineError::NetworkSwitchFailed { ssid } => {
				write!(f, "Failed to switch network to {}", ssid)
			}
			PipelineError::Io(e) => write!(f, "I/O error: {}", e),
			PipelineError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			PipelineError::Remote(e) => write!(f, "Remote error: {}", e),
			PipelineError::State(e) => write!(f, "State error: {}", e),
			PipelineError::Build(e) => write!(f, "Build error: {}", e),
			PipelineError::Validation(e) => write!(f, "{}", e),
		}
	}
}

impl Error for PipelineError {}

impl From<io::Error> for PipelineError {
	fn from(e: io::Error) -> Self {
		PipelineError::Io(e)
	}
}

impl From<RemoteError> for PipelineError {
	fn from(e: RemoteError) -> Self {
		PipelineError::Remote(e)
	}
}

impl From<StateError> for PipelineError {
	fn from(e: StateError) -> Self {
		PipelineError::State(e)
	}
}

impl From<BuildError> for PipelineError {
	fn from(e: BuildError) -> Self {
		PipelineError::Build(e)
	}
}

impl From<ValidationError> for PipelineError {
	fn from(e: ValidationError) -> Self {
		PipelineError::Validation(e)
	}
}

/// Errors from a single remote operation
#[derive(Debug)]
pub enum RemoteError {
	/// Request could not be sent or the connection broke
	Request { object: String, source: Box<dyn Error + Send + Sync> },

	/// Request exceeded its timeout
	Timeout { object: String },

	/// Remote answered with a non-success status
	Rejected { object: String, status: u16 },

	/// Local I/O while serving the operation
	Io { object: String, source: io::Error },

	/// Object name is not a safe relative path
	InvalidObject { object: String, message: String },

	/// HTTP client could not be constructed
	ClientSetup { message: String },
}

impl RemoteError {
	/// Name of the object the operation targeted, if any
	pub fn object(&self) -> Option<&str> {
		match self {
			RemoteError::Request { object, .. }
			| RemoteError::Timeout { object }
			| RemoteError::Rejected { object, .. }
			| RemoteError::Io { object, .. }
			| RemoteError::InvalidObject { object, .. } => Some(object),
			RemoteError::ClientSetup { .. } => None,
		}
	}
}

impl fmt::Display for RemoteError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RemoteError::Request { object, source } => {
				write!(f, "Request for {} failed: {}", object, source)
			}
			RemoteError::Timeout { object } => write!(f, "Request for {} timed out", object),
			RemoteError::Rejected { object, status } => {
				write!(f, "Server rejected {} (Code: {})", object, status)
			}
			RemoteError::Io { object, source } => write!(f, "I/O error on {}: {}", object, source),
			RemoteError::InvalidObject { object, message } => {
				write!(f, "Invalid object name {}: {}", object, message)
			}
			RemoteError::ClientSetup { message } => {
				write!(f, "Failed to create HTTP client: {}", message)
			}
		}
	}
}

impl Error for RemoteError {}

/// Persisted state errors (manifest, lock)
#[derive(Debug)]
pub enum StateError {
	/// Failed to save state
	SaveFailed { path: String, source: io::Error },

	/// Failed to serialize state
	SerializeFailed { message: String },

	/// Lock acquisition failed
	LockFailed { message: String },
}

impl fmt::Display for StateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StateError::SaveFailed { path, source } => {
				write!(f, "Failed to save state to {}: {}", path, source)
			}
			StateError::SerializeFailed { message } => {
				write!(f, "Failed to serialize state: {}", message)
			}
			StateError::LockFailed { message } => write!(f, "Lock failed: {}", message),
		}
	}
}

impl Error for StateError {}

/// Build pipeline errors
///
/// Regeneration is all-or-nothing: the first one of these aborts the build
/// and the tree hash is left untouched.
#[derive(Debug)]
pub enum BuildError {
	/// Backing up the previous output failed
	BackupFailed { path: String, source: io::Error },

	/// Clearing or recreating the output directory failed
	PrepareFailed { path: String, source: io::Error },

	/// Copying or compressing a source file failed
	FileFailed { path: String, source: io::Error },

	/// Writing the version stamp or tree hash failed
	StampFailed { path: String, source: io::Error },
}

impl fmt::Display for BuildError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BuildError::BackupFailed { path, source } => {
				write!(f, "Backup to {} failed: {}", path, source)
			}
			BuildError::PrepareFailed { path, source } => {
				write!(f, "Cannot prepare output {}: {}", path, source)
			}
			BuildError::FileFailed { path, source } => {
				write!(f, "Cannot process {}: {}", path, source)
			}
			BuildError::StampFailed { path, source } => {
				write!(f, "Cannot write {}: {}", path, source)
			}
		}
	}
}

impl Error for BuildError {}


// vim: ts=4
