//! Core data types shared by the build and deploy pipelines

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Rendering of the digest returned for a tree that does not exist
const EMPTY_DIGEST: &str = "0";

/// Content digest of a file (bytes followed by its relative path), hex encoded
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileDigest(String);

impl FileDigest {
	/// Finalize a BLAKE3 hasher into a digest
	pub fn from_hasher(hasher: &blake3::Hasher) -> Self {
		FileDigest(hex::encode(hasher.finalize().as_bytes()))
	}

	/// Sentinel digest for a missing tree
	pub fn empty() -> Self {
		FileDigest(EMPTY_DIGEST.to_string())
	}

	/// Wrap an already hex-encoded digest (e.g. read back from disk)
	pub fn from_hex(hex: impl Into<String>) -> Self {
		FileDigest(hex.into())
	}

	pub fn is_empty(&self) -> bool {
		self.0 == EMPTY_DIGEST
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for FileDigest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "FileDigest({})", self.0)
	}
}

impl fmt::Display for FileDigest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Relative path (`/` separated) -> digest
///
/// A `BTreeMap` keeps iteration and serialization order stable.
pub type Manifest = BTreeMap<String, FileDigest>;

/// One file scheduled for transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTarget {
	/// Absolute (or source-rooted) path on the local disk
	pub source: PathBuf,
	/// Path relative to the source root, `/` separated
	pub rel_path: String,
	/// Name the remote stores the object under
	pub object_name: String,
	/// Whether the payload is gzip-compressed before upload
	pub compressed: bool,
}

/// How the build pipeline decides whether to regenerate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
	/// Triggered by the firmware build: skip when sources are unchanged
	Automated,
	/// Run by hand: always rebuild
	Interactive,
}

/// Where the deploy pipeline pushes files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
	/// Over Wi-Fi to the device's upload endpoint
	Web,
	/// Into a locally mounted directory (SD card)
	Sd,
}

impl std::str::FromStr for DeployMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"web" => Ok(DeployMode::Web),
			"sd" => Ok(DeployMode::Sd),
			other => Err(format!("unknown deploy mode '{}' (expected web or sd)", other)),
		}
	}
}


// vim: ts=4
