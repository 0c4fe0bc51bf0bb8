//! Manifest persistence and the deploy lock

use std::path::{Path, PathBuf};
use tokio::fs as afs;
use tokio::io::AsyncWriteExt;

use crate::error::StateError;
use crate::logging::*;
use crate::types::Manifest;

/// Loads and saves the path -> digest manifest of the last deploy
pub struct ManifestStore {
	path: PathBuf,
}

impl ManifestStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		ManifestStore { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Load the previous manifest
	///
	/// A missing or unparsable file means "no prior state" and yields an
	/// empty manifest, so the next deploy uploads everything.
	pub async fn load(&self) -> Manifest {
		let contents = match afs::read_to_string(&self.path).await {
			Ok(c) => c,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!("No manifest at {}, starting fresh", self.path.display());
				return Manifest::new();
			}
			Err(e) => {
				warn!("Cannot read manifest {}: {} (treating as empty)", self.path.display(), e);
				return Manifest::new();
			}
		};

		match serde_json::from_str::<Manifest>(&contents) {
			Ok(manifest) => manifest,
			Err(e) => {
				warn!("Manifest {} is corrupt: {} (treating as empty)", self.path.display(), e);
				Manifest::new()
			}
		}
	}

	/// Save the manifest atomically
	///
	/// The JSON is written to a sibling temp file, synced, and renamed over
	/// the target, so a crash leaves either the old or the new manifest.
	pub async fn save(&self, manifest: &Manifest) -> Result<(), StateError> {
		let json = serde_json::to_string_pretty(manifest)
			.map_err(|e| StateError::SerializeFailed { message: e.to_string() })?;

		let parent = match self.path.parent() {
			Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
			_ => PathBuf::from("."),
		};
		afs::create_dir_all(&parent).await.map_err(|e| self.save_failed(e))?;

		let file_name =
			self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
		let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

		if let Err(e) = write_synced(&tmp_path, json.as_bytes()).await {
			let _ = afs::remove_file(&tmp_path).await;
			return Err(self.save_failed(e));
		}
		if let Err(e) = afs::rename(&tmp_path, &self.path).await {
			let _ = afs::remove_file(&tmp_path).await;
			return Err(self.save_failed(e));
		}

		debug!("Saved manifest with {} entries to {}", manifest.len(), self.path.display());
		Ok(())
	}

	fn save_failed(&self, source: std::io::Error) -> StateError {
		StateError::SaveFailed { path: self.path.display().to_string(), source }
	}
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
	let mut file = afs::File::create(path).await?;
	file.write_all(data).await?;
	file.sync_all().await
}

/// RAII lock guard for exclusive deploy access
#[derive(Debug)]
pub struct StateLock {
	path: PathBuf,
}

impl StateLock {
	/// Create the lock file; fails if another deploy holds it
	pub fn acquire(path: &Path) -> Result<StateLock, StateError> {
		let mut file = std::fs::OpenOptions::new().write(true).create_new(true).open(path).map_err(
			|e| {
				if e.kind() == std::io::ErrorKind::AlreadyExists {
					StateError::LockFailed {
						message: format!(
							"Deploy already in progress (lock file exists). If stale, delete: {}",
							path.display()
						),
					}
				} else {
					StateError::LockFailed { message: format!("Failed to create lock file: {}", e) }
				}
			},
		)?;

		use std::io::Write;
		let _ = write!(file, "{}", std::process::id());
		Ok(StateLock { path: path.to_path_buf() })
	}
}

impl Drop for StateLock {
	fn drop(&mut self) {
		// Remove lock file on drop (whether success or failure)
		let _ = std::fs::remove_file(&self.path);
	}
}


// vim: ts=4
