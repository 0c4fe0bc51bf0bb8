//! Directory-backed store, used to deploy onto a mounted SD card

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs as afs;

use super::{RemoteResult, RemoteStore, UploadReceipt};
use crate::error::RemoteError;
use crate::validation::validate_object_name;

/// Writes objects as files below `root`
pub struct DirectoryStore {
	root: PathBuf,
}

impl DirectoryStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		DirectoryStore { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn object_path(&self, object_name: &str) -> RemoteResult<PathBuf> {
		validate_object_name(object_name).map_err(|e| RemoteError::InvalidObject {
			object: object_name.to_string(),
			message: e.to_string(),
		})?;
		Ok(self.root.join(object_name))
	}
}

#[async_trait]
impl RemoteStore for DirectoryStore {
	fn describe(&self) -> String {
		self.root.display().to_string()
	}

	async fn upload(&self, object_name: &str, data: Vec<u8>) -> RemoteResult<UploadReceipt> {
		let path = self.object_path(object_name)?;
		let io_err = |source: std::io::Error| RemoteError::Io { object: object_name.to_string(), source };

		if let Some(parent) = path.parent() {
			afs::create_dir_all(parent).await.map_err(io_err)?;
		}
		let bytes = data.len();
		afs::write(&path, data).await.map_err(io_err)?;
		Ok(UploadReceipt { status: 200, bytes })
	}

	async fn delete(&self, object_name: &str) -> RemoteResult<()> {
		let path = self.object_path(object_name)?;
		match afs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(source) => Err(RemoteError::Io { object: object_name.to_string(), source }),
		}
	}
}


// vim: ts=4
