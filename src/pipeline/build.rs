//! Asset build: mirror the website source into the filesystem image directory
//!
//! A whole-tree hash decides whether anything changed since the last build.
//! When it did, the current output is backed up, wiped and regenerated, with
//! compressible files gzipped. Regeneration is all-or-nothing: the tree hash
//! is only persisted after every file has been written.

use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::compress::{gzip_file, CompressionPolicy, GZIP_SUFFIX};
use crate::config::Config;
use crate::error::{BuildError, PipelineError};
use crate::hash::hash_tree;
use crate::logging::*;
use crate::scan::Scanner;
use crate::types::{BuildMode, FileDigest};

/// Version stamp written into the output root
pub const VERSION_FILE: &str = "version_info.txt";

/// What a build run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
	/// Sources unchanged; nothing was written
	Skipped { hash: FileDigest },
	/// Output regenerated
	Rebuilt(BuildSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
	pub hash: FileDigest,
	/// Files written (excluding the version stamp)
	pub files: usize,
	/// How many of those were gzipped
	pub compressed: usize,
	/// Where the previous output was copied, if there was one
	pub backup: Option<PathBuf>,
	pub message: String,
}

pub struct BuildEngine {
	source_dir: PathBuf,
	output_dir: PathBuf,
	backup_dir: PathBuf,
	hash_file: PathBuf,
	message_file: PathBuf,
	policy: CompressionPolicy,
}

impl BuildEngine {
	pub fn new(config: &Config) -> Self {
		BuildEngine {
			source_dir: config.source_dir.clone(),
			output_dir: config.output_dir.clone(),
			backup_dir: config.backup_dir.clone(),
			hash_file: config.build_hash_file.clone(),
			message_file: config.message_file.clone(),
			policy: CompressionPolicy::new(&config.compressible_extensions),
		}
	}

	/// Fingerprint of the source tree right now
	pub fn current_hash(&self) -> FileDigest {
		hash_tree(&self.source_dir)
	}

	/// Hash persisted by the last successful build
	pub fn last_hash(&self) -> Option<FileDigest> {
		let contents = fs::read_to_string(&self.hash_file).ok()?;
		let trimmed = contents.trim();
		if trimmed.is_empty() {
			None
		} else {
			Some(FileDigest::from_hex(trimmed))
		}
	}

	/// Whether a build in `mode` would regenerate the output
	pub fn needs_rebuild(&self, mode: BuildMode, current: &FileDigest) -> bool {
		mode == BuildMode::Interactive || self.last_hash().as_ref() != Some(current)
	}

	/// Build message: explicit text, else the message file, else a timestamp
	pub fn resolve_message(&self, explicit: Option<String>) -> String {
		if let Some(msg) = explicit.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()) {
			return msg;
		}
		if let Ok(contents) = fs::read_to_string(&self.message_file) {
			let msg = contents.trim();
			if !msg.is_empty() {
				return msg.to_string();
			}
		}
		format!("Auto-build {}", Local::now().format("%H:%M:%S"))
	}

	/// Run the build
	pub fn run(&self, mode: BuildMode, message: Option<String>) -> Result<BuildOutcome, PipelineError> {
		if !self.source_dir.is_dir() {
			return Err(PipelineError::SourceMissing {
				path: self.source_dir.display().to_string(),
			});
		}

		let hash = self.current_hash();
		if !self.needs_rebuild(mode, &hash) {
			info!("[Asset Pipeline] No changes in web sources. Skipping rebuild.");
			return Ok(BuildOutcome::Skipped { hash });
		}
		if mode == BuildMode::Automated {
			info!("[Asset Pipeline] Changes detected in '{}'.", self.source_dir.display());
		}

		let message = self.resolve_message(message);
		let backup = self.backup()?;
		let (files, compressed) = self.regenerate(&message)?;

		write_file(&self.hash_file, hash.as_str())?;
		info!(
			"[Asset Pipeline] Rebuilt '{}': {} files ({} gzipped)",
			self.output_dir.display(),
			files,
			compressed
		);

		Ok(BuildOutcome::Rebuilt(BuildSummary { hash, files, compressed, backup, message }))
	}

	/// Copy the current output to `backup_dir/backup_<timestamp>`
	fn backup(&self) -> Result<Option<PathBuf>, BuildError> {
		if !self.output_dir.exists() {
			return Ok(None);
		}

		let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
		let mut dest = self.backup_dir.join(format!("backup_{}", stamp));
		let mut n = 1;
		while dest.exists() {
			dest = self.backup_dir.join(format!("backup_{}_{}", stamp, n));
			n += 1;
		}

		info!("[Asset Pipeline] Changes detected! Backing up to '{}'...", dest.display());
		copy_dir_all(&self.output_dir, &dest).map_err(|source: io::Error| BuildError::BackupFailed {
			path: dest.display().to_string(),
			source,
		})?;
		Ok(Some(dest))
	}

	/// Wipe the output and write every source file into it
	fn regenerate(&self, message: &str) -> Result<(usize, usize), BuildError> {
		info!(
			"[Asset Pipeline] Rebuilding '{}' from '{}'...",
			self.output_dir.display(),
			self.source_dir.display()
		);

		let prepare_err =
			|source: io::Error| BuildError::PrepareFailed { path: self.output_dir.display().to_string(), source };
		if self.output_dir.exists() {
			fs::remove_dir_all(&self.output_dir).map_err(prepare_err)?;
		}
		fs::create_dir_all(&self.output_dir).map_err(prepare_err)?;

		let entries = Scanner::new().scan(&self.source_dir).map_err(|source| {
			BuildError::FileFailed { path: self.source_dir.display().to_string(), source }
		})?;

		let mut compressed = 0;
		for entry in &entries {
			let file_err =
				|source: io::Error| BuildError::FileFailed { path: entry.path.display().to_string(), source };

			// Native relative path, so names that are not UTF-8 survive
			let mut dest = self.output_dir.join(&entry.rel);
			if let Some(parent) = dest.parent() {
				fs::create_dir_all(parent).map_err(file_err)?;
			}

			if self.policy.is_compressible(&entry.rel_path) {
				let mut name = dest.into_os_string();
				name.push(GZIP_SUFFIX);
				dest = PathBuf::from(name);
				gzip_file(&entry.path, &dest).map_err(file_err)?;
				compressed += 1;
			} else {
				fs::copy(&entry.path, &dest).map_err(file_err)?;
			}
			debug!("Wrote {}", dest.display());
		}

		let stamp = format!(
			"Message: {}\nBuild Date: {}\n",
			message,
			Local::now().format("%Y-%m-%d %H:%M:%S%.6f")
		);
		write_file(&self.output_dir.join(VERSION_FILE), &stamp)?;

		Ok((entries.len(), compressed))
	}
}

fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
	let stamp_err = |source: io::Error| BuildError::StampFailed { path: path.display().to_string(), source };
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(stamp_err)?;
	}
	fs::write(path, contents).map_err(stamp_err)
}

/// Recursive copy; file symlinks are copied as their content, directory
/// symlinks and dangling links are skipped
fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
	fs::create_dir_all(dst)?;
	for entry in fs::read_dir(src)? {
		let entry = entry?;
		let path = entry.path();
		let target = dst.join(entry.file_name());
		let file_type = entry.file_type()?;

		if file_type.is_dir() {
			copy_dir_all(&path, &target)?;
		} else if file_type.is_symlink() {
			match fs::metadata(&path) {
				Ok(meta) if meta.is_file() => {
					fs::copy(&path, &target)?;
				}
				Ok(_) => warn!("Not copying symlinked directory {}", path.display()),
				Err(e) => warn!("Not copying dangling symlink {}: {}", path.display(), e),
			}
		} else {
			fs::copy(&path, &target)?;
		}
	}
	Ok(())
}


// vim: ts=4
