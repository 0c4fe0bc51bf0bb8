//! Differential transfer engine
//!
//! Scans the source tree, diffs it against the previous manifest, prunes
//! vanished files from the remote and uploads changed ones. The returned
//! manifest only claims a file is deployed if its upload was acknowledged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::callbacks::{NoObserver, TransferEvent, TransferObserver};
use crate::compress::{gzip, CompressionPolicy};
use crate::config::Config;
use crate::delta::{self, DeltaResult};
use crate::error::PipelineError;
use crate::hash::hash_file;
use crate::logging::*;
use crate::remote::RemoteStore;
use crate::scan::Scanner;
use crate::types::{Manifest, TransferTarget};

/// Result of hashing the source tree
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
	/// Digest of every readable file
	pub manifest: Manifest,
	/// Files that exist but could not be read
	pub unreadable: Vec<String>,
	/// Files whose name cannot be a manifest key (not UTF-8), lossily rendered
	pub rejected: Vec<String>,
}

/// Scan result diffed against the previous manifest
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
	/// Manifest the run starts from, before any upload outcome is applied
	pub manifest: Manifest,
	pub delta: DeltaResult,
	/// Files that can never be deployed under their current name
	pub rejected: Vec<String>,
}

/// A failed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
	pub rel_path: String,
	pub object: String,
	pub reason: String,
}

/// Outcome of a transfer run
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
	/// Reconciled manifest to persist
	pub manifest: Manifest,
	/// Delta the run worked from
	pub delta: DeltaResult,
	/// Uploaded object names
	pub synced: Vec<String>,
	/// Uploads that did not go through
	pub failed: Vec<TransferFailure>,
	/// Deleted object names
	pub pruned: Vec<String>,
	/// Deletes that did not go through
	pub prune_failed: Vec<String>,
	/// Payload bytes acknowledged by the remote
	pub bytes_sent: u64,
}

impl TransferReport {
	/// True if every planned operation succeeded
	pub fn is_clean(&self) -> bool {
		self.failed.is_empty() && self.prune_failed.is_empty()
	}

	pub fn summary(&self) -> String {
		format!(
			"{} synced, {} failed, {} pruned, {} prune failures, {} bytes sent",
			self.synced.len(),
			self.failed.len(),
			self.pruned.len(),
			self.prune_failed.len(),
			self.bytes_sent
		)
	}
}

/// Scans the source tree and diffs it against a manifest; never touches a remote
#[derive(Debug, Clone)]
pub struct SourcePlanner {
	source_dir: PathBuf,
	scanner: Scanner,
}

impl SourcePlanner {
	/// Planner for the configured source tree, honoring ignore dirs and excludes
	pub fn new(config: &Config) -> Result<Self, PipelineError> {
		let scanner = Scanner::new()
			.with_ignore_dirs(&config.ignore_dirs)
			.with_exclude_patterns(&config.exclude_patterns)?;
		Ok(SourcePlanner { source_dir: config.source_dir.clone(), scanner })
	}

	pub fn source_dir(&self) -> &Path {
		&self.source_dir
	}

	/// Hash every file in the source tree
	pub fn scan(&self) -> Result<ScanOutcome, PipelineError> {
		if !self.source_dir.is_dir() {
			return Err(PipelineError::SourceMissing {
				path: self.source_dir.display().to_string(),
			});
		}

		let mut outcome = ScanOutcome::default();
		for entry in self.scanner.scan(&self.source_dir)? {
			if !entry.is_utf8() {
				warn!("Cannot deploy {}: file name is not valid UTF-8", entry.path.display());
				outcome.rejected.push(entry.rel_path);
				continue;
			}
			match hash_file(&entry.path, &entry.rel_path) {
				Ok(digest) => {
					outcome.manifest.insert(entry.rel_path, digest);
				}
				Err(e) => {
					warn!("Cannot hash {}: {}", entry.path.display(), e);
					outcome.unreadable.push(entry.rel_path);
				}
			}
		}
		Ok(outcome)
	}

	/// Scan and diff
	pub fn plan(&self, old: &Manifest) -> Result<TransferPlan, PipelineError> {
		Ok(reconcile(old, self.scan()?))
	}
}

/// Diff a scan against the previous manifest
///
/// A file that exists but cannot be read keeps its previous digest, so it
/// is neither re-uploaded nor pruned.
pub fn reconcile(old: &Manifest, scan: ScanOutcome) -> TransferPlan {
	let ScanOutcome { mut manifest, unreadable, rejected } = scan;
	for rel_path in unreadable {
		if let Some(digest) = old.get(&rel_path) {
			manifest.insert(rel_path, digest.clone());
		}
	}

	let delta = delta::compute(old, &manifest);
	for path in &delta.changed {
		debug!("[DELTA] Change: {}", path);
	}
	TransferPlan { manifest, delta, rejected }
}

/// Prune-then-sync engine over a `RemoteStore`
pub struct TransferEngine<'a> {
	planner: SourcePlanner,
	policy: CompressionPolicy,
	remote: &'a dyn RemoteStore,
	pause: Duration,
	observer: &'a dyn TransferObserver,
}

impl<'a> TransferEngine<'a> {
	/// Create an engine for the configured source tree
	pub fn new(config: &Config, remote: &'a dyn RemoteStore) -> Result<Self, PipelineError> {
		Ok(TransferEngine {
			planner: SourcePlanner::new(config)?,
			policy: CompressionPolicy::new(&config.compressible_extensions),
			remote,
			pause: config.pause(),
			observer: &NoObserver,
		})
	}

	/// Report per-file events to `observer`
	pub fn with_observer(mut self, observer: &'a dyn TransferObserver) -> Self {
		self.observer = observer;
		self
	}

	pub fn planner(&self) -> &SourcePlanner {
		&self.planner
	}

	/// Scan and diff without touching the remote
	pub fn plan(&self, old: &Manifest) -> Result<TransferPlan, PipelineError> {
		self.planner.plan(old)
	}

	/// Run prune then sync and return the reconciled manifest
	///
	/// Only setup failures (missing source tree) are returned as errors;
	/// every per-file failure is isolated and recorded in the report.
	pub async fn run(&self, old: &Manifest) -> Result<TransferReport, PipelineError> {
		let TransferPlan { manifest: new_scan, delta, rejected } = self.plan(old)?;
		info!(
			"Scan complete. {} files tracked, {} queued, {} to prune.",
			new_scan.len(),
			delta.changed.len(),
			delta.removed.len()
		);
		self.observer.on_event(&TransferEvent::Planned {
			files: new_scan.len(),
			changed: delta.changed.len(),
			removed: delta.removed.len(),
		});

		let mut report = TransferReport { manifest: new_scan, ..TransferReport::default() };

		for rel_path in rejected {
			let object = self.policy.object_name(&rel_path);
			let reason = "file name is not valid UTF-8".to_string();
			error!("[FAIL] Sync failed: {} | {}", object, reason);
			self.observer
				.on_event(&TransferEvent::Failed { object: object.clone(), reason: reason.clone() });
			report.failed.push(TransferFailure { rel_path, object, reason });
		}

		self.prune(&delta.removed, &mut report).await;

		for rel_path in &delta.changed {
			let target = self.policy.target(self.planner.source_dir(), rel_path);
			self.sync_one(&target, old, &mut report).await;
		}

		report.delta = delta;
		info!("Transfer finished: {}", report.summary());
		Ok(report)
	}

	/// Delete remote copies of files that vanished locally (best-effort)
	async fn prune(&self, removed: &[String], report: &mut TransferReport) {
		for rel_path in removed {
			let object = self.policy.object_name(rel_path);
			warn!("[PRUNE] Deleting: {}", object);

			match self.remote.delete(&object).await {
				Ok(()) => {
					self.observer.on_event(&TransferEvent::Pruned { object: object.clone() });
					report.pruned.push(object);
				}
				Err(e) => {
					error!("[PRUNE] Failed: {} | {}", object, e);
					self.observer.on_event(&TransferEvent::PruneFailed {
						object: object.clone(),
						reason: e.to_string(),
					});
					report.prune_failed.push(object);
				}
			}
		}
	}

	/// Upload one file and commit or roll back its manifest entry
	async fn sync_one(&self, target: &TransferTarget, old: &Manifest, report: &mut TransferReport) {
		info!("[SYNC] Sending {}...", target.object_name);

		let result = match self.payload(target).await {
			Ok(data) => {
				self.observer.on_event(&TransferEvent::Uploading {
					object: target.object_name.clone(),
					bytes: data.len(),
				});
				let result = self.remote.upload(&target.object_name, data).await;
				if !self.pause.is_zero() {
					tokio::time::sleep(self.pause).await;
				}
				result.map_err(|e| e.to_string())
			}
			Err(e) => Err(format!("cannot read {}: {}", target.source.display(), e)),
		};

		match result {
			Ok(receipt) => {
				info!("[ OK ] Synced {}", target.object_name);
				self.observer.on_event(&TransferEvent::Synced {
					object: target.object_name.clone(),
					status: receipt.status,
				});
				report.bytes_sent += receipt.bytes as u64;
				report.synced.push(target.object_name.clone());
			}
			Err(reason) => {
				error!("[FAIL] Sync failed: {} | {}", target.object_name, reason);
				// Never claim a file was deployed when it was not
				match old.get(&target.rel_path) {
					Some(previous) => {
						report.manifest.insert(target.rel_path.clone(), previous.clone());
					}
					None => {
						report.manifest.remove(&target.rel_path);
					}
				}
				self.observer.on_event(&TransferEvent::Failed {
					object: target.object_name.clone(),
					reason: reason.clone(),
				});
				report.failed.push(TransferFailure {
					rel_path: target.rel_path.clone(),
					object: target.object_name.clone(),
					reason,
				});
			}
		}
	}

	/// File content as it goes over the wire
	async fn payload(&self, target: &TransferTarget) -> std::io::Result<Vec<u8>> {
		let data = tokio::fs::read(&target.source).await?;
		if target.compressed {
			gzip(&data)
		} else {
			Ok(data)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::remote::DirectoryStore;
	use crate::types::FileDigest;

	fn config_for(source: &Path) -> Config {
		Config { source_dir: source.to_path_buf(), pause_ms: 0, ..Config::default() }
	}

	#[test]
	fn test_report_summary() {
		let report = TransferReport {
			synced: vec!["a.gz".into()],
			pruned: vec!["b".into()],
			bytes_sent: 10,
			..TransferReport::default()
		};
		assert!(report.is_clean());
		assert_eq!(report.summary(), "1 synced, 0 failed, 1 pruned, 0 prune failures, 10 bytes sent");
	}

	#[test]
	fn test_scan_missing_source_is_setup_error() {
		let dir = tempfile::tempdir().unwrap();
		let config = config_for(&dir.path().join("missing"));
		let planner = SourcePlanner::new(&config).unwrap();
		assert!(matches!(planner.scan(), Err(PipelineError::SourceMissing { .. })));
	}

	#[test]
	fn test_unreadable_file_keeps_previous_digest() {
		let mut old = Manifest::new();
		old.insert("logo.png".to_string(), FileDigest::from_hex("aa"));
		old.insert("index.html".to_string(), FileDigest::from_hex("bb"));

		let mut scan = ScanOutcome::default();
		scan.manifest.insert("index.html".to_string(), FileDigest::from_hex("cc"));
		scan.unreadable.push("logo.png".to_string());
		scan.unreadable.push("new.css".to_string());

		let plan = reconcile(&old, scan);
		// Not pruned, not re-sent
		assert_eq!(plan.delta.changed, vec!["index.html"]);
		assert!(plan.delta.removed.is_empty());
		assert_eq!(plan.manifest.get("logo.png"), Some(&FileDigest::from_hex("aa")));
		// Never deployed and unreadable: stays out until it can be read
		assert!(!plan.manifest.contains_key("new.css"));
	}

	#[test]
	fn test_invalid_exclude_pattern_fails_construction() {
		let dir = tempfile::tempdir().unwrap();
		let store = DirectoryStore::new(dir.path());
		let mut config = config_for(dir.path());
		config.exclude_patterns = vec!["[".to_string()];
		assert!(TransferEngine::new(&config, &store).is_err());
	}

	#[tokio::test]
	async fn test_run_to_directory_store() {
		let src = tempfile::tempdir().unwrap();
		let card = tempfile::tempdir().unwrap();
		std::fs::write(src.path().join("index.html"), b"<html></html>").unwrap();
		std::fs::write(src.path().join("logo.png"), b"\x89PNG").unwrap();

		let store = DirectoryStore::new(card.path());
		let engine = TransferEngine::new(&config_for(src.path()), &store).unwrap();
		let report = engine.run(&Manifest::new()).await.unwrap();

		assert!(report.is_clean());
		assert_eq!(report.synced, vec!["index.html.gz", "logo.png"]);
		assert!(card.path().join("index.html.gz").exists());
		assert_eq!(std::fs::read(card.path().join("logo.png")).unwrap(), b"\x89PNG");
		assert_eq!(report.manifest.len(), 2);
	}
}

// vim: ts=4
