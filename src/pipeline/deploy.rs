//! Differential deploy: network switch, transfer, manifest commit, switch back

use std::path::{Path, PathBuf};

use crate::callbacks::{NoObserver, TransferObserver};
use crate::config::Config;
use crate::delta::DeltaResult;
use crate::error::PipelineError;
use crate::logging::*;
use crate::manifest::{ManifestStore, StateLock};
use crate::network::NetworkSwitcher;
use crate::remote::RemoteStore;
use crate::transfer::{SourcePlanner, TransferEngine, TransferPlan, TransferReport};
use crate::types::Manifest;

/// What a deploy run did
#[derive(Debug, Clone)]
pub enum DeployOutcome {
	/// Dry run: the delta that would have been applied
	Planned { manifest: Manifest, delta: DeltaResult, rejected: Vec<String> },
	/// Transfer ran and the manifest was saved
	Completed(TransferReport),
}

pub struct DeployPipeline<'a> {
	config: &'a Config,
	remote: &'a dyn RemoteStore,
	switcher: &'a dyn NetworkSwitcher,
	observer: &'a dyn TransferObserver,
	manifest_file: PathBuf,
	dry_run: bool,
}

impl<'a> DeployPipeline<'a> {
	pub fn new(
		config: &'a Config,
		remote: &'a dyn RemoteStore,
		switcher: &'a dyn NetworkSwitcher,
	) -> Self {
		DeployPipeline {
			config,
			remote,
			switcher,
			observer: &NoObserver,
			manifest_file: config.manifest_file.clone(),
			dry_run: false,
		}
	}

	/// Track this target's state in `path` instead of the configured manifest
	///
	/// Every target needs its own manifest: it records what that remote
	/// holds, not what was last sent anywhere.
	pub fn with_manifest_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.manifest_file = path.into();
		self
	}

	pub fn manifest_file(&self) -> &Path {
		&self.manifest_file
	}

	pub fn with_observer(mut self, observer: &'a dyn TransferObserver) -> Self {
		self.observer = observer;
		self
	}

	/// Compute the delta only; no network, no manifest write
	pub fn dry_run(mut self, dry_run: bool) -> Self {
		self.dry_run = dry_run;
		self
	}

	/// Run the deploy
	///
	/// Setup failures (missing source, held lock, unreachable device network)
	/// abort before anything is sent. Once the device network was joined, the
	/// home network is restored even if the transfer stage fails.
	pub async fn run(&self) -> Result<DeployOutcome, PipelineError> {
		if !self.config.source_dir.is_dir() {
			return Err(PipelineError::SourceMissing {
				path: self.config.source_dir.display().to_string(),
			});
		}

		let store = ManifestStore::new(&self.manifest_file);

		if self.dry_run {
			let old = store.load().await;
			let TransferPlan { manifest, delta, rejected } =
				SourcePlanner::new(self.config)?.plan(&old)?;
			info!("Dry run: {}", delta);
			return Ok(DeployOutcome::Planned { manifest, delta, rejected });
		}

		let engine = TransferEngine::new(self.config, self.remote)?.with_observer(self.observer);

		let _lock = StateLock::acquire(&self.config.lock_file)?;

		let switched = self.config.switch_network;
		if switched {
			if self.config.device_ssid.is_empty() {
				return Err(PipelineError::InvalidConfig {
					message: "deviceSsid is required when switchNetwork is enabled".to_string(),
				});
			}
			if !self
				.switcher
				.switch(&self.config.device_ssid, self.config.device_password.as_deref())
				.await
			{
				return Err(PipelineError::NetworkSwitchFailed {
					ssid: self.config.device_ssid.clone(),
				});
			}
		}

		info!("Resolved Target: {}", self.remote.describe());
		let result = self.transfer(&engine, &store).await;

		if switched {
			self.restore_network().await;
		}

		let report = result?;
		if report.is_clean() {
			info!("Pipeline finished: {}", report.summary());
		} else {
			warn!("Pipeline finished with failures: {}", report.summary());
		}
		Ok(DeployOutcome::Completed(report))
	}

	async fn transfer(
		&self,
		engine: &TransferEngine<'_>,
		store: &ManifestStore,
	) -> Result<TransferReport, PipelineError> {
		let old = store.load().await;
		info!("Differential sync active. Tracking {} assets.", old.len());

		let report = engine.run(&old).await?;
		store.save(&report.manifest).await?;
		Ok(report)
	}

	async fn restore_network(&self) {
		let home = match &self.config.home_ssid {
			Some(ssid) if !ssid.is_empty() => ssid,
			_ => return,
		};
		info!("Reverting network: {}", home);
		if !self.switcher.switch(home, self.config.home_password.as_deref()).await {
			warn!("Could not reconnect to {}", home);
		}
	}
}

// vim: ts=4
