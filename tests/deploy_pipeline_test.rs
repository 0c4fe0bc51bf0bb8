//! Deploy pipeline tests with a scripted network switcher
//!
//! Covers network switch ordering, setup failures aborting before any
//! transfer, the deploy lock, dry runs and manifest persistence.

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

use assetsync::config::Config;
use assetsync::error::PipelineError;
use assetsync::manifest::{ManifestStore, StateLock};
use assetsync::network::{NetworkSwitcher, NoopSwitcher};
use assetsync::pipeline::{DeployOutcome, DeployPipeline};
use assetsync::remote::DirectoryStore;

// ============================================================================
// Helpers
// ============================================================================

/// Switcher that records every request and fails for listed SSIDs
#[derive(Default)]
struct RecordingSwitcher {
	requests: Mutex<Vec<String>>,
	unreachable: Vec<String>,
}

impl RecordingSwitcher {
	fn requests(&self) -> Vec<String> {
		self.requests.lock().unwrap().clone()
	}
}

#[async_trait]
impl NetworkSwitcher for RecordingSwitcher {
	async fn switch(&self, ssid: &str, _password: Option<&str>) -> bool {
		self.requests.lock().unwrap().push(ssid.to_string());
		!self.unreachable.iter().any(|s| s == ssid)
	}
}

fn write(root: &Path, rel: &str, content: &[u8]) {
	let path = root.join(rel);
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).unwrap();
	}
	fs::write(path, content).unwrap();
}

fn setup() -> (TempDir, Config) {
	let dir = TempDir::new().unwrap();
	let root = dir.path();
	write(root, "site/index.html", b"<html></html>");
	write(root, "site/logo.png", b"\x89PNG");

	let config = Config {
		source_dir: root.join("site"),
		manifest_file: root.join(".file_hashes.json"),
		lock_file: root.join(".assetsync.lock"),
		pause_ms: 0,
		switch_network: true,
		device_ssid: "Device_AP".to_string(),
		home_ssid: Some("HomeNet".to_string()),
		..Config::default()
	};
	(dir, config)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_deploy_switches_transfers_and_restores() {
	let (dir, config) = setup();
	let card = dir.path().join("card");
	let remote = DirectoryStore::new(&card);
	let switcher = RecordingSwitcher::default();

	let outcome = DeployPipeline::new(&config, &remote, &switcher).run().await.unwrap();

	let report = match outcome {
		DeployOutcome::Completed(report) => report,
		other => panic!("expected completed deploy, got {:?}", other),
	};
	assert!(report.is_clean());
	assert_eq!(switcher.requests(), vec!["Device_AP", "HomeNet"]);
	assert!(card.join("index.html.gz").exists());
	assert!(card.join("logo.png").exists());

	let saved = ManifestStore::new(&config.manifest_file).load().await;
	assert_eq!(saved, report.manifest);
	assert!(!config.lock_file.exists());
}

#[tokio::test]
async fn test_switch_failure_aborts_before_transfer() {
	let (dir, config) = setup();
	let card = dir.path().join("card");
	let remote = DirectoryStore::new(&card);
	let switcher =
		RecordingSwitcher { unreachable: vec!["Device_AP".to_string()], ..Default::default() };

	let err = DeployPipeline::new(&config, &remote, &switcher).run().await.unwrap_err();

	assert!(matches!(err, PipelineError::NetworkSwitchFailed { .. }));
	assert_eq!(switcher.requests(), vec!["Device_AP"]);
	assert!(!card.exists());
	assert!(!config.manifest_file.exists());
	assert!(!config.lock_file.exists());
}

#[tokio::test]
async fn test_missing_device_ssid_is_config_error() {
	let (dir, mut config) = setup();
	config.device_ssid = String::new();
	let remote = DirectoryStore::new(dir.path().join("card"));
	let switcher = RecordingSwitcher::default();

	let err = DeployPipeline::new(&config, &remote, &switcher).run().await.unwrap_err();
	assert!(matches!(err, PipelineError::InvalidConfig { .. }));
	assert!(switcher.requests().is_empty());
}

#[tokio::test]
async fn test_missing_source_aborts_without_switching() {
	let (dir, mut config) = setup();
	config.source_dir = dir.path().join("nope");
	let remote = DirectoryStore::new(dir.path().join("card"));
	let switcher = RecordingSwitcher::default();

	let err = DeployPipeline::new(&config, &remote, &switcher).run().await.unwrap_err();
	assert!(matches!(err, PipelineError::SourceMissing { .. }));
	assert!(switcher.requests().is_empty());
}

#[tokio::test]
async fn test_held_lock_rejects_second_deploy() {
	let (dir, config) = setup();
	let remote = DirectoryStore::new(dir.path().join("card"));
	let _held = StateLock::acquire(&config.lock_file).unwrap();

	let err = DeployPipeline::new(&config, &remote, &NoopSwitcher).run().await.unwrap_err();
	assert!(matches!(err, PipelineError::State(_)));
	assert!(!dir.path().join("card").exists());
}

#[tokio::test]
async fn test_dry_run_sends_nothing() {
	let (dir, config) = setup();
	let card = dir.path().join("card");
	let remote = DirectoryStore::new(&card);
	let switcher = RecordingSwitcher::default();

	let outcome =
		DeployPipeline::new(&config, &remote, &switcher).dry_run(true).run().await.unwrap();

	match outcome {
		DeployOutcome::Planned { delta, manifest, rejected } => {
			assert_eq!(delta.changed, vec!["index.html", "logo.png"]);
			assert_eq!(manifest.len(), 2);
			assert!(rejected.is_empty());
		}
		other => panic!("expected plan, got {:?}", other),
	}
	assert!(switcher.requests().is_empty());
	assert!(!card.exists());
	assert!(!config.manifest_file.exists());
}

#[tokio::test]
async fn test_redeploy_only_sends_changes() {
	let (dir, mut config) = setup();
	config.switch_network = false;
	let card = dir.path().join("card");
	let remote = DirectoryStore::new(&card);

	DeployPipeline::new(&config, &remote, &NoopSwitcher).run().await.unwrap();

	write(dir.path(), "site/logo.png", b"new logo");
	fs::remove_file(dir.path().join("site/index.html")).unwrap();

	let report = match DeployPipeline::new(&config, &remote, &NoopSwitcher).run().await.unwrap() {
		DeployOutcome::Completed(report) => report,
		other => panic!("expected completed deploy, got {:?}", other),
	};
	assert_eq!(report.synced, vec!["logo.png"]);
	assert_eq!(report.pruned, vec!["index.html.gz"]);
	assert!(!card.join("index.html.gz").exists());
	assert_eq!(fs::read(card.join("logo.png")).unwrap(), b"new logo");

	let saved = ManifestStore::new(&config.manifest_file).load().await;
	assert_eq!(saved.keys().collect::<Vec<_>>(), vec!["logo.png"]);
}

#[tokio::test]
async fn test_card_deploy_does_not_mark_device_as_synced() {
	let (dir, mut config) = setup();
	config.switch_network = false;
	let card = dir.path().join("card");
	let device = dir.path().join("device");

	let card_store = DirectoryStore::new(&card);
	let pipeline = DeployPipeline::new(&config, &card_store, &NoopSwitcher)
		.with_manifest_file(config.sd_manifest_file(&card));
	assert_eq!(pipeline.manifest_file(), card.join(".file_hashes.json"));
	pipeline.run().await.unwrap();
	assert!(card.join(".file_hashes.json").exists());
	assert!(!config.manifest_file.exists());

	let device_store = DirectoryStore::new(&device);
	let outcome = DeployPipeline::new(&config, &device_store, &NoopSwitcher).run().await.unwrap();
	let report = match outcome {
		DeployOutcome::Completed(report) => report,
		other => panic!("expected completed deploy, got {:?}", other),
	};
	assert_eq!(report.synced, vec!["index.html.gz", "logo.png"]);
	assert!(device.join("index.html.gz").exists());

	// A second card deploy still sees the card as current
	let again = DeployPipeline::new(&config, &card_store, &NoopSwitcher)
		.with_manifest_file(config.sd_manifest_file(&card))
		.run()
		.await
		.unwrap();
	match again {
		DeployOutcome::Completed(report) => assert!(report.synced.is_empty()),
		other => panic!("expected completed deploy, got {:?}", other),
	}
}

// vim: ts=4
