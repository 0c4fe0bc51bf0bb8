//! Wireless network switching around a deploy
//!
//! The pipelines only see `NetworkSwitcher`. `NmcliSwitcher` is thin glue over
//! NetworkManager's CLI; retry and fallback live entirely inside it.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

use crate::logging::*;

/// Capability to join a wireless network
#[async_trait]
pub trait NetworkSwitcher: Send + Sync {
	/// Join `ssid`; returns whether the host ended up connected
	async fn switch(&self, ssid: &str, password: Option<&str>) -> bool;
}

/// Switcher that does nothing (SD deploys, `--no-switch`, wired setups)
pub struct NoopSwitcher;

#[async_trait]
impl NetworkSwitcher for NoopSwitcher {
	async fn switch(&self, ssid: &str, _password: Option<&str>) -> bool {
		debug!("Network switching disabled, staying off {}", ssid);
		true
	}
}

/// NetworkManager-based switcher
///
/// Unblocks the radio, forces a rescan, tries a saved profile first and
/// falls back to a fresh device-level connection.
pub struct NmcliSwitcher {
	/// Wait after a rescan for results to land in the OS cache
	pub scan_settle: Duration,
	/// Wait for DHCP after activating a saved profile
	pub profile_settle: Duration,
	/// Wait for DHCP after a fresh connection
	pub connect_settle: Duration,
}

impl Default for NmcliSwitcher {
	fn default() -> Self {
		NmcliSwitcher {
			scan_settle: Duration::from_secs(2),
			profile_settle: Duration::from_secs(3),
			connect_settle: Duration::from_secs(5),
		}
	}
}

impl NmcliSwitcher {
	async fn run(&self, program: &str, args: &[&str]) -> Result<String, String> {
		let output = Command::new(program)
			.args(args)
			.output()
			.await
			.map_err(|e| format!("cannot run {}: {}", program, e))?;
		if output.status.success() {
			Ok(String::from_utf8_lossy(&output.stdout).into_owned())
		} else {
			Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
		}
	}
}

#[async_trait]
impl NetworkSwitcher for NmcliSwitcher {
	async fn switch(&self, ssid: &str, password: Option<&str>) -> bool {
		info!("Network Switch Request: {}", ssid);

		if let Err(e) = self.run("rfkill", &["unblock", "wifi"]).await {
			warn!("Radio unblock warning: {}", e);
		}
		if let Err(e) = self.run("nmcli", &["radio", "wifi", "on"]).await {
			warn!("Radio enable warning: {}", e);
		}

		info!("Forcing Wi-Fi rescan to update network list...");
		if let Err(e) = self.run("nmcli", &["dev", "wifi", "rescan"]).await {
			warn!("Rescan trigger warning (proceeding anyway): {}", e);
		}
		tokio::time::sleep(self.scan_settle).await;

		// Saved profile first
		if self.run("nmcli", &["-t", "connection", "show", ssid]).await.is_ok() {
			info!("Saved profile '{}' found. Activating...", ssid);
			match self.run("nmcli", &["connection", "up", ssid]).await {
				Ok(_) => {
					info!("Restored saved connection: {}", ssid);
					tokio::time::sleep(self.profile_settle).await;
					return true;
				}
				Err(e) => warn!(
					"Could not activate saved profile (Error: {}). Attempting fresh connection...",
					e
				),
			}
		}

		info!("Attempting device-level connection to {}...", ssid);
		let mut args = vec!["dev", "wifi", "connect", ssid];
		if let Some(pw) = password {
			args.push("password");
			args.push(pw);
		}
		match self.run("nmcli", &args).await {
			Ok(_) => {
				info!("Connected to {}", ssid);
				tokio::time::sleep(self.connect_settle).await;
				true
			}
			Err(e) => {
				error!("Connection failed for {} | {}", ssid, e);
				false
			}
		}
	}
}


// vim: ts=4
