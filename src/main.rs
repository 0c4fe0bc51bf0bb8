use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use assetsync::config::Config;
use assetsync::logging::{error, info, init_tracing};
use assetsync::manifest::ManifestStore;
use assetsync::network::{NetworkSwitcher, NmcliSwitcher, NoopSwitcher};
use assetsync::pipeline::build::BuildOutcome;
use assetsync::pipeline::deploy::DeployOutcome;
use assetsync::pipeline::{BuildEngine, DeployPipeline};
use assetsync::remote::{DirectoryStore, HttpRemoteStore, RemoteStore};
use assetsync::transfer::SourcePlanner;
use assetsync::{BuildMode, DeployMode};

///////////////////////
// Utility functions //
///////////////////////

fn load_config(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
	let path = matches.get_one::<String>("config").map(PathBuf::from);
	let mut config = Config::load(path.as_deref())?;
	if let Some(source) = matches.get_one::<String>("source") {
		config.source_dir = PathBuf::from(source);
	}
	if matches.get_flag("verbose") {
		config.log_level = "debug".to_string();
	}
	Ok(config)
}

fn prompt_message() -> Result<Option<String>, Box<dyn Error>> {
	eprint!("Enter Commit Message: ");
	io::stderr().flush()?;
	let mut line = String::new();
	io::stdin().lock().read_line(&mut line)?;
	let line = line.trim();
	Ok(if line.is_empty() { None } else { Some(line.to_string()) })
}

//////////////
// Commands //
//////////////

fn cmd_build(config: &Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	let mode = if matches.get_flag("auto") { BuildMode::Automated } else { BuildMode::Interactive };
	let mut message = matches.get_one::<String>("message").cloned();
	if message.is_none() && mode == BuildMode::Interactive {
		message = prompt_message()?;
	}

	match BuildEngine::new(config).run(mode, message)? {
		BuildOutcome::Skipped { hash } => println!("skipped (unchanged, {})", hash),
		BuildOutcome::Rebuilt(summary) => {
			println!(
				"rebuilt {} files ({} gzipped) into {}",
				summary.files,
				summary.compressed,
				config.output_dir.display()
			);
			if let Some(backup) = summary.backup {
				println!("previous output saved to {}", backup.display());
			}
		}
	}
	Ok(())
}

async fn cmd_deploy(config: &mut Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	let mode: DeployMode = matches
		.get_one::<String>("mode")
		.map(|m| m.parse::<DeployMode>())
		.transpose()?
		.unwrap_or(DeployMode::Web);
	if matches.get_flag("no-switch") {
		config.switch_network = false;
	}
	if let Some(url) = matches.get_one::<String>("url") {
		config.remote_url = Some(url.clone());
	}

	// Resolve the target before touching the network
	let (remote, manifest_file): (Box<dyn RemoteStore>, PathBuf) = match mode {
		DeployMode::Web => {
			let url = config.resolve_remote_url()?;
			let store: Box<dyn RemoteStore> = Box::new(HttpRemoteStore::new(
				&url,
				config.upload_timeout(),
				config.delete_timeout(),
			)?);
			(store, config.manifest_file.clone())
		}
		DeployMode::Sd => {
			let target =
				matches.get_one::<String>("target").ok_or("deploy --mode sd requires --target")?;
			config.switch_network = false;
			let store: Box<dyn RemoteStore> = Box::new(DirectoryStore::new(target));
			(store, config.sd_manifest_file(Path::new(target)))
		}
	};
	let switcher: Box<dyn NetworkSwitcher> = if config.switch_network {
		Box::new(NmcliSwitcher::default())
	} else {
		Box::new(NoopSwitcher)
	};

	let outcome = DeployPipeline::new(config, remote.as_ref(), switcher.as_ref())
		.with_manifest_file(manifest_file)
		.dry_run(matches.get_flag("dry-run"))
		.run()
		.await?;

	match outcome {
		DeployOutcome::Planned { delta, rejected, .. } => {
			for path in &delta.changed {
				println!("~ {}", path);
			}
			for path in &delta.removed {
				println!("- {}", path);
			}
			for path in &rejected {
				println!("! {} (name is not UTF-8)", path);
			}
			println!("{}", delta);
		}
		DeployOutcome::Completed(report) => {
			for failure in &report.failed {
				eprintln!("FAILED {}: {}", failure.object, failure.reason);
			}
			println!("{}", report.summary());
			if !report.is_clean() {
				return Err("some files were not deployed; rerun to retry".into());
			}
		}
	}
	Ok(())
}

async fn cmd_status(config: &Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	let manifest_file = match matches.get_one::<String>("target") {
		Some(target) => config.sd_manifest_file(Path::new(target)),
		None => config.manifest_file.clone(),
	};
	let old = ManifestStore::new(manifest_file).load().await;
	let plan = SourcePlanner::new(config)?.plan(&old)?;
	let delta = &plan.delta;

	for path in &delta.changed {
		let marker = if old.contains_key(path) { "~" } else { "+" };
		println!("{} {}", marker, path);
	}
	for path in &delta.removed {
		println!("- {}", path);
	}
	for path in &plan.rejected {
		println!("! {} (name is not UTF-8)", path);
	}
	println!("{}", delta);
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("assetsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Web asset build and differential device deploy")
		.subcommand_required(true)
		.arg(Arg::new("config").short('c').long("config").value_name("FILE").help("Config file"))
		.arg(Arg::new("source").short('s').long("source").value_name("DIR").help("Source tree"))
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::SetTrue)
				.help("Debug logging"),
		)
		.subcommand(
			Command::new("build")
				.about("Rebuild the filesystem image directory from the source tree")
				.arg(
					Arg::new("auto")
						.long("auto")
						.action(ArgAction::SetTrue)
						.help("Skip when sources are unchanged (for build hooks)"),
				)
				.arg(Arg::new("message").short('m').long("message").help("Build message")),
		)
		.subcommand(
			Command::new("deploy")
				.about("Push changed files to the device")
				.arg(
					Arg::new("mode")
						.long("mode")
						.value_parser(["web", "sd"])
						.default_value("web")
						.help("Deploy over Wi-Fi or onto a mounted SD card"),
				)
				.arg(Arg::new("target").long("target").value_name("DIR").help("SD card mount"))
				.arg(Arg::new("url").long("url").help("Device base URL"))
				.arg(
					Arg::new("no-switch")
						.long("no-switch")
						.action(ArgAction::SetTrue)
						.help("Do not change Wi-Fi networks"),
				)
				.arg(
					Arg::new("dry-run")
						.long("dry-run")
						.action(ArgAction::SetTrue)
						.help("Show the delta without sending anything"),
				),
		)
		.subcommand(
			Command::new("status").about("Show files changed since the last deploy").arg(
				Arg::new("target")
					.long("target")
					.value_name("DIR")
					.help("Compare against the SD card at DIR instead of the device"),
			),
		)
		.get_matches();

	let mut config = load_config(&matches)?;
	init_tracing(&config.log_level);

	let result = match matches.subcommand() {
		Some(("build", sub)) => cmd_build(&config, sub),
		Some(("deploy", sub)) => cmd_deploy(&mut config, sub).await,
		Some(("status", sub)) => cmd_status(&config, sub).await,
		_ => Ok(()),
	};

	if let Err(e) = &result {
		error!("{}", e);
	} else {
		info!("Done.");
	}
	result
}

// vim: ts=4
