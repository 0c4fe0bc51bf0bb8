//! # assetsync - web asset build and differential device deploy
//!
//! assetsync mirrors a website source tree into a filesystem image directory
//! (gzipping text assets), and pushes only changed files to an embedded
//! device's HTTP upload endpoint, tracking what was deployed in a manifest.
//!
//! ## Deploying
//!
//! ```rust,ignore
//! use assetsync::config::Config;
//! use assetsync::network::NmcliSwitcher;
//! use assetsync::pipeline::DeployPipeline;
//! use assetsync::remote::HttpRemoteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let url = config.resolve_remote_url()?;
//!     let remote = HttpRemoteStore::new(&url, config.upload_timeout(), config.delete_timeout())?;
//!     let switcher = NmcliSwitcher::default();
//!     DeployPipeline::new(&config, &remote, &switcher).run().await?;
//!     Ok(())
//! }
//! ```

pub mod callbacks;
pub mod compress;
pub mod config;
pub mod delta;
pub mod error;
pub mod hash;
pub mod logging;
pub mod manifest;
pub mod network;
pub mod pipeline;
pub mod remote;
pub mod scan;
pub mod transfer;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{BuildError, PipelineError, RemoteError, StateError};
pub use types::{BuildMode, DeployMode, FileDigest, Manifest, TransferTarget};

// vim: ts=4
