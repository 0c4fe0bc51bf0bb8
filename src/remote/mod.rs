//! Remote object store abstraction
//!
//! The transfer engine depends only on `RemoteStore`, never on a concrete
//! transport, so its delta and rollback logic can run against in-memory fakes.

use async_trait::async_trait;

use crate::error::RemoteError;

pub mod http;
pub mod local;

pub use http::HttpRemoteStore;
pub use local::DirectoryStore;

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Acknowledgement of a successful upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
	/// Status the remote answered with (HTTP status, or 200 for local stores)
	pub status: u16,
	/// Payload size actually sent
	pub bytes: usize,
}

/// Upload/delete capability of the deploy target
#[async_trait]
pub trait RemoteStore: Send + Sync {
	/// Human-readable description for logs
	fn describe(&self) -> String;

	/// Store `data` under `object_name`, replacing any previous object
	async fn upload(&self, object_name: &str, data: Vec<u8>) -> RemoteResult<UploadReceipt>;

	/// Delete `object_name`; deleting a missing object is not an error
	async fn delete(&self, object_name: &str) -> RemoteResult<()>;
}

// vim: ts=4
