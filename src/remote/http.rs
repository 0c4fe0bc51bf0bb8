//! HTTP transport to the device's upload endpoint

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::{RemoteResult, RemoteStore, UploadReceipt};
use crate::error::RemoteError;
use crate::logging::*;

/// Header carrying the object's full path; the multipart filename is only
/// the last path component
pub const FILE_PATH_HEADER: &str = "X-File-Path";

/// Endpoint path (relative to the base URL) for uploads and deletes
pub const UPLOAD_ENDPOINT: &str = "upload";

/// Device upload endpoint: `POST {base}/upload` and `DELETE {base}/upload`
pub struct HttpRemoteStore {
	client: Client,
	base_url: String,
	upload_timeout: Duration,
	delete_timeout: Duration,
}

impl HttpRemoteStore {
	/// Create a store for `base_url` with per-request timeouts
	pub fn new(
		base_url: &str,
		upload_timeout: Duration,
		delete_timeout: Duration,
	) -> RemoteResult<Self> {
		let client = Client::builder()
			.build()
			.map_err(|e| RemoteError::ClientSetup { message: e.to_string() })?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
			upload_timeout,
			delete_timeout,
		})
	}

	/// Full endpoint URL
	pub fn endpoint(&self) -> String {
		format!("{}/{}", self.base_url, UPLOAD_ENDPOINT)
	}

	fn request_error(object: &str, e: reqwest::Error) -> RemoteError {
		if e.is_timeout() {
			RemoteError::Timeout { object: object.to_string() }
		} else {
			RemoteError::Request { object: object.to_string(), source: Box::new(e) }
		}
	}
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
	fn describe(&self) -> String {
		self.endpoint()
	}

	async fn upload(&self, object_name: &str, data: Vec<u8>) -> RemoteResult<UploadReceipt> {
		let bytes = data.len();
		let file_name = object_name.rsplit('/').next().unwrap_or(object_name).to_string();
		let form = Form::new().part("file", Part::bytes(data).file_name(file_name));

		let response = self
			.client
			.post(self.endpoint())
			.header(FILE_PATH_HEADER, object_name)
			.multipart(form)
			.timeout(self.upload_timeout)
			.send()
			.await
			.map_err(|e| Self::request_error(object_name, e))?;

		let status = response.status();
		if status.is_success() {
			debug!("Upload of {} acknowledged ({})", object_name, status);
			Ok(UploadReceipt { status: status.as_u16(), bytes })
		} else {
			Err(RemoteError::Rejected { object: object_name.to_string(), status: status.as_u16() })
		}
	}

	async fn delete(&self, object_name: &str) -> RemoteResult<()> {
		let response = self
			.client
			.delete(self.endpoint())
			.header(FILE_PATH_HEADER, object_name)
			.timeout(self.delete_timeout)
			.send()
			.await
			.map_err(|e| Self::request_error(object_name, e))?;

		let status = response.status();
		if status.is_success() || status == StatusCode::NOT_FOUND {
			Ok(())
		} else {
			Err(RemoteError::Rejected { object: object_name.to_string(), status: status.as_u16() })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_endpoint_trims_trailing_slash() {
		let store = HttpRemoteStore::new(
			"http://192.168.4.1/",
			Duration::from_secs(15),
			Duration::from_secs(5),
		)
		.unwrap();
		assert_eq!(store.endpoint(), "http://192.168.4.1/upload");
		assert_eq!(store.describe(), "http://192.168.4.1/upload");
	}

	#[tokio::test]
	async fn test_unreachable_host_is_an_error_not_a_panic() {
		// Port 9 on localhost: nothing listens there in CI
		let store = HttpRemoteStore::new(
			"http://127.0.0.1:9",
			Duration::from_secs(2),
			Duration::from_secs(2),
		)
		.unwrap();
		let err = store.upload("index.html.gz", b"x".to_vec()).await.unwrap_err();
		assert_eq!(err.object(), Some("index.html.gz"));
		assert!(store.delete("old.css.gz").await.is_err());
	}
}

// vim: ts=4
