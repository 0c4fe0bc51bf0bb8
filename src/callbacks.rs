//! Callback traits for per-file transfer events

/// Events emitted by the transfer engine, in the order things happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
	/// Scan and delta finished
	Planned { files: usize, changed: usize, removed: usize },

	/// Remote copy of a vanished file was deleted
	Pruned { object: String },

	/// Deleting a vanished file failed (best-effort, not retried)
	PruneFailed { object: String, reason: String },

	/// Upload about to start
	Uploading { object: String, bytes: usize },

	/// Upload acknowledged by the remote
	Synced { object: String, status: u16 },

	/// Upload failed; the manifest keeps the previous digest
	Failed { object: String, reason: String },
}

/// Trait for receiving transfer events
pub trait TransferObserver: Send + Sync {
	fn on_event(&self, _event: &TransferEvent) {}
}

impl<T: Fn(&TransferEvent) + Send + Sync> TransferObserver for T {
	fn on_event(&self, event: &TransferEvent) {
		self(event);
	}
}

/// Default observer that ignores every event
pub struct NoObserver;

impl TransferObserver for NoObserver {}


// vim: ts=4
