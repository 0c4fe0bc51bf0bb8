//! File-level delta between the last deploy and the current scan

use std::fmt;

use crate::types::Manifest;

/// What has to happen on the remote to match the current scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaResult {
	/// New paths and paths whose digest changed, in scan order
	pub changed: Vec<String>,
	/// Paths that were deployed before but are gone locally
	pub removed: Vec<String>,
}

impl DeltaResult {
	pub fn is_empty(&self) -> bool {
		self.changed.is_empty() && self.removed.is_empty()
	}
}

impl fmt::Display for DeltaResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} changed, {} removed", self.changed.len(), self.removed.len())
	}
}

/// Compare the previous manifest with a fresh scan
///
/// The two output sets are disjoint: `changed` only holds keys of `new_scan`,
/// `removed` only keys missing from it.
pub fn compute(old: &Manifest, new_scan: &Manifest) -> DeltaResult {
	let changed = new_scan
		.iter()
		.filter(|(path, digest)| old.get(*path) != Some(*digest))
		.map(|(path, _)| path.clone())
		.collect();

	let removed =
		old.keys().filter(|path| !new_scan.contains_key(*path)).cloned().collect();

	DeltaResult { changed, removed }
}


// vim: ts=4
