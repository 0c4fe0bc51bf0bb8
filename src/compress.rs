//! Compression policy: which files get gzipped and what they are called

use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use crate::types::TransferTarget;

/// Suffix appended to the name of every compressed object
pub const GZIP_SUFFIX: &str = ".gz";

/// Extension set shared by the build and deploy pipelines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionPolicy {
	/// Lowercase, with leading dot
	extensions: BTreeSet<String>,
}

impl CompressionPolicy {
	/// Build a policy; entries may be given with or without the leading dot
	pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
		let extensions = extensions
			.iter()
			.map(|e| {
				let e = e.as_ref().trim().to_ascii_lowercase();
				if e.starts_with('.') {
					e
				} else {
					format!(".{}", e)
				}
			})
			.collect();
		CompressionPolicy { extensions }
	}

	/// Whether the file's final extension is in the set (case-insensitive)
	pub fn is_compressible(&self, rel_path: &str) -> bool {
		match Path::new(rel_path).extension().and_then(|e| e.to_str()) {
			Some(ext) => self.extensions.contains(&format!(".{}", ext.to_ascii_lowercase())),
			None => false,
		}
	}

	/// Remote/output name: the relative path, plus `.gz` when compressible
	pub fn object_name(&self, rel_path: &str) -> String {
		if self.is_compressible(rel_path) {
			format!("{}{}", rel_path, GZIP_SUFFIX)
		} else {
			rel_path.to_string()
		}
	}

	/// Full transfer description for a file under `root`
	pub fn target(&self, root: &Path, rel_path: &str) -> TransferTarget {
		TransferTarget {
			source: root.join(rel_path),
			rel_path: rel_path.to_string(),
			object_name: self.object_name(rel_path),
			compressed: self.is_compressible(rel_path),
		}
	}
}

/// Gzip a buffer in memory
pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
	let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
	encoder.write_all(data)?;
	encoder.finish()
}

/// Gzip `src` into `dest`, streaming
pub fn gzip_file(src: &Path, dest: &Path) -> io::Result<u64> {
	let mut reader = BufReader::new(File::open(src)?);
	let writer = BufWriter::new(File::create(dest)?);
	let mut encoder = GzEncoder::new(writer, Compression::default());
	let copied = io::copy(&mut reader, &mut encoder)?;
	encoder.finish()?.flush()?;
	Ok(copied)
}


// vim: ts=4
