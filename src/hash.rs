//! Content hashing: per-file digests and whole-tree fingerprints

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::logging::*;
use crate::scan::{ScanEntry, Scanner};
use crate::types::FileDigest;

/// Read buffer size; the digest does not depend on it
pub const CHUNK_SIZE: usize = 8192;

/// Digest of in-memory content stored at `rel_path`
pub fn hash_bytes(data: &[u8], rel_path: &str) -> FileDigest {
	let mut hasher = blake3::Hasher::new();
	hasher.update(data);
	hasher.update(rel_path.as_bytes());
	FileDigest::from_hasher(&hasher)
}

/// Digest of a file's content followed by its relative path
///
/// The path is part of the input, so a rename shows up as a change.
pub fn hash_file(path: &Path, rel_path: &str) -> io::Result<FileDigest> {
	let mut hasher = blake3::Hasher::new();
	update_from_file(&mut hasher, path)?;
	hasher.update(rel_path.as_bytes());
	Ok(FileDigest::from_hasher(&hasher))
}

/// Fingerprint of a whole tree, used to decide whether a rebuild is needed
///
/// Files are visited in sorted order and each contributes its bytes and then
/// its relative path. A missing root yields `FileDigest::empty()`. Files that
/// cannot be read are skipped with a warning.
pub fn hash_tree(root: &Path) -> FileDigest {
	if !root.exists() {
		return FileDigest::empty();
	}

	let entries = match Scanner::new().scan(root) {
		Ok(entries) => entries,
		Err(e) => {
			warn!("Cannot list {}: {} (hashing as empty tree)", root.display(), e);
			Vec::new()
		}
	};

	hash_entries(&entries)
}

/// Fold already-listed entries into a tree fingerprint, in the given order
///
/// An entry that cannot be opened or read (vanished since listing, permission
/// denied) contributes nothing.
pub fn hash_entries(entries: &[ScanEntry]) -> FileDigest {
	let mut hasher = blake3::Hasher::new();
	for entry in entries {
		// Hash into a copy so a read that fails halfway leaves no trace
		let mut attempt = hasher.clone();
		match update_from_file(&mut attempt, &entry.path) {
			Ok(()) => {
				attempt.update(entry.rel_path.as_bytes());
				hasher = attempt;
			}
			Err(e) => warn!("Skipping unreadable file {}: {}", entry.path.display(), e),
		}
	}
	FileDigest::from_hasher(&hasher)
}

fn update_from_file(hasher: &mut blake3::Hasher, path: &Path) -> io::Result<()> {
	let mut file = File::open(path)?;
	let mut buffer = [0u8; CHUNK_SIZE];
	loop {
		let n = file.read(&mut buffer)?;
		if n == 0 {
			return Ok(());
		}
		hasher.update(&buffer[..n]);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn test_hash_file_matches_hash_bytes() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("a.txt");
		fs::write(&path, b"hello world").unwrap();

		assert_eq!(hash_file(&path, "a.txt").unwrap(), hash_bytes(b"hello world", "a.txt"));
	}

	#[test]
	fn test_chunking_does_not_change_digest() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("big.bin");
		let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
		fs::write(&path, &data).unwrap();

		assert_eq!(hash_file(&path, "big.bin").unwrap(), hash_bytes(&data, "big.bin"));
	}

	#[test]
	fn test_path_is_part_of_digest() {
		assert_ne!(hash_bytes(b"same", "a.css"), hash_bytes(b"same", "b.css"));
	}

	#[test]
	fn test_digest_is_hex() {
		let d = hash_bytes(b"", "");
		assert_eq!(d.as_str().len(), 64);
		assert!(d.as_str().chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn test_hash_tree_missing_root() {
		let dir = tempfile::tempdir().unwrap();
		assert!(hash_tree(&dir.path().join("missing")).is_empty());
	}

	#[test]
	fn test_hash_tree_deterministic_across_creation_order() {
		let a = tempfile::tempdir().unwrap();
		let b = tempfile::tempdir().unwrap();

		for name in &["x.txt", "sub/y.txt", "a.txt"] {
			let p = a.path().join(name);
			fs::create_dir_all(p.parent().unwrap()).unwrap();
			fs::write(p, name.as_bytes()).unwrap();
		}
		for name in &["a.txt", "x.txt", "sub/y.txt"] {
			let p = b.path().join(name);
			fs::create_dir_all(p.parent().unwrap()).unwrap();
			fs::write(p, name.as_bytes()).unwrap();
		}

		assert_eq!(hash_tree(a.path()), hash_tree(b.path()));
		assert_eq!(hash_tree(a.path()), hash_tree(a.path()));
	}

	#[test]
	fn test_hash_tree_sees_content_and_renames() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("a.txt"), b"one").unwrap();
		let before = hash_tree(dir.path());

		fs::rename(dir.path().join("a.txt"), dir.path().join("b.txt")).unwrap();
		let renamed = hash_tree(dir.path());
		assert_ne!(before, renamed);

		fs::write(dir.path().join("b.txt"), b"two").unwrap();
		assert_ne!(renamed, hash_tree(dir.path()));
	}

	#[test]
	fn test_unreadable_entry_is_skipped() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("a.txt"), b"one").unwrap();
		fs::write(dir.path().join("c.txt"), b"three").unwrap();
		let listed = Scanner::new().scan(dir.path()).unwrap();

		// Listed, then gone before it could be opened
		let mut with_missing = listed.clone();
		with_missing.insert(
			1,
			ScanEntry {
				path: dir.path().join("b.txt"),
				rel: "b.txt".into(),
				rel_path: "b.txt".to_string(),
			},
		);
		assert_eq!(hash_entries(&with_missing), hash_entries(&listed));
		assert_eq!(hash_entries(&listed), hash_tree(dir.path()));

		// A directory where a file was expected cannot be read either
		fs::create_dir(dir.path().join("b.txt")).unwrap();
		assert_eq!(hash_entries(&with_missing), hash_entries(&listed));
	}

	#[test]
	fn test_hash_tree_empty_dir_is_not_sentinel() {
		let dir = tempfile::tempdir().unwrap();
		assert!(!hash_tree(dir.path()).is_empty());
	}
}

// vim: ts=4
