//! Deterministic directory walk shared by hashing, delta and build

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::logging::*;
use crate::validation::ValidationError;

/// A regular file found under the scan root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
	/// Path on disk, exactly as listed by the OS
	pub path: PathBuf,
	/// Native path relative to the root
	pub rel: PathBuf,
	/// `rel` with components joined by `/`; lossy if a name is not UTF-8
	pub rel_path: String,
}

impl ScanEntry {
	/// False when some component of the name is not valid UTF-8, in which
	/// case `rel_path` does not round-trip to the file on disk
	pub fn is_utf8(&self) -> bool {
		self.rel.to_str().is_some()
	}
}

/// Directory walker
///
/// Entries are visited depth-first with every directory's children sorted by
/// name, so the output never depends on the order the OS lists them in.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
	ignore_dirs: BTreeSet<String>,
	exclude: Option<GlobSet>,
}

impl Scanner {
	/// Scanner that visits every file
	pub fn new() -> Self {
		Self::default()
	}

	/// Skip directories with any of these names, at any depth
	pub fn with_ignore_dirs<S: AsRef<str>>(mut self, dirs: &[S]) -> Self {
		self.ignore_dirs = dirs.iter().map(|d| d.as_ref().to_string()).collect();
		self
	}

	/// Skip files whose relative path matches any of these globs
	pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self, ValidationError> {
		if patterns.is_empty() {
			self.exclude = None;
			return Ok(self);
		}

		let mut builder = GlobSetBuilder::new();
		for pattern in patterns {
			let glob = Glob::new(pattern)
				.map_err(|e| ValidationError::PatternError(format!("{}: {}", pattern, e)))?;
			builder.add(glob);
		}
		let set = builder.build().map_err(|e| {
			ValidationError::PatternError(format!("Failed to build pattern set: {}", e))
		})?;
		self.exclude = Some(set);
		Ok(self)
	}

	/// Walk `root` and return its files in deterministic order
	///
	/// Fails only if `root` itself cannot be listed. Unreadable subdirectories
	/// are logged and skipped.
	pub fn scan(&self, root: &Path) -> io::Result<Vec<ScanEntry>> {
		let mut out = Vec::new();
		let entries = sorted_entries(root)?;
		self.walk_entries("", Path::new(""), entries, &mut out);
		Ok(out)
	}

	fn walk_entries(
		&self,
		prefix: &str,
		rel_prefix: &Path,
		entries: Vec<fs::DirEntry>,
		out: &mut Vec<ScanEntry>,
	) {
		for entry in entries {
			let file_name = entry.file_name();
			let name = file_name.to_string_lossy().into_owned();
			let rel_path =
				if prefix.is_empty() { name.clone() } else { format!("{}/{}", prefix, name) };
			let rel = rel_prefix.join(&file_name);
			let path = entry.path();

			// Follow symlinks to decide what the entry is
			let meta = match fs::metadata(&path) {
				Ok(m) => m,
				Err(e) => {
					warn!("Cannot stat {}: {} (skipping)", path.display(), e);
					continue;
				}
			};

			if meta.is_dir() {
				if self.ignore_dirs.contains(&name) {
					debug!("Ignoring directory {}", rel_path);
					continue;
				}
				if entry.file_type().map(|t| t.is_symlink()).unwrap_or(false) {
					debug!("Not descending into symlinked directory {}", rel_path);
					continue;
				}
				match sorted_entries(&path) {
					Ok(children) => self.walk_entries(&rel_path, &rel, children, out),
					Err(e) => warn!("Cannot read directory {}: {} (skipping)", path.display(), e),
				}
			} else if meta.is_file() {
				if let Some(set) = &self.exclude {
					if set.is_match(&rel_path) {
						debug!("Excluded by pattern: {}", rel_path);
						continue;
					}
				}
				if rel.to_str().is_none() {
					debug!("Name is not valid UTF-8: {}", path.display());
				}
				out.push(ScanEntry { path, rel, rel_path });
			}
		}
	}
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
	let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
	entries.sort_by_key(|e| e.file_name());
	Ok(entries)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn touch(root: &Path, rel: &str, content: &[u8]) {
		let p = root.join(rel);
		fs::create_dir_all(p.parent().unwrap()).unwrap();
		fs::write(p, content).unwrap();
	}

	fn rel_paths(entries: &[ScanEntry]) -> Vec<&str> {
		entries.iter().map(|e| e.rel_path.as_str()).collect()
	}

	#[test]
	fn test_scan_sorted_and_slash_separated() {
		let dir = tempfile::tempdir().unwrap();
		touch(dir.path(), "z.txt", b"z");
		touch(dir.path(), "a.txt", b"a");
		touch(dir.path(), "css/style.css", b"body{}");
		touch(dir.path(), "css/b/deep.css", b"p{}");

		let entries = Scanner::new().scan(dir.path()).unwrap();
		assert_eq!(rel_paths(&entries), vec!["a.txt", "css/b/deep.css", "css/style.css", "z.txt"]);
		assert_eq!(entries[1].path, dir.path().join("css/b/deep.css"));
		assert_eq!(entries[1].rel, Path::new("css/b/deep.css"));
		assert!(entries.iter().all(ScanEntry::is_utf8));
	}

	#[test]
	fn test_ignore_dirs_at_any_depth() {
		let dir = tempfile::tempdir().unwrap();
		touch(dir.path(), ".git/HEAD", b"ref");
		touch(dir.path(), "vendor/lib/.git/config", b"x");
		touch(dir.path(), "vendor/lib/lib.js", b"x");
		touch(dir.path(), "index.html", b"<html>");

		let entries = Scanner::new().with_ignore_dirs(&[".git"]).scan(dir.path()).unwrap();
		assert_eq!(rel_paths(&entries), vec!["index.html", "vendor/lib/lib.js"]);
	}

	#[test]
	fn test_without_ignore_dirs_everything_is_visited() {
		let dir = tempfile::tempdir().unwrap();
		touch(dir.path(), ".git/HEAD", b"ref");
		let entries = Scanner::new().scan(dir.path()).unwrap();
		assert_eq!(rel_paths(&entries), vec![".git/HEAD"]);
	}

	#[test]
	fn test_exclude_patterns() {
		let dir = tempfile::tempdir().unwrap();
		touch(dir.path(), "notes.md", b"x");
		touch(dir.path(), "drafts/a.html", b"x");
		touch(dir.path(), "index.html", b"x");

		let scanner = Scanner::new()
			.with_exclude_patterns(&["*.md".to_string(), "drafts/**".to_string()])
			.unwrap();
		let entries = scanner.scan(dir.path()).unwrap();
		assert_eq!(rel_paths(&entries), vec!["index.html"]);
	}

	#[test]
	fn test_invalid_pattern() {
		let result = Scanner::new().with_exclude_patterns(&["a[".to_string()]);
		assert!(matches!(result, Err(ValidationError::PatternError(_))));
	}

	#[cfg(target_os = "linux")]
	#[test]
	fn test_non_utf8_name_keeps_real_path() {
		use std::ffi::OsStr;
		use std::os::unix::ffi::OsStrExt;

		let dir = tempfile::tempdir().unwrap();
		let raw = OsStr::from_bytes(b"caf\xe9.png");
		fs::create_dir_all(dir.path().join("img")).unwrap();
		fs::write(dir.path().join("img").join(raw), b"png").unwrap();

		let entries = Scanner::new().scan(dir.path()).unwrap();
		assert_eq!(entries.len(), 1);
		assert!(!entries[0].is_utf8());
		assert_eq!(entries[0].rel, Path::new("img").join(raw));
		assert_eq!(fs::read(&entries[0].path).unwrap(), b"png");
		assert_eq!(entries[0].rel_path, "img/caf\u{FFFD}.png");
	}

	#[test]
	fn test_missing_root_is_error() {
		let dir = tempfile::tempdir().unwrap();
		assert!(Scanner::new().scan(&dir.path().join("nope")).is_err());
	}
}

// vim: ts=4
