//! Path validation functions

use std::path::{Component, Path};

use super::ValidationError;

/// Check if a path is safe (no parent directory references)
pub fn is_path_safe(path: &Path) -> bool {
	!path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Validate a path is safe
pub fn validate_path_safe(path: &Path) -> Result<(), ValidationError> {
	if !is_path_safe(path) {
		return Err(ValidationError::PathError(
			"Path contains parent directory reference (..)".to_string(),
		));
	}
	Ok(())
}

/// Validate that path is relative (not absolute)
pub fn validate_path_relative(path: &Path) -> Result<(), ValidationError> {
	if path.is_absolute() || path.has_root() {
		return Err(ValidationError::PathError(format!(
			"Path must be relative, got absolute path: {:?}",
			path
		)));
	}
	Ok(())
}

/// Validate a remote object name before it is mapped onto a local directory
///
/// Object names are `/`-separated relative paths; they must stay below the
/// target root.
pub fn validate_object_name(name: &str) -> Result<(), ValidationError> {
	if name.is_empty() {
		return Err(ValidationError::PathError("Empty object name".to_string()));
	}
	let path = Path::new(name);
	validate_path_relative(path)?;
	validate_path_safe(path)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_path_safe_normal() {
		assert!(is_path_safe(Path::new("file.txt")));
		assert!(is_path_safe(Path::new("dir/file.txt")));
		assert!(is_path_safe(Path::new("a/b/c/file.txt")));
	}

	#[test]
	fn test_is_path_safe_with_parent() {
		assert!(!is_path_safe(Path::new("../file.txt")));
		assert!(!is_path_safe(Path::new("dir/../file.txt")));
	}

	#[test]
	fn test_validate_path_relative_err() {
		let result = validate_path_relative(Path::new("/absolute/path"));
		assert!(result.unwrap_err().to_string().contains("must be relative"));
	}

	#[test]
	fn test_validate_object_name() {
		assert!(validate_object_name("css/style.css.gz").is_ok());
		assert!(validate_object_name("logo.png").is_ok());
		assert!(validate_object_name("").is_err());
		assert!(validate_object_name("/etc/passwd").is_err());
		assert!(validate_object_name("../escape.txt").is_err());
	}
}

// vim: ts=4
