use std::fmt;
use std::path::{Path, PathBuf};

use super::StorageError;

/// A validated path relative to a storage root. It can never name anything
/// outside the root: absolute paths and `.`/`..` components are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StoragePath {
    segments: Vec<String>,
}

impl StoragePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated relative path. Empty segments are ignored.
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        if path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path) {
            return Err(invalid(path, "absolute paths are not allowed"));
        }
        let mut parsed = Self::root();
        for segment in path.split(['/', '\\']).filter(|s| !s.is_empty()) {
            parsed = parsed.join(segment)?;
        }
        Ok(parsed)
    }

    pub fn join(&self, segment: &str) -> Result<Self, StorageError> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self {
            segments: parent.to_vec(),
        })
    }

    pub fn to_native(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        path.extend(&self.segments);
        path
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn validate_segment(segment: &str) -> Result<(), StorageError> {
    if segment.is_empty() {
        return Err(invalid(segment, "empty path segment"));
    }
    if segment == "." || segment == ".." {
        return Err(invalid(segment, "relative components are not allowed"));
    }
    if segment.contains(['/', '\\', '\0']) {
        return Err(invalid(segment, "separator inside a path segment"));
    }
    if has_drive_prefix(segment) {
        return Err(invalid(segment, "absolute paths are not allowed"));
    }
    Ok(())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn invalid(path: &str, reason: &'static str) -> StorageError {
    StorageError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_relative_paths() {
        let path = StoragePath::parse("Facebook/2025//10/post.md").unwrap();
        assert_eq!(path.segments().len(), 4);
        assert_eq!(path.to_string(), "Facebook/2025/10/post.md");
        assert_eq!(path.file_name(), Some("post.md"));
        assert_eq!(path.parent().unwrap().to_string(), "Facebook/2025/10");
    }

    #[test]
    fn escapes_from_the_root_are_rejected() {
        for bad in ["../x", "a/../../b", "/etc/passwd", "C:\\Windows", "a/./b"] {
            assert!(
                matches!(StoragePath::parse(bad), Err(StorageError::InvalidPath { .. })),
                "{bad} should be rejected"
            );
        }
        assert!(StoragePath::root().join("a/b").is_err());
    }
}
