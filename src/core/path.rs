//! Slash-separated key paths into the record store.
//!
//! Segments may not be empty and may not contain any of `. $ # [ ] /` or
//! control characters, matching the realtime store's key rules.

use crate::core::{CmsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const FORBIDDEN: &[char] = &['.', '$', '#', '[', ']', '/'];

/// Absolute location inside the store tree. The empty path is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse `"pricing/monthly"` style paths. Leading and trailing slashes are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        trimmed
            .split('/')
            .try_fold(Self::root(), |path, segment| path.child(segment))
    }

    pub fn child(&self, segment: &str) -> Result<Self> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Join a record key, then a field name.
    pub fn field(&self, key: &RecordKey, field: &str) -> Result<Self> {
        self.child(key.as_str())?.child(field)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `self` equals `other` or contains it.
    pub fn contains(&self, other: &StorePath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// A write at one path is visible to a subscriber of the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(CmsError::InvalidPath("empty path segment".into()));
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| FORBIDDEN.contains(c) || c.is_control())
    {
        return Err(CmsError::InvalidPath(format!(
            "segment '{}' contains forbidden character {:?}",
            segment, bad
        )));
    }
    Ok(())
}

/// Store-assigned record identifier. Never generated by editors for new records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_segment(&key)?;
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_paths() {
        let path = StorePath::parse("/pricing/monthly/").unwrap();
        assert_eq!(path.segments(), &["pricing".to_string(), "monthly".to_string()]);
        assert_eq!(path.to_string(), "pricing/monthly");
        assert_eq!(path.last(), Some("monthly"));
    }

    #[test]
    fn empty_string_is_root() {
        assert!(StorePath::parse("").unwrap().is_root());
        assert!(StorePath::parse("/").unwrap().is_root());
    }

    #[test]
    fn rejects_forbidden_characters() {
        assert!(StorePath::parse("features/a.b").is_err());
        assert!(StorePath::parse("features//x").is_err());
        assert!(RecordKey::new("with$dollar").is_err());
        assert!(RecordKey::new("").is_err());
    }

    #[test]
    fn overlap_is_symmetric_prefix_relation() {
        let portfolio = StorePath::parse("portfolio").unwrap();
        let field = StorePath::parse("portfolio/-Nabc/order").unwrap();
        let features = StorePath::parse("features").unwrap();

        assert!(portfolio.overlaps(&field));
        assert!(field.overlaps(&portfolio));
        assert!(!features.overlaps(&portfolio));
        assert!(StorePath::root().overlaps(&features));
    }

    #[test]
    fn field_path_joins_key_and_field() {
        let key = RecordKey::new("-Nabc").unwrap();
        let path = StorePath::parse("features").unwrap().field(&key, "order").unwrap();
        assert_eq!(path.to_string(), "features/-Nabc/order");
        assert_eq!(path.parent().unwrap().to_string(), "features/-Nabc");
    }
}
