use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Maximum key length accepted by S3-compatible stores.
const MAX_KEY_LEN: usize = 1024;

/// A validated object-store key made of `/`-separated segments.
///
/// Keys never start or end with `/`, never contain empty, `.` or `..`
/// segments, and never contain backslashes or control characters, so they
/// map safely onto both bucket keys and filesystem paths.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Parse and validate a key string.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if s.is_empty() {
            return Err(StorageError::InvalidKey("key is empty".into()));
        }
        if s.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey(format!(
                "key exceeds {MAX_KEY_LEN} bytes"
            )));
        }
        if s.chars().any(|c| c.is_control() || c == '\\') {
            return Err(StorageError::InvalidKey(
                "key contains control characters or backslashes".into(),
            ));
        }
        for segment in s.split('/') {
            match segment {
                "" => {
                    return Err(StorageError::InvalidKey(format!(
                        "key has an empty segment: {s}"
                    )));
                }
                "." | ".." => {
                    return Err(StorageError::InvalidKey(format!(
                        "key has a relative segment: {s}"
                    )));
                }
                _ => {}
            }
        }
        Ok(Self(s.to_owned()))
    }

    /// A fresh, never-reused key for a PNG image owned by `user_id`:
    /// `users/{user_id}/images/{uuid}.png`.
    pub fn user_image(user_id: i32) -> Self {
        Self(format!("users/{user_id}/images/{}.png", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing path segment, used as the download filename.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({})", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ObjectKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
