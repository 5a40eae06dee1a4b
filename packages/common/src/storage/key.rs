use std::fmt;

use super::error::StorageError;

const MAX_KEY_LEN: usize = 255;

/// A validated storage key: a flat file name safe to use as a path component.
///
/// Allowed characters are ASCII letters, digits, `-`, `_` and `.`; the key may
/// not start with a dot.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn parse(key: &str) -> Result<Self, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key cannot be empty".into()));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey(format!(
                "key exceeds {MAX_KEY_LEN} characters"
            )));
        }
        if key.starts_with('.') {
            return Err(StorageError::InvalidKey(
                "key cannot start with '.'".into(),
            ));
        }
        if let Some(c) = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(StorageError::InvalidKey(format!(
                "character {c:?} is not allowed"
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the first 2 characters, lower-cased (shard directory for filesystem layout).
    ///
    /// Single-character keys are padded with `_`.
    pub fn shard_prefix(&self) -> String {
        let mut prefix: String = self.0.chars().take(2).collect();
        while prefix.len() < 2 {
            prefix.push('_');
        }
        prefix.to_ascii_lowercase()
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
