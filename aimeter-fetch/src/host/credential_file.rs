//! Credential files written by provider CLIs.
//!
//! Both CLIs can keep their tokens in a JSON file under the home directory
//! instead of the keychain.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::CredentialFileError;

/// Resolves a path relative to the user's home directory.
pub fn home_path(relative: impl AsRef<Path>) -> Result<PathBuf, CredentialFileError> {
    dirs::home_dir()
        .map(|home| home.join(relative))
        .ok_or(CredentialFileError::NoHomeDir)
}

/// Reads a JSON file, returning `Ok(None)` if it does not exist.
pub fn read_json(path: &Path) -> Result<Option<Value>, CredentialFileError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Credential file not found");
            return Ok(None);
        }
        Err(source) => {
            return Err(CredentialFileError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| CredentialFileError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Looks up a non-empty string at a key path, e.g. `["tokens", "access_token"]`.
pub fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_at() {
        let value = json!({"tokens": {"access_token": "abc", "empty": "  "}, "n": 1});

        assert_eq!(string_at(&value, &["tokens", "access_token"]), Some("abc".to_string()));
        assert_eq!(string_at(&value, &["tokens", "empty"]), None);
        assert_eq!(string_at(&value, &["tokens", "missing"]), None);
        assert_eq!(string_at(&value, &["n"]), None);
    }

    #[test]
    fn test_read_json_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_json(&dir.path().join("auth.json")).unwrap().is_none());
    }

    #[test]
    fn test_read_json_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(read_json(&path), Err(CredentialFileError::Json { .. })));
    }

    #[test]
    fn test_read_json_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, r#"{"token": "t"}"#).unwrap();

        let value = read_json(&path).unwrap().unwrap();
        assert_eq!(string_at(&value, &["token"]), Some("t".to_string()));
    }
}
