//! Credential and runtime configuration loading

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default credentials file, matching the deployment layout
pub const DEFAULT_CREDENTIALS_PATH: &str = "config.json";

/// Remote provider credentials, read once at process start
///
/// The file is JSON with the provider's field names:
/// `{"accessKeyId": "...", "secretAccessKey": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    /// Load credentials from a JSON file
    ///
    /// A missing or malformed file is a fatal startup error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read credentials file {}: {}", path.display(), e),
        })?;

        let creds: Credentials = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!(
                "failed to parse credentials file {}: {}",
                path.display(),
                e
            ),
        })?;

        if creds.access_key_id.is_empty() || creds.secret_access_key.is_empty() {
            return Err(Error::Config {
                message: format!("credentials file {} has empty fields", path.display()),
            });
        }

        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"accessKeyId": "AKIATEST", "secretAccessKey": "s3cr3t"}}"#
        )
        .unwrap();

        let creds = Credentials::load(file.path()).unwrap();
        assert_eq!(creds.access_key_id, "AKIATEST");
        assert_eq!(creds.secret_access_key, "s3cr3t");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Credentials::load("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();

        let err = Credentials::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_missing_field_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"accessKeyId": "AKIATEST"}}"#).unwrap();

        let err = Credentials::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
