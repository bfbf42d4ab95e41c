//! Credential loading: explicit flags, a JSON credentials file, or
//! `secret.json` in the working directory, in that order.

use crate::error::ScrapeError;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SECRET_FILE: &str = "secret.json";

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the credentials may come from, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    pub username: Option<String>,
    pub password: Option<String>,
    pub file: Option<PathBuf>,
    /// Fallback file tried when nothing else is given.
    pub default_file: Option<PathBuf>,
}

impl CredentialSource {
    pub fn resolve(&self) -> Result<Credentials, ScrapeError> {
        if let Some(file) = &self.file {
            return from_file(file);
        }

        match (&self.username, &self.password) {
            (Some(username), Some(password)) => return validate(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            (Some(_), None) | (None, Some(_)) => {
                return Err(ScrapeError::Configuration(
                    "both --username and --password are required when passing credentials as flags"
                        .to_string(),
                ))
            }
            (None, None) => {}
        }

        match &self.default_file {
            Some(path) if path.exists() => from_file(path),
            _ => Err(ScrapeError::Configuration(format!(
                "no credentials provided; pass --username/--password, --credentials <file>, or place a {} in the working directory",
                DEFAULT_SECRET_FILE
            ))),
        }
    }
}

pub fn from_file(path: &Path) -> Result<Credentials, ScrapeError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ScrapeError::Configuration(format!("failed to read credentials from {:?}: {}", path, e))
    })?;

    let credentials: Credentials = serde_json::from_str(&content).map_err(|e| {
        ScrapeError::Configuration(format!(
            "credentials file {:?} must contain \"username\" and \"password\": {}",
            path, e
        ))
    })?;

    validate(credentials)
}

fn validate(credentials: Credentials) -> Result<Credentials, ScrapeError> {
    if credentials.username.trim().is_empty() || credentials.password.is_empty() {
        return Err(ScrapeError::Configuration(
            "username and password must not be empty".to_string(),
        ));
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("review_harvest_{}_{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_flags_win_over_default_file() {
        let source = CredentialSource {
            username: Some("me@example.com".to_string()),
            password: Some("hunter2".to_string()),
            default_file: Some(PathBuf::from("/nonexistent/secret.json")),
            ..Default::default()
        };
        let creds = source.resolve().unwrap();
        assert_eq!(creds.username, "me@example.com");
    }

    #[test]
    fn test_file_requires_both_keys() {
        let path = temp_file("missing_password.json", r#"{"username": "me"}"#);
        let source = CredentialSource { file: Some(path.clone()), ..Default::default() };
        assert!(matches!(source.resolve(), Err(ScrapeError::Configuration(_))));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_file_credentials() {
        let path = temp_file("ok.json", r#"{"username": "me", "password": "pw"}"#);
        let source = CredentialSource { file: Some(path.clone()), ..Default::default() };
        let creds = source.resolve().unwrap();
        assert_eq!(creds.password, "pw");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_no_source_is_configuration_error() {
        let source = CredentialSource {
            default_file: Some(PathBuf::from("/nonexistent/secret.json")),
            ..Default::default()
        };
        assert!(matches!(source.resolve(), Err(ScrapeError::Configuration(_))));
    }

    #[test]
    fn test_half_flags_rejected() {
        let source = CredentialSource {
            username: Some("me".to_string()),
            ..Default::default()
        };
        assert!(matches!(source.resolve(), Err(ScrapeError::Configuration(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials { username: "me".into(), password: "hunter2".into() };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
