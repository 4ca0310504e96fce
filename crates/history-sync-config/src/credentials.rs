use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const TRAKT_CLIENT_ID_ENV: &str = "TRAKT_CLIENT_ID";
pub const TRAKT_ACCESS_TOKEN_ENV: &str = "TRAKT_ACCESS_TOKEN";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_trakt_access_token(&self) -> Option<&String> {
        self.get("trakt_access_token")
    }

    pub fn set_trakt_access_token(&mut self, token: String) {
        self.set("trakt_access_token".to_string(), token);
    }

    pub fn get_trakt_refresh_token(&self) -> Option<&String> {
        self.get("trakt_refresh_token")
    }

    pub fn set_trakt_refresh_token(&mut self, token: String) {
        self.set("trakt_refresh_token".to_string(), token);
    }

    pub fn get_trakt_token_expires(&self) -> Option<DateTime<Utc>> {
        self.get("trakt_token_expires")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_trakt_token_expires(&mut self, expires: DateTime<Utc>) {
        self.set("trakt_token_expires".to_string(), expires.to_rfc3339());
    }

    /// True when a stored token exists and does not expire in the next five minutes.
    pub fn has_fresh_trakt_token(&self, now: DateTime<Utc>) -> bool {
        match (self.get_trakt_access_token(), self.get_trakt_token_expires()) {
            (Some(_), Some(expires_at)) => expires_at > now + chrono::Duration::minutes(5),
            (Some(_), None) => true,
            _ => false,
        }
    }

    pub fn clear_trakt(&mut self) {
        self.remove("trakt_access_token");
        self.remove("trakt_refresh_token");
        self.remove("trakt_token_expires");
    }
}

/// Pick the first non-blank value: command-line flag, then environment
/// variable, then the stored fallback.
pub fn resolve_credential(cli: Option<&str>, env_var: &str, stored: Option<&str>) -> Option<String> {
    [
        cli.map(str::to_string),
        std::env::var(env_var).ok(),
        stored.map(str::to_string),
    ]
    .into_iter()
    .flatten()
    .map(|v| v.trim().to_string())
    .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_credential_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_trakt_access_token("test_token".to_string());
        store.set_trakt_refresh_token("refresh".to_string());
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        assert_eq!(loaded_store.get_trakt_access_token(), Some(&"test_token".to_string()));
        assert_eq!(loaded_store.get_trakt_refresh_token(), Some(&"refresh".to_string()));
    }

    #[test]
    fn test_credential_store_trakt_token_expires() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        let expires = Utc::now() + chrono::Duration::hours(1);
        store.set_trakt_token_expires(expires);
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        let loaded_expires = loaded_store.get_trakt_token_expires().unwrap();
        // Allow 1 second difference for serialization
        assert!((loaded_expires - expires).num_seconds().abs() < 2);
    }

    #[test]
    fn test_fresh_token_check() {
        let now = Utc::now();
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused-credentials.toml"));
        assert!(!store.has_fresh_trakt_token(now));

        store.set_trakt_access_token("token".to_string());
        assert!(store.has_fresh_trakt_token(now));

        store.set_trakt_token_expires(now + chrono::Duration::minutes(2));
        assert!(!store.has_fresh_trakt_token(now));

        store.set_trakt_token_expires(now + chrono::Duration::days(30));
        assert!(store.has_fresh_trakt_token(now));

        store.clear_trakt();
        assert!(store.get_trakt_access_token().is_none());
        assert!(store.get_trakt_token_expires().is_none());
    }

    #[test]
    fn test_resolve_credential_precedence() {
        let env_var = "DOUBAN2TRAKT_TEST_UNSET_CREDENTIAL";
        assert_eq!(
            resolve_credential(Some("cli"), env_var, Some("stored")),
            Some("cli".to_string())
        );
        assert_eq!(
            resolve_credential(Some("  "), env_var, Some("stored")),
            Some("stored".to_string())
        );
        assert_eq!(resolve_credential(None, env_var, None), None);
    }

    #[test]
    fn test_resolve_credential_reads_environment() {
        let env_var = "DOUBAN2TRAKT_TEST_SET_CREDENTIAL";
        std::env::set_var(env_var, " from-env ");
        assert_eq!(
            resolve_credential(None, env_var, Some("stored")),
            Some("from-env".to_string())
        );
        assert_eq!(
            resolve_credential(Some("cli"), env_var, Some("stored")),
            Some("cli".to_string())
        );
        std::env::remove_var(env_var);
    }
}
