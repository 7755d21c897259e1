// ABOUTME: Registry credential lookup from the Docker client configuration.
// ABOUTME: Reads auths, credHelpers, and credsStore entries from config.json.

use super::traits::RegistryAuth;
use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read {path}: {message}")]
    ConfigUnreadable { path: String, message: String },

    #[error("credential helper {helper} failed: {message}")]
    HelperFailed { helper: String, message: String },
}

/// Docker client config.json, reduced to the fields credential lookup needs.
#[derive(Debug, Deserialize)]
struct DockerClientConfig {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,

    /// Per-registry credential helper names.
    #[serde(default, rename = "credHelpers")]
    cred_helpers: HashMap<String, String>,

    /// Default credential helper name.
    #[serde(default, rename = "credsStore")]
    creds_store: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthEntry {
    /// Base64-encoded "username:password".
    auth: Option<String>,
}

/// Response from a `docker-credential-*` helper's `get` subcommand.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    username: String,
    secret: String,
}

/// Looks up registry credentials the way the Docker CLI would.
#[derive(Debug)]
pub struct CredentialStore {
    config_path: PathBuf,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Use `$DOCKER_CONFIG/config.json`, falling back to `~/.docker/config.json`.
    pub fn new() -> Self {
        let config_dir = std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("HOME")
                    .map(|h| PathBuf::from(h).join(".docker"))
                    .unwrap_or_else(|_| PathBuf::from(".docker"))
            });
        Self {
            config_path: config_dir.join("config.json"),
        }
    }

    pub fn with_config_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Look up credentials for a registry host.
    ///
    /// Resolution order matches the Docker CLI: per-registry helper from
    /// `credHelpers`, inline `auths` entry, then the default `credsStore`
    /// helper. `Ok(None)` means "push unauthenticated" and is not an error.
    pub async fn lookup(
        &self,
        registry: &str,
    ) -> Result<Option<RegistryAuth>, CredentialError> {
        if !self.config_path.exists() {
            tracing::debug!("no docker config at {}", self.config_path.display());
            return Ok(None);
        }

        let config = self.load_config()?;

        if let Some(helper) = config.cred_helpers.get(registry) {
            return self.query_helper(helper, registry).await;
        }

        if let Some(entry) = config.auths.get(registry)
            && let Some(auth_b64) = &entry.auth
            && let Some(creds) = decode_auth(auth_b64, registry)
        {
            tracing::debug!("found inline credentials for {}", registry);
            return Ok(Some(creds));
        }

        if let Some(helper) = &config.creds_store {
            return self.query_helper(helper, registry).await;
        }

        tracing::debug!("no credentials found for {}", registry);
        Ok(None)
    }

    fn load_config(&self) -> Result<DockerClientConfig, CredentialError> {
        let content = std::fs::read_to_string(&self.config_path).map_err(|e| {
            CredentialError::ConfigUnreadable {
                path: self.config_path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        serde_json::from_str(&content).map_err(|e| CredentialError::ConfigUnreadable {
            path: self.config_path.display().to_string(),
            message: e.to_string(),
        })
    }

    async fn query_helper(
        &self,
        helper: &str,
        registry: &str,
    ) -> Result<Option<RegistryAuth>, CredentialError> {
        let helper_cmd = format!("docker-credential-{}", helper);
        tracing::debug!("querying {} for {}", helper_cmd, registry);

        let mut child = Command::new(&helper_cmd)
            .arg("get")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CredentialError::HelperFailed {
                helper: helper_cmd.clone(),
                message: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(registry.as_bytes()).await;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CredentialError::HelperFailed {
                helper: helper_cmd.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            // Helper has no credentials for this registry.
            return Ok(None);
        }

        let response: HelperResponse = serde_json::from_slice(&output.stdout).map_err(|e| {
            CredentialError::HelperFailed {
                helper: helper_cmd,
                message: format!("unparseable response: {}", e),
            }
        })?;

        Ok(Some(RegistryAuth {
            username: response.username,
            password: response.secret,
            server: Some(registry.to_string()),
        }))
    }
}

fn decode_auth(auth_b64: &str, registry: &str) -> Option<RegistryAuth> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth_b64)
        .ok()?;
    let auth_str = String::from_utf8(decoded).ok()?;
    let (username, password) = auth_str.split_once(':')?;
    Some(RegistryAuth {
        username: username.to_string(),
        password: password.to_string(),
        server: Some(registry.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_config_yields_no_credentials() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::with_config_path(dir.path().join("config.json"));
        let creds = store.lookup("gcr.io").await.unwrap();
        assert!(creds.is_none());
    }

    #[tokio::test]
    async fn inline_auth_entry_is_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let auth = base64::engine::general_purpose::STANDARD.encode("oauth2accesstoken:tok123");
        fs::write(
            &path,
            format!(r#"{{"auths":{{"gcr.io":{{"auth":"{auth}"}}}}}}"#),
        )
        .unwrap();

        let store = CredentialStore::with_config_path(path);
        let creds = store.lookup("gcr.io").await.unwrap().unwrap();
        assert_eq!(creds.username, "oauth2accesstoken");
        assert_eq!(creds.password, "tok123");
        assert_eq!(creds.server.as_deref(), Some("gcr.io"));
    }

    #[tokio::test]
    async fn unknown_registry_yields_no_credentials() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"auths":{}}"#).unwrap();

        let store = CredentialStore::with_config_path(path);
        let creds = store.lookup("gcr.io").await.unwrap();
        assert!(creds.is_none());
    }
}
