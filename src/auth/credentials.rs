use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::AuthError;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client registration as downloaded from the Google Cloud console.
#[derive(Clone, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// `credentials.json` wraps the client under `installed` (desktop apps) or
/// `web`.
#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<OAuthClientConfig>,
    web: Option<OAuthClientConfig>,
}

impl OAuthClientConfig {
    /// Read and parse a `credentials.json` file.
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let contents = std::fs::read_to_string(path).map_err(|e| AuthError::Credentials {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&contents).map_err(|message| AuthError::Credentials {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_json(contents: &str) -> Result<Self, String> {
        let file: CredentialsFile =
            serde_json::from_str(contents).map_err(|e| e.to_string())?;
        let client = file
            .installed
            .or(file.web)
            .ok_or_else(|| "expected an 'installed' or 'web' client entry".to_string())?;
        if client.client_id.is_empty() {
            return Err("client_id is empty".to_string());
        }
        Ok(client)
    }
}

impl fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Token endpoint response. Never written to disk.
#[derive(Clone, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}
