//! Connection options for the remote identity service.
//!
//! [`ServerOptions`] converts to and from a flat key-value dictionary using
//! fixed, namespaced keys (`forgerock_url`, `forgerock_realm`, ...). The
//! same struct doubles as the `[server]` section of the configuration file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;
use thiserror::Error;

/// Errors converting options from a dictionary.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid options dictionary: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("options did not serialize to a dictionary")]
    NotADictionary,

    #[error("invalid timeout '{0}': expected whole seconds")]
    InvalidTimeout(String),
}

/// Identity service connection options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerOptions {
    /// Base URL of the service.
    #[serde(rename = "forgerock_url")]
    pub url: String,

    /// Realm to authenticate against.
    #[serde(rename = "forgerock_realm")]
    pub realm: String,

    /// Whether session cookies are kept.
    #[serde(rename = "forgerock_enable_cookie", default = "default_true")]
    pub enable_cookie: bool,

    /// Session cookie name.
    #[serde(rename = "forgerock_cookie_name", default = "default_cookie_name")]
    pub cookie_name: String,

    /// Request timeout in seconds, kept as text to match the dictionary format.
    #[serde(rename = "forgerock_timeout", default = "default_timeout")]
    pub timeout: String,

    #[serde(
        rename = "forgerock_authenticate_endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub authenticate_endpoint: Option<String>,

    #[serde(
        rename = "forgerock_authorize_endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub authorize_endpoint: Option<String>,

    #[serde(
        rename = "forgerock_token_endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub token_endpoint: Option<String>,

    #[serde(
        rename = "forgerock_revoke_endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub revoke_endpoint: Option<String>,

    #[serde(
        rename = "forgerock_userinfo_endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub userinfo_endpoint: Option<String>,

    #[serde(
        rename = "forgerock_session_endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session_endpoint: Option<String>,

    /// Authentication tree used for login.
    #[serde(rename = "forgerock_auth_service_name", default = "default_auth_service")]
    pub auth_service_name: String,

    /// Authentication tree used for registration.
    #[serde(
        rename = "forgerock_registration_service_name",
        default = "default_registration_service"
    )]
    pub registration_service_name: String,

    /// Seconds before expiry at which OAuth tokens are refreshed.
    #[serde(
        rename = "forgerock_oauth_threshold",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub oauth_threshold: Option<String>,

    #[serde(
        rename = "forgerock_oauth_client_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub oauth_client_id: Option<String>,

    #[serde(
        rename = "forgerock_oauth_redirect_uri",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub oauth_redirect_uri: Option<String>,

    #[serde(
        rename = "forgerock_oauth_scope",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub oauth_scope: Option<String>,

    #[serde(
        rename = "forgerock_keychain_access_group",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub keychain_access_group: Option<String>,

    /// Base64 SHA-256 hashes of pinned server public keys.
    #[serde(
        rename = "forgerock_ssl_pinning_public_key_hashes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ssl_pinning_public_key_hashes: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

fn default_cookie_name() -> String {
    "iPlanetDirectoryPro".to_string()
}

fn default_timeout() -> String {
    "60".to_string()
}

fn default_auth_service() -> String {
    "Login".to_string()
}

fn default_registration_service() -> String {
    "Registration".to_string()
}

impl ServerOptions {
    /// Creates options for `url` and `realm` with every other field defaulted.
    pub fn new(url: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            realm: realm.into(),
            enable_cookie: true,
            cookie_name: default_cookie_name(),
            timeout: default_timeout(),
            authenticate_endpoint: None,
            authorize_endpoint: None,
            token_endpoint: None,
            revoke_endpoint: None,
            userinfo_endpoint: None,
            session_endpoint: None,
            auth_service_name: default_auth_service(),
            registration_service_name: default_registration_service(),
            oauth_threshold: None,
            oauth_client_id: None,
            oauth_redirect_uri: None,
            oauth_scope: None,
            keychain_access_group: None,
            ssl_pinning_public_key_hashes: None,
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = secs.to_string();
        self
    }

    pub fn with_oauth(
        mut self,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        self.oauth_client_id = Some(client_id.into());
        self.oauth_redirect_uri = Some(redirect_uri.into());
        self.oauth_scope = Some(scope.into());
        self
    }

    pub fn with_pinned_keys(mut self, hashes: Vec<String>) -> Self {
        self.ssl_pinning_public_key_hashes = Some(hashes);
        self
    }

    /// Serializes to the namespaced key-value dictionary. Unset optional
    /// fields are omitted.
    pub fn to_dictionary(&self) -> Result<Map<String, JsonValue>, OptionsError> {
        match serde_json::to_value(self)? {
            JsonValue::Object(map) => Ok(map),
            _ => Err(OptionsError::NotADictionary),
        }
    }

    /// Reads options from a namespaced key-value dictionary. Missing
    /// optional keys take their defaults; unknown keys are ignored.
    pub fn from_dictionary(dictionary: &Map<String, JsonValue>) -> Result<Self, OptionsError> {
        Ok(serde_json::from_value(JsonValue::Object(dictionary.clone()))?)
    }

    /// The request timeout as a duration.
    pub fn timeout_duration(&self) -> Result<Duration, OptionsError> {
        self.timeout
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| OptionsError::InvalidTimeout(self.timeout.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = ServerOptions::new("https://id.example.com/am", "alpha");
        assert!(options.enable_cookie);
        assert_eq!(options.cookie_name, "iPlanetDirectoryPro");
        assert_eq!(options.timeout, "60");
        assert_eq!(options.auth_service_name, "Login");
        assert_eq!(options.registration_service_name, "Registration");
    }

    #[test]
    fn test_dictionary_uses_namespaced_keys() {
        let options = ServerOptions::new("https://id.example.com/am", "alpha")
            .with_oauth("app", "app://callback", "openid profile");
        let dict = options.to_dictionary().unwrap();

        assert_eq!(dict["forgerock_url"], json!("https://id.example.com/am"));
        assert_eq!(dict["forgerock_realm"], json!("alpha"));
        assert_eq!(dict["forgerock_oauth_client_id"], json!("app"));
        assert!(!dict.contains_key("forgerock_token_endpoint"));
    }

    #[test]
    fn test_dictionary_round_trip() {
        let options = ServerOptions::new("https://id.example.com/am", "alpha")
            .with_cookie_name("session")
            .with_timeout_secs(30)
            .with_pinned_keys(vec!["hash1".to_string(), "hash2".to_string()]);

        let restored = ServerOptions::from_dictionary(&options.to_dictionary().unwrap()).unwrap();
        assert_eq!(restored, options);
    }

    #[test]
    fn test_from_minimal_dictionary() {
        let dict = json!({
            "forgerock_url": "https://id.example.com/am",
            "forgerock_realm": "root",
            "forgerock_unrelated": 1
        });
        let options = ServerOptions::from_dictionary(dict.as_object().unwrap()).unwrap();

        assert_eq!(options, ServerOptions::new("https://id.example.com/am", "root"));
    }

    #[test]
    fn test_missing_url_is_error() {
        let dict = json!({ "forgerock_realm": "root" });
        let err = ServerOptions::from_dictionary(dict.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("forgerock_url"));
    }

    #[test]
    fn test_timeout_duration() {
        let options = ServerOptions::new("u", "r").with_timeout_secs(45);
        assert_eq!(options.timeout_duration().unwrap(), Duration::from_secs(45));

        let mut bad = options;
        bad.timeout = "soon".to_string();
        assert!(matches!(
            bad.timeout_duration(),
            Err(OptionsError::InvalidTimeout(_))
        ));
    }
}
