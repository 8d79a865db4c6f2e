// Provider registry: configuration for every third-party hotel API

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("Provider not found: {0}")]
    NotFound(String),

    #[error("Duplicate provider slug: {0}")]
    DuplicateSlug(String),

    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    XSignature,
    ApiKey,
    BasicAuth,
    None,
}

impl AuthMethod {
    /// Unrecognized names map to `None`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "x_signature" => AuthMethod::XSignature,
            "api_key" => AuthMethod::ApiKey,
            "basic_auth" => AuthMethod::BasicAuth,
            _ => AuthMethod::None,
        }
    }
}

impl<'de> Deserialize<'de> for AuthMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(AuthMethod::None, AuthMethod::parse))
    }
}

/// Opaque credential bundle. `username`/`password` are only consulted by
/// basic auth, which falls back to `api_key`/`secret` when they are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub api_key: String,
    pub secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_auth_method")]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub credentials: ProviderCredentials,
}

fn default_active() -> bool {
    true
}

fn default_auth_method() -> AuthMethod {
    AuthMethod::None
}

/// Read-only lookup over provider configurations. Keeps insertion order,
/// which is also the merge order of aggregated results.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<ProviderConfig>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if provider.slug.trim().is_empty() {
                return Err(RegistryError::InvalidConfig("empty provider slug".to_string()));
            }
            if !seen.insert(provider.slug.as_str()) {
                return Err(RegistryError::DuplicateSlug(provider.slug.clone()));
            }
        }
        Ok(Self { providers })
    }

    /// Parses a JSON array of provider configurations.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let providers: Vec<ProviderConfig> =
            serde_json::from_str(json).map_err(|e| RegistryError::InvalidConfig(e.to_string()))?;
        Self::new(providers)
    }

    pub fn active_providers(&self) -> Vec<ProviderConfig> {
        self.providers.iter().filter(|p| p.active).cloned().collect()
    }

    pub fn by_slug(&self, slug: &str) -> Result<&ProviderConfig, RegistryError> {
        self.providers
            .iter()
            .find(|p| p.slug == slug)
            .ok_or_else(|| RegistryError::NotFound(slug.to_string()))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
