// Authentication headers for outbound provider requests
// One strategy per `AuthMethod`; the header set is rebuilt on every call.

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::registry::{AuthMethod, ProviderCredentials};

pub type AuthHeaders = Vec<(&'static str, String)>;

pub trait AuthStrategy: Send + Sync {
    fn headers(&self, credentials: &ProviderCredentials, timestamp: i64) -> AuthHeaders;
}

/// `Api-key`, `X-Signature` and `X-Timestamp`, where the signature is
/// hex(SHA256(api_key + secret + timestamp)).
pub struct XSignatureAuth;

impl AuthStrategy for XSignatureAuth {
    fn headers(&self, credentials: &ProviderCredentials, timestamp: i64) -> AuthHeaders {
        let timestamp = timestamp.to_string();
        vec![
            ("Api-key", credentials.api_key.clone()),
            (
                "X-Signature",
                signature(&credentials.api_key, &credentials.secret, &timestamp),
            ),
            ("X-Timestamp", timestamp),
        ]
    }
}

pub struct ApiKeyAuth;

impl AuthStrategy for ApiKeyAuth {
    fn headers(&self, credentials: &ProviderCredentials, _timestamp: i64) -> AuthHeaders {
        vec![("Authorization", format!("Bearer {}", credentials.api_key))]
    }
}

pub struct BasicAuth;

impl AuthStrategy for BasicAuth {
    fn headers(&self, credentials: &ProviderCredentials, _timestamp: i64) -> AuthHeaders {
        let username = credentials.username.as_deref().unwrap_or(&credentials.api_key);
        let password = credentials.password.as_deref().unwrap_or(&credentials.secret);
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", username, password));
        vec![("Authorization", format!("Basic {}", token))]
    }
}

pub struct NoAuth;

impl AuthStrategy for NoAuth {
    fn headers(&self, _credentials: &ProviderCredentials, _timestamp: i64) -> AuthHeaders {
        Vec::new()
    }
}

impl AuthMethod {
    pub fn strategy(self) -> &'static dyn AuthStrategy {
        match self {
            AuthMethod::XSignature => &XSignatureAuth,
            AuthMethod::ApiKey => &ApiKeyAuth,
            AuthMethod::BasicAuth => &BasicAuth,
            AuthMethod::None => &NoAuth,
        }
    }
}

pub fn signature(api_key: &str, secret: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(timestamp.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Headers for `method` stamped with the current unix time.
pub fn auth_headers(method: AuthMethod, credentials: &ProviderCredentials) -> AuthHeaders {
    method
        .strategy()
        .headers(credentials, chrono::Utc::now().timestamp())
}
