// OAuth2 token sources for the Google APIs
//
// A credential blob is read once at startup; the resulting token source hands
// out bearer tokens and refreshes them shortly before they expire.

use crate::constants;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Anything that can produce a bearer token for the Google APIs
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A pre-minted token, used as-is
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

fn default_token_uri() -> String {
    constants::GOOGLE_TOKEN_URL.to_string()
}

/// Credential blob as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl Credentials {
    pub fn from_json(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).context("Failed to parse Google credentials JSON")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let blob = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file: {}", path.display()))?;
        Self::from_json(&blob)
    }

    /// Human-readable identity for startup logs
    pub fn principal(&self) -> &str {
        match self {
            Credentials::ServiceAccount(key) => &key.client_email,
            Credentials::AuthorizedUser(user) => &user.client_id,
        }
    }

    pub fn into_token_source(self, http: reqwest::Client) -> Result<Arc<dyn TokenSource>> {
        Ok(match self {
            Credentials::ServiceAccount(key) => Arc::new(ServiceAccountToken::new(key, http)?),
            Credentials::AuthorizedUser(user) => Arc::new(RefreshTokenSource::new(user, http)),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Single cached token shared by concurrent callers
#[derive(Default)]
struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenResponse>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref()
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.token.clone());
        }

        let response = fetch().await?;
        let lifetime = Duration::from_secs(response.expires_in)
            .saturating_sub(constants::TOKEN_EXPIRY_MARGIN);
        *slot = Some(CachedToken {
            token: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }
}

async fn read_token_response(response: reqwest::Response, what: &str) -> Result<TokenResponse> {
    let response = super::ensure_success(response, what).await?;
    response
        .json::<TokenResponse>()
        .await
        .with_context(|| format!("{}: malformed token response", what))
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Service account key exchanged for tokens through the JWT bearer grant
pub struct ServiceAccountToken {
    key: ServiceAccountKey,
    signing_key: jsonwebtoken::EncodingKey,
    http: reqwest::Client,
    cache: TokenCache,
}

impl ServiceAccountToken {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self> {
        let signing_key = jsonwebtoken::EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("Service account private key is not a valid RSA PEM")?;
        Ok(Self {
            key,
            signing_key,
            http,
            cache: TokenCache::default(),
        })
    }

    /// Signed assertion for the token endpoint
    fn assertion(&self) -> Result<String> {
        let iat = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &self.key.client_email,
            scope: constants::GOOGLE_SCOPES.join(" "),
            aud: &self.key.token_uri,
            iat,
            exp: iat + 3600,
        };
        let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .context("Failed to sign service account assertion")
    }

    async fn fetch(&self) -> Result<TokenResponse> {
        let assertion = self.assertion()?;
        log::debug!("[Auth] Requesting token for {}", self.key.client_email);
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach token endpoint")?;
        read_token_response(response, "Service account token exchange").await
    }
}

#[async_trait]
impl TokenSource for ServiceAccountToken {
    async fn access_token(&self) -> Result<String> {
        self.cache.get_or_fetch(|| self.fetch()).await
    }
}

/// OAuth client + refresh token (gcloud `authorized_user` credentials)
pub struct RefreshTokenSource {
    user: AuthorizedUser,
    http: reqwest::Client,
    cache: TokenCache,
}

impl RefreshTokenSource {
    pub fn new(user: AuthorizedUser, http: reqwest::Client) -> Self {
        Self {
            user,
            http,
            cache: TokenCache::default(),
        }
    }

    async fn fetch(&self) -> Result<TokenResponse> {
        log::debug!("[Auth] Refreshing token for client {}", self.user.client_id);
        let response = self
            .http
            .post(&self.user.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.user.client_id.as_str()),
                ("client_secret", self.user.client_secret.as_str()),
                ("refresh_token", self.user.refresh_token.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach token endpoint")?;
        read_token_response(response, "Refresh token exchange").await
    }
}

#[async_trait]
impl TokenSource for RefreshTokenSource {
    async fn access_token(&self) -> Result<String> {
        self.cache.get_or_fetch(|| self.fetch()).await
    }
}

/// Default service account of the host (GCE, Cloud Run, GKE)
pub struct MetadataServerToken {
    base_url: String,
    http: reqwest::Client,
    cache: TokenCache,
}

impl MetadataServerToken {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            cache: TokenCache::default(),
        }
    }

    async fn fetch(&self) -> Result<TokenResponse> {
        let url = format!(
            "{}/instance/service-accounts/default/token",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .query(&[("scopes", constants::GOOGLE_SCOPES.join(","))])
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .context("Failed to reach metadata server")?;
        read_token_response(response, "Metadata server token request").await
    }
}

#[async_trait]
impl TokenSource for MetadataServerToken {
    async fn access_token(&self) -> Result<String> {
        self.cache.get_or_fetch(|| self.fetch()).await
    }
}
