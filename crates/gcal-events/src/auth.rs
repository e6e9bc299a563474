//! Bearer tokens for the calendar API.
//!
//! A [`TokenSource`] hands out an access token for each request. Two real
//! sources exist, matching the two authentication profiles:
//!
//! - [`ServiceAccountTokenSource`] signs an RS256 JWT assertion with the
//!   service account key and exchanges it at the token endpoint.
//! - [`OAuthTokenSource`] starts from a previously granted token and refreshes
//!   it with the OAuth client credentials once it expires.
//!
//! Both cache the token until one minute before it expires. There is no
//! interactive consent flow; the OAuth token must be obtained beforehand.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::calendar::BoxFuture;
use crate::error::{EventsError, EventsResult};

/// Google OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read/write access to calendars and events.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for service account assertions.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Produces bearer tokens for API requests.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, EventsResult<String>>;
}

/// A fixed token, for callers that manage authentication themselves.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn access_token(&self) -> BoxFuture<'_, EventsResult<String>> {
        let token = self.token.clone();
        Box::pin(async move { Ok(token) })
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn new(access_token: String, expires_in_secs: Option<i64>) -> Self {
        Self {
            access_token,
            expires_at: expires_in_secs
                .map(|secs| Utc::now() + Duration::seconds(secs - EXPIRY_MARGIN_SECS)),
        }
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

async fn request_token(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> EventsResult<TokenResponse> {
    let response = http
        .post(token_uri)
        .form(form)
        .send()
        .await
        .map_err(|e| EventsError::network(format!("token request failed: {e}")).with_source(e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| EventsError::network(format!("failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(EventsError::authentication(format!(
            "token request failed ({status}): {body}"
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| EventsError::invalid_response(format!("invalid token response: {e}")))
}

fn parse_json<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> EventsResult<T> {
    serde_json::from_value(value)
        .map_err(|e| EventsError::configuration(format!("invalid {what}: {e}")).with_source(e))
}

/// The fields of a service account key file that are needed to sign in.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Tokens for a service account, obtained with a signed JWT assertion.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scopes: Vec<String>,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey) -> EventsResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            EventsError::configuration(format!("invalid service account private key: {e}"))
                .with_source(e)
        })?;

        Ok(Self {
            key,
            encoding_key,
            scopes: vec![CALENDAR_SCOPE.to_string()],
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        })
    }

    /// Parses a service account key file document.
    pub fn from_json(value: Value) -> EventsResult<Self> {
        Self::new(parse_json(value, "service account credentials")?)
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self, now: DateTime<Utc>) -> EventsResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            EventsError::authentication(format!("failed to sign assertion: {e}")).with_source(e)
        })
    }
}

impl TokenSource for ServiceAccountTokenSource {
    fn access_token(&self) -> BoxFuture<'_, EventsResult<String>> {
        Box::pin(async move {
            let mut cached = self.cached.lock().await;
            if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.access_token.clone());
            }

            debug!(client_email = %self.key.client_email, "requesting service account token");
            let assertion = self.assertion(Utc::now())?;
            let response = request_token(
                &self.http,
                &self.key.token_uri,
                &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
            )
            .await?;

            info!("obtained service account access token");
            let token = CachedToken::new(response.access_token, response.expires_in);
            let access_token = token.access_token.clone();
            *cached = Some(token);
            Ok(access_token)
        })
    }
}

/// OAuth client credentials.
#[derive(Debug, Clone)]
pub struct OAuthClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
}

/// Structure of Google's OAuth client JSON file.
///
/// Supports the Cloud Console format with an `installed` or `web` section, and
/// the flat format with `client_id` and `client_secret` at the root.
#[derive(Debug, Deserialize)]
struct ClientCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
    token_uri: Option<String>,
}

impl OAuthClientCredentials {
    pub fn from_json(value: Value) -> EventsResult<Self> {
        let file: ClientCredentialsFile = parse_json(value, "OAuth credentials")?;

        if let Some(nested) = file.installed.or(file.web) {
            return Ok(Self {
                client_id: nested.client_id,
                client_secret: nested.client_secret,
                token_uri: nested.token_uri.unwrap_or_else(default_token_uri),
            });
        }

        match (file.client_id, file.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
                token_uri: file.token_uri.unwrap_or_else(default_token_uri),
            }),
            _ => Err(EventsError::configuration(
                "OAuth credentials must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
            )),
        }
    }
}

/// A stored OAuth token as saved after the consent flow.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix time at which the token was issued.
    #[serde(default)]
    pub created: Option<i64>,
}

impl StoredToken {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        let expires_in = self.expires_in?;
        // A token without `created` counts as expired.
        let created = self.created.unwrap_or(0);
        DateTime::from_timestamp(created + expires_in - EXPIRY_MARGIN_SECS, 0)
            .or_else(|| DateTime::from_timestamp(0, 0))
    }
}

/// Tokens for a user account, refreshed with the OAuth client credentials.
pub struct OAuthTokenSource {
    credentials: OAuthClientCredentials,
    refresh_token: Option<String>,
    http: reqwest::Client,
    cached: Mutex<CachedToken>,
}

impl OAuthTokenSource {
    pub fn new(credentials: OAuthClientCredentials, token: StoredToken) -> Self {
        let cached = CachedToken {
            expires_at: token.expires_at(),
            access_token: token.access_token,
        };

        Self {
            credentials,
            refresh_token: token.refresh_token,
            http: reqwest::Client::new(),
            cached: Mutex::new(cached),
        }
    }

    /// Builds a source from the OAuth client document and the stored token.
    pub fn from_json(credentials: Value, token: Value) -> EventsResult<Self> {
        let credentials = OAuthClientCredentials::from_json(credentials)?;
        let token = parse_json(token, "OAuth token")?;
        Ok(Self::new(credentials, token))
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

impl TokenSource for OAuthTokenSource {
    fn access_token(&self) -> BoxFuture<'_, EventsResult<String>> {
        Box::pin(async move {
            let mut cached = self.cached.lock().await;
            if !cached.is_expired() {
                return Ok(cached.access_token.clone());
            }

            let refresh_token = self.refresh_token.as_deref().ok_or_else(|| {
                EventsError::authentication("access token expired and no refresh token available")
            })?;

            debug!("refreshing OAuth access token");
            let response = request_token(
                &self.http,
                &self.credentials.token_uri,
                &[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;

            info!("successfully refreshed access token");
            *cached = CachedToken::new(response.access_token, response.expires_in);
            Ok(cached.access_token.clone())
        })
    }
}
