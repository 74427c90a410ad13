//! Pass-through OAuth2 password/refresh_token grants to the external
//! `IdentityService` (spec.md §4.6). The control plane never mints user
//! access tokens itself; it forwards the grant and relays the response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{TokenError, TokenResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: String,
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn password_grant(&self, username: &str, password: &str) -> TokenResult<OAuthTokenResponse>;
    async fn refresh_grant(&self, refresh_token: &str) -> TokenResult<OAuthTokenResponse>;
    /// Verifies a bearer token carries `scope` in its claim set.
    async fn verify_scope(&self, bearer_token: &str, scope: &str) -> TokenResult<()>;
}

pub struct HttpIdentityService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpIdentityService {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct PasswordGrantRequest<'a> {
    grant_type: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrantRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn password_grant(&self, username: &str, password: &str) -> TokenResult<OAuthTokenResponse> {
        let resp = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .json(&PasswordGrantRequest {
                grant_type: "password",
                username,
                password,
            })
            .send()
            .await
            .map_err(|e| TokenError::AuthServiceError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TokenError::AuthServiceError(format!("status {}", resp.status())));
        }
        resp.json().await.map_err(|e| TokenError::AuthServiceError(e.to_string()))
    }

    async fn refresh_grant(&self, refresh_token: &str) -> TokenResult<OAuthTokenResponse> {
        let resp = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .json(&RefreshGrantRequest {
                grant_type: "refresh_token",
                refresh_token,
            })
            .send()
            .await
            .map_err(|e| TokenError::AuthServiceError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TokenError::AuthServiceError(format!("status {}", resp.status())));
        }
        resp.json().await.map_err(|e| TokenError::AuthServiceError(e.to_string()))
    }

    async fn verify_scope(&self, bearer_token: &str, scope: &str) -> TokenResult<()> {
        let resp = self
            .client
            .post(format!("{}/oauth/introspect", self.base_url))
            .json(&serde_json::json!({ "token": bearer_token, "scope": scope }))
            .send()
            .await
            .map_err(|e| TokenError::AuthServiceError(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else if resp.status().as_u16() == 403 {
            Err(TokenError::Unauthorized(format!("missing scope {scope}")))
        } else {
            Err(TokenError::AuthServiceError(format!("status {}", resp.status())))
        }
    }
}

/// Default `IdentityService` when no upstream is configured. Denies every
/// scope check and grant unless `allow_all` is set, so a misconfigured
/// deployment fails closed rather than silently granting access.
pub struct NoopIdentityService {
    allow_all: bool,
}

impl NoopIdentityService {
    pub fn new(allow_all: bool) -> Self {
        Self { allow_all }
    }
}

#[async_trait]
impl IdentityService for NoopIdentityService {
    async fn password_grant(&self, username: &str, _password: &str) -> TokenResult<OAuthTokenResponse> {
        if !self.allow_all {
            return Err(TokenError::AuthServiceError("no identity service configured".to_string()));
        }
        Ok(OAuthTokenResponse {
            access_token: format!("noop-access-{username}"),
            refresh_token: None,
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        })
    }

    async fn refresh_grant(&self, _refresh_token: &str) -> TokenResult<OAuthTokenResponse> {
        Err(TokenError::AuthServiceError("no identity service configured".to_string()))
    }

    async fn verify_scope(&self, _bearer_token: &str, scope: &str) -> TokenResult<()> {
        if self.allow_all {
            Ok(())
        } else {
            Err(TokenError::Unauthorized(format!("no identity service configured, denying scope {scope}")))
        }
    }
}

/// Test double that grants any scope and issues a fixed access token.
///
/// Gated behind the `test-util` feature, not a bare `#[cfg(test)]`, because
/// `stormstack-api` and `stormstackd` need it from their own test suites,
/// and `#[cfg(test)]` doesn't cross a crate boundary.
#[cfg(feature = "test-util")]
pub struct MockIdentityService;

#[cfg(feature = "test-util")]
#[async_trait]
impl IdentityService for MockIdentityService {
    async fn password_grant(&self, username: &str, _password: &str) -> TokenResult<OAuthTokenResponse> {
        Ok(OAuthTokenResponse {
            access_token: format!("mock-access-{username}"),
            refresh_token: Some(format!("mock-refresh-{username}")),
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        })
    }

    async fn refresh_grant(&self, refresh_token: &str) -> TokenResult<OAuthTokenResponse> {
        Ok(OAuthTokenResponse {
            access_token: format!("mock-access-from-{refresh_token}"),
            refresh_token: Some(refresh_token.to_string()),
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        })
    }

    async fn verify_scope(&self, _bearer_token: &str, _scope: &str) -> TokenResult<()> {
        Ok(())
    }
}
