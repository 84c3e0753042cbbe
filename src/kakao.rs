//! Kakao social-login provider client

use crate::config::KakaoSettings;
use crate::error::{ReverieError, Result};

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Flattened member profile from the identity provider
#[derive(Debug, Clone, PartialEq)]
pub struct KakaoProfile {
    pub kakao_id: i64,
    pub nickname: String,
    pub profile_image_url: Option<String>,
    pub email: Option<String>,
}

/// Provider seam for social login
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Exchange an authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String>;

    /// Fetch the member profile behind an access token
    async fn fetch_profile(&self, access_token: &str) -> Result<KakaoProfile>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: i64,
    kakao_account: Option<KakaoAccount>,
}

#[derive(Debug, Deserialize)]
struct KakaoAccount {
    email: Option<String>,
    profile: Option<AccountProfile>,
}

#[derive(Debug, Deserialize)]
struct AccountProfile {
    nickname: Option<String>,
    profile_image_url: Option<String>,
}

/// Kakao REST client: one token-exchange call, one profile call, no retry
pub struct KakaoClient {
    auth_endpoint: String,
    api_endpoint: String,
    rest_api_key: String,
    redirect_uri: String,
    http: reqwest::Client,
}

impl KakaoClient {
    /// Create a client from settings
    pub fn new(settings: &KakaoSettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            auth_endpoint: settings.auth_endpoint.trim_end_matches('/').to_string(),
            api_endpoint: settings.api_endpoint.trim_end_matches('/').to_string(),
            rest_api_key: settings.rest_api_key.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            http,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ReverieError::Provider {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl IdentityProvider for KakaoClient {
    fn name(&self) -> &'static str {
        "kakao"
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.rest_api_key.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code),
        ];

        let response = self
            .http
            .post(format!("{}/oauth/token", self.auth_endpoint))
            .form(&params)
            .send()
            .await?;

        let token: TokenResponse = Self::check(response).await?.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<KakaoProfile> {
        let response = self
            .http
            .get(format!("{}/v2/user/me", self.api_endpoint))
            .bearer_auth(access_token)
            .send()
            .await?;

        let me: MeResponse = Self::check(response).await?.json().await?;

        let account = me.kakao_account.unwrap_or(KakaoAccount {
            email: None,
            profile: None,
        });
        let profile = account.profile.unwrap_or(AccountProfile {
            nickname: None,
            profile_image_url: None,
        });

        Ok(KakaoProfile {
            kakao_id: me.id,
            nickname: profile
                .nickname
                .unwrap_or_else(|| format!("kakao-{}", me.id)),
            profile_image_url: profile.profile_image_url,
            email: account.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_response_tolerates_missing_consent() {
        // members can decline profile and email consent
        let me: MeResponse = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(me.id, 42);
        assert!(me.kakao_account.is_none());

        let me: MeResponse = serde_json::from_str(
            r#"{"id": 7, "kakao_account": {"profile": {"nickname": "dokja"}}}"#,
        )
        .unwrap();
        let account = me.kakao_account.unwrap();
        assert_eq!(account.profile.unwrap().nickname.as_deref(), Some("dokja"));
        assert!(account.email.is_none());
    }
}
