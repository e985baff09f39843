//! OAuth token exchange.
//!
//! One form-encoded POST to the token endpoint resolves to either an access
//! token or an authentication error. Nothing is cached or retried here.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::types::{AccessToken, TokenErrorResponse, TokenResponse};
use crate::config::DriveConfig;
use crate::errors::AppError;

/// Credential presented to the token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", tag = "grant")]
pub enum SignInGrant {
    /// Code returned by the consent screen redirect
    AuthorizationCode { code: String },
    RefreshToken {
        #[serde(rename = "refreshToken")]
        refresh_token: String,
    },
}

pub struct TokenExchange {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
}

impl TokenExchange {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            http: Client::new(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// Trade `grant` for an access token.
    pub async fn exchange(&self, grant: &SignInGrant) -> Result<AccessToken, AppError> {
        let mut params: Vec<(&str, &str)> = vec![("client_id", self.client_id.as_str())];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }
        match grant {
            SignInGrant::AuthorizationCode { code } => {
                params.push(("grant_type", "authorization_code"));
                params.push(("code", code.as_str()));
                if let Some(redirect_uri) = &self.redirect_uri {
                    params.push(("redirect_uri", redirect_uri.as_str()));
                }
            }
            SignInGrant::RefreshToken { refresh_token } => {
                params.push(("grant_type", "refresh_token"));
                params.push(("refresh_token", refresh_token.as_str()));
            }
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Authentication(format!("Token endpoint unreachable: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("status {}", status.as_u16()),
            };
            return Err(AppError::Authentication(format!(
                "Sign-in rejected: {}",
                message
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::Authentication(format!("Malformed token response: {}", e))
        })?;

        if token.access_token.is_empty() {
            return Err(AppError::Authentication(
                "Token endpoint returned an empty access token".to_string(),
            ));
        }

        let expires_at = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));

        Ok(AccessToken::new(token.access_token, expires_at))
    }
}
