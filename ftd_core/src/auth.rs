//! Token grants against the FDM `fdm/token` endpoint.
use crate::error::{Error, ErrorKind, Result};
use crate::http::{HttpMethod, Transport};

use serde::Deserialize;
use serde_json::json;
use strum_macros::{AsRefStr, Display};

/// `access_token` and `refresh_token` as issued by the device.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"********")
            .field("refresh_token", &"********")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum GrantType {
    Password,
    RefreshToken,
    RevokeToken,
}

/// Exchanges a refresh token for a new token pair.
pub trait TokenRefresher {
    fn refresh(&self, hostname: &str, refresh_token: &str) -> Result<TokenPair>;
}

/// Builds the API root for a device, e.g. `https://10.0.0.1/api/fdm/latest`.
pub fn api_base_url(hostname: &str, api_version: &str) -> String {
    let hostname = hostname.trim_end_matches('/');
    let hostname = if hostname.starts_with("http://") || hostname.starts_with("https://") {
        hostname.to_owned()
    } else {
        format!("https://{hostname}")
    };
    format!("{hostname}/api/fdm/{api_version}")
}

pub struct TokenClient<'a, T: Transport + ?Sized> {
    transport: &'a T,
    api_version: String,
}

impl<'a, T: Transport + ?Sized> TokenClient<'a, T> {
    pub fn new(transport: &'a T, api_version: &str) -> Self {
        TokenClient {
            transport,
            api_version: api_version.to_owned(),
        }
    }

    fn token_url(&self, hostname: &str) -> String {
        format!("{}/fdm/token", api_base_url(hostname, &self.api_version))
    }

    fn grant(&self, hostname: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        self.transport
            .send(
                HttpMethod::Post,
                &self.token_url(hostname),
                &[("Content-Type", "application/json")],
                Some(&body),
            )?
            .json()
    }

    /// Password grant, the start of every session.
    pub fn login(&self, hostname: &str, username: &str, password: &str) -> Result<TokenPair> {
        debug!("requesting token for {username}@{hostname}");
        let response = self.grant(
            hostname,
            json!({
                "grant_type": GrantType::Password.as_ref(),
                "username": username,
                "password": password,
            }),
        )?;
        parse_token_pair(response)
    }

    /// Invalidates both tokens. The device answers with an empty body.
    pub fn revoke(&self, hostname: &str, tokens: &TokenPair) -> Result<()> {
        debug!("revoking token for {hostname}");
        self.grant(
            hostname,
            json!({
                "grant_type": GrantType::RevokeToken.as_ref(),
                "access_token": tokens.access_token,
                "token_to_revoke": tokens.refresh_token,
            }),
        )?;
        Ok(())
    }
}

impl<T: Transport + ?Sized> TokenRefresher for TokenClient<'_, T> {
    fn refresh(&self, hostname: &str, refresh_token: &str) -> Result<TokenPair> {
        debug!("refreshing token for {hostname}");
        let response = self.grant(
            hostname,
            json!({
                "grant_type": GrantType::RefreshToken.as_ref(),
                "refresh_token": refresh_token,
            }),
        )?;
        parse_token_pair(response)
    }
}

fn parse_token_pair(response: serde_json::Value) -> Result<TokenPair> {
    serde_json::from_value(response).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("token response without access_token/refresh_token: {e}"),
        )
    })
}
