//! Authenticated session against one device.
use crate::auth::{TokenClient, TokenPair, api_base_url};
use crate::config::ConnectionConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::http::{HttpMethod, ReqwestTransport, Transport};
use crate::retry::{RequestParams, retry_on_token_expiration};

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

/// Values for `{name}` placeholders in endpoint URLs.
pub type PathParams = BTreeMap<String, String>;

/// Replaces every `{name}` placeholder in `url` with its path param, percent-encoded.
pub fn construct_url(url: &str, path_params: &PathParams) -> Result<String> {
    let mut result = String::with_capacity(url.len());
    let mut rest = url;
    while let Some(start) = rest.find('{') {
        let end = rest[start..].find('}').ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                format!("unbalanced placeholder in url: {url}"),
            )
        })? + start;
        let name = &rest[start + 1..end];
        let value = path_params.get(name).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                format!("missing path param '{name}' for url {url}"),
            )
        })?;
        result.push_str(&rest[..start]);
        result.push_str(&urlencoding::encode(value));
        rest = &rest[end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

fn encode_query(query: &[(&str, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Holds the transport and the token pair of one task run.
///
/// Tokens refreshed by a retried request are only used by that request.
pub struct Connection {
    transport: Box<dyn Transport>,
    hostname: String,
    api_version: String,
    tokens: TokenPair,
}

impl Connection {
    /// Performs the password grant against the device described by `config`.
    pub fn login(config: &ConnectionConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(
            Duration::from_secs(config.timeout),
            config.validate_certs,
        )?;
        let tokens = TokenClient::new(&transport, &config.api_version).login(
            &config.hostname,
            &config.username,
            &config.password,
        )?;
        info!("logged in to {} as {}", config.hostname, config.username);
        Ok(Connection::new(
            Box::new(transport),
            &config.hostname,
            &config.api_version,
            tokens,
        ))
    }

    pub fn new(transport: Box<dyn Transport>, hostname: &str, api_version: &str, tokens: TokenPair) -> Self {
        Connection {
            transport,
            hostname: hostname.to_owned(),
            api_version: api_version.to_owned(),
            tokens,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn api_base_url(&self) -> String {
        api_base_url(&self.hostname, &self.api_version)
    }

    /// Sends a JSON request to `url_path` (relative to the API root).
    ///
    /// Placeholders are filled from `path_params`. A `401`/`408` answer triggers one token
    /// refresh and one replay. Any other non-2xx answer is returned as a server error.
    pub fn send_request(
        &self,
        method: HttpMethod,
        url_path: &str,
        path_params: &PathParams,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut url = format!(
            "{}{}",
            self.api_base_url(),
            construct_url(url_path, path_params)?
        );
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }

        let token_client = TokenClient::new(self.transport.as_ref(), &self.api_version);
        let mut send = retry_on_token_expiration(&token_client, |params: &RequestParams| {
            let authorization = params.bearer();
            self.transport.send(
                method,
                &url,
                &[
                    ("Authorization", authorization.as_str()),
                    ("Content-Type", "application/json"),
                ],
                body,
            )
        });
        send(RequestParams::new(&self.hostname, &self.tokens))?.json()
    }

    /// Revokes the session tokens, consuming the connection.
    pub fn logout(self) -> Result<()> {
        TokenClient::new(self.transport.as_ref(), &self.api_version).revoke(&self.hostname, &self.tokens)
    }
}
