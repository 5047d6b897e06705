//! Endpoint configuration, resolved once at startup.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

use crate::client::auth::GatewayCredentials;
use crate::client::error::ResourceError;

pub const BASE_URL_VAR: &str = "POSTGREST_URL";
pub const CLIENT_ID_VAR: &str = "CF_ACCESS_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "CF_ACCESS_CLIENT_SECRET";
pub const TIMEOUT_VAR: &str = "POSTGREST_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the backend lives and how to reach it.
///
/// A missing base URL does not prevent construction: it is logged once here
/// and every request made with this configuration then fails with
/// [`ResourceError::Config`] before touching the network.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    base_url: Option<String>,
    gateway: Option<GatewayCredentials>,
    timeout: Duration,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into().trim_end_matches('/').to_string()),
            gateway: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A configuration with no backend; every operation fails fast.
    pub fn unconfigured() -> Self {
        Self {
            base_url: None,
            gateway: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_gateway(mut self, credentials: GatewayCredentials) -> Self {
        self.gateway = Some(credentials);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `POSTGREST_URL`, the Cloudflare Access pair and
    /// `POSTGREST_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BASE_URL_VAR)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        if base_url.is_none() {
            tracing::error!("{} is not defined in the environment", BASE_URL_VAR);
        }

        let gateway = GatewayCredentials::from_parts(lookup(CLIENT_ID_VAR), lookup(CLIENT_SECRET_VAR));
        if gateway.is_none() {
            tracing::warn!(
                "{} or {} is not defined; requests will not include Cloudflare Access authentication",
                CLIENT_ID_VAR,
                CLIENT_SECRET_VAR
            );
        }

        let timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!("Ignoring invalid {}={:?}", TIMEOUT_VAR, raw);
                    DEFAULT_TIMEOUT
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        Self {
            base_url,
            gateway,
            timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn base_url(&self) -> Result<&str, ResourceError> {
        self.base_url
            .as_deref()
            .ok_or_else(|| ResourceError::Config(format!("{} is not set", BASE_URL_VAR)))
    }

    pub fn resource_url(&self, path: &str) -> Result<String, ResourceError> {
        Ok(format!("{}/{}", self.base_url()?, path))
    }

    pub fn gateway(&self) -> Option<&GatewayCredentials> {
        self.gateway.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// JSON content negotiation plus the gateway pair when configured.
    pub fn default_headers(&self) -> Result<HeaderMap, ResourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(gateway) = &self.gateway {
            gateway.apply(&mut headers)?;
        }
        Ok(headers)
    }

    /// The shared HTTP client: default headers and timeout applied to every request.
    pub fn http_client(&self) -> Result<Client, ResourceError> {
        Client::builder()
            .default_headers(self.default_headers()?)
            .timeout(self.timeout)
            .build()
            .map_err(ResourceError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_everything() {
        let config = EndpointConfig::from_lookup(lookup(&[
            (BASE_URL_VAR, "https://db.example.com/"),
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
            (TIMEOUT_VAR, "30"),
        ]));

        assert_eq!(config.base_url().unwrap(), "https://db.example.com");
        assert_eq!(config.resource_url("cliente").unwrap(), "https://db.example.com/cliente");
        assert_eq!(config.gateway().unwrap().client_id(), "id");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_base_url_fails_every_url() {
        let config = EndpointConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "soon")]));

        assert!(!config.is_configured());
        assert!(matches!(config.resource_url("cliente"), Err(ResourceError::Config(_))));
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_default_headers_without_gateway() {
        let headers = EndpointConfig::new("http://localhost:3000").default_headers().unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert!(headers.get(crate::client::auth::CLIENT_ID_HEADER).is_none());
    }
}
