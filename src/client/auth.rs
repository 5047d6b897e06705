//! Access-gateway credentials for the PostgREST backend.
//!
//! The backend sits behind Cloudflare Access. Requests are admitted when they
//! carry a service-token pair in the `CF-Access-Client-Id` and
//! `CF-Access-Client-Secret` headers; without it the gateway answers with its
//! login page instead of JSON.

use reqwest::header::{HeaderMap, HeaderValue};

use crate::client::error::ResourceError;

pub const CLIENT_ID_HEADER: &str = "CF-Access-Client-Id";
pub const CLIENT_SECRET_HEADER: &str = "CF-Access-Client-Secret";

/// # Gateway service token
///
/// Both halves are required. A partially configured pair is treated as absent
/// by [`GatewayCredentials::from_parts`], so requests never carry only one of
/// the two headers.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayCredentials {
    client_id: String,
    client_secret: String,
}

impl GatewayCredentials {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// Builds the pair only when both values are present and non-empty.
    pub fn from_parts(client_id: Option<String>, client_secret: Option<String>) -> Option<Self> {
        match (client_id, client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(Self::new(id, secret))
            }
            _ => None,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Adds both gateway headers to `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), ResourceError> {
        let id = HeaderValue::from_str(&self.client_id).map_err(|e| {
            ResourceError::Config(format!("invalid {} value: {}", CLIENT_ID_HEADER, e))
        })?;
        let mut secret = HeaderValue::from_str(&self.client_secret).map_err(|e| {
            ResourceError::Config(format!("invalid {} value: {}", CLIENT_SECRET_HEADER, e))
        })?;
        secret.set_sensitive(true);

        headers.insert(CLIENT_ID_HEADER, id);
        headers.insert(CLIENT_SECRET_HEADER, secret);
        Ok(())
    }
}

// The secret must never end up in logs.
impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_pair_is_ignored() {
        assert!(GatewayCredentials::from_parts(Some("id".into()), None).is_none());
        assert!(GatewayCredentials::from_parts(Some("id".into()), Some(String::new())).is_none());
        assert!(GatewayCredentials::from_parts(Some("id".into()), Some("s".into())).is_some());
    }

    #[test]
    fn test_apply_sets_both_headers() {
        let creds = GatewayCredentials::new("abc.access".into(), "s3cret".into());
        let mut headers = HeaderMap::new();
        creds.apply(&mut headers).unwrap();

        assert_eq!(headers.get(CLIENT_ID_HEADER).unwrap(), "abc.access");
        assert!(headers.get(CLIENT_SECRET_HEADER).unwrap().is_sensitive());
        assert!(!format!("{:?}", creds).contains("s3cret"));
    }
}
