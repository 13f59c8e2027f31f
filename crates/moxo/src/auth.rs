use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use moxbot_core::config::MoxoConfig;

use crate::MoxoError;

type HmacSha256 = Hmac<Sha256>;

/// App signature for the token endpoint: HMAC-SHA256 over
/// `client_id + org_id + timestamp` keyed by the client secret, base64
/// url-safe without padding. The platform verifies this exact construction;
/// do not alter the concatenation order or encoding.
pub fn request_signature(
    client_id: &str,
    org_id: &str,
    timestamp: &str,
    client_secret: &str,
) -> Result<String, MoxoError> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|error| MoxoError::TokenSigning(error.to_string()))?;
    mac.update(client_id.as_bytes());
    mac.update(org_id.as_bytes());
    mac.update(timestamp.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Exchanges a signed request for a short-lived bearer token at
/// `GET https://{domain}/v1/apps/token`.
#[derive(Clone)]
pub struct TokenIssuer {
    http: reqwest::Client,
    domain: String,
    org_id: String,
    client_id: String,
    client_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl TokenIssuer {
    pub fn new(http: reqwest::Client, config: &MoxoConfig) -> Self {
        Self {
            http,
            domain: config.domain.clone(),
            org_id: config.org_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    pub async fn issue(&self) -> Result<String, MoxoError> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = request_signature(
            &self.client_id,
            &self.org_id,
            &timestamp,
            self.client_secret.expose_secret(),
        )?;

        let url = format!("https://{}/v1/apps/token", self.domain);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("org_id", self.org_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|error| MoxoError::TokenIssuance(error.to_string()))?;

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|error| MoxoError::TokenIssuance(error.to_string()))?;

        match payload.access_token.filter(|token| !token.is_empty()) {
            Some(token) => {
                debug!(event_name = "moxo.auth.token_issued", "access token issued");
                Ok(token)
            }
            None => Err(MoxoError::TokenIssuance(
                "auth endpoint returned no access_token".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::request_signature;

    #[test]
    fn signature_is_deterministic_for_identical_inputs() {
        let first = request_signature("client", "org", "1700000000000", "secret").expect("sign");
        let second = request_signature("client", "org", "1700000000000", "secret").expect("sign");

        assert_eq!(first, second);
    }

    #[test]
    fn signature_changes_with_any_input() {
        let base = request_signature("client", "org", "1700000000000", "secret").expect("sign");

        let other_client =
            request_signature("client2", "org", "1700000000000", "secret").expect("sign");
        let other_org = request_signature("client", "org2", "1700000000000", "secret").expect("sign");
        let other_time =
            request_signature("client", "org", "1700000000001", "secret").expect("sign");
        let other_secret =
            request_signature("client", "org", "1700000000000", "secret2").expect("sign");

        assert_ne!(base, other_client);
        assert_ne!(base, other_org);
        assert_ne!(base, other_time);
        assert_ne!(base, other_secret);
    }

    #[test]
    fn signature_uses_the_url_safe_alphabet_without_padding() {
        let signature = request_signature("client", "org", "1700000000000", "secret").expect("sign");

        assert!(!signature.contains('+'));
        assert!(!signature.contains('/'));
        assert!(!signature.contains('='));
        assert!(!signature.is_empty());
    }

    #[test]
    fn concatenation_order_matters() {
        // client_id+org_id vs org_id+client_id must not collide: the platform
        // signs in a fixed order.
        let forward = request_signature("ab", "cd", "1", "secret").expect("sign");
        let swapped = request_signature("cd", "ab", "1", "secret").expect("sign");

        assert_ne!(forward, swapped);
    }
}
