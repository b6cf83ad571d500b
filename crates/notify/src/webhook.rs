//! Webhook delivery to the configured notification collaborator.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::{NotificationMessage, NotificationTransport, NotifyError};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the request body, keyed by the
/// shared signing secret. Only sent when a secret is configured.
pub const SIGNATURE_HEADER: &str = "X-Timeclerk-Signature";

pub struct WebhookTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<SecretString>,
    signing_secret: Option<SecretString>,
}

impl WebhookTransport {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<SecretString>,
        signing_secret: Option<SecretString>,
        timeout_secs: u64,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| NotifyError::Transport(error.to_string()))?;
        Ok(Self { client, endpoint: endpoint.into(), token, signing_secret })
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(message)
            .map_err(|error| NotifyError::Serialize(error.to_string()))?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(secret) = &self.signing_secret {
            let signature = signature_hex(secret.expose_secret().as_bytes(), &body);
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|error| NotifyError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

fn signature_hex(secret: &[u8], payload: &[u8]) -> String {
    let digest = match HmacSha256::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }
        Err(_) => Sha256::digest(payload).to_vec(),
    };
    encode_hex(&digest)
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
