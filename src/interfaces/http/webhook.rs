use super::SharedState;
use super::error::ApiError;
use crate::application::booking::{PaymentEvent, ReconcileOutcome};
use crate::error::{AppError, Result};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "payment-signature";

/// Checks `t=<unix>,v1=<hex>` signatures over `"<t>.<raw body>"`.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<Vec<u8>>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    fn mac(&self, timestamp: i64, body: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::InternalError(Box::new(std::io::Error::other(e.to_string()))))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Header value for `body`, as the processor would send it.
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> Result<String> {
        let signature = hex::encode(self.mac(timestamp, body)?.finalize().into_bytes());
        Ok(format!("t={timestamp},v1={signature}"))
    }

    pub fn verify(&self, header: &str, body: &[u8], now: i64) -> Result<()> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for (key, value) in header.split(',').filter_map(|part| part.trim().split_once('=')) {
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => signatures.extend(hex::decode(value).ok()),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| AppError::validation("signature has no timestamp"))?;
        if now.abs_diff(timestamp) > self.tolerance.as_secs() {
            return Err(AppError::validation("signature timestamp outside tolerance"));
        }
        if signatures.is_empty() {
            return Err(AppError::validation("signature has no v1 value"));
        }

        for signature in &signatures {
            if self.mac(timestamp, body)?.verify_slice(signature).is_ok() {
                return Ok(());
            }
        }
        Err(AppError::validation("signature mismatch"))
    }
}

pub async fn payment_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<ReconcileOutcome>, ApiError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::validation("missing signature header"))?;
    if let Err(e) = state.webhook.verify(header, &body, Utc::now().timestamp()) {
        warn!(error = %e, "rejected payment webhook");
        return Err(e.into());
    }

    let event: PaymentEvent =
        serde_json::from_slice(&body).map_err(|e| AppError::validation(format!("malformed event: {e}")))?;
    let outcome = state.services.bookings.reconcile(&event).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"id":"evt_1"}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new("whsec_test_0123456789", Duration::from_secs(300))
    }

    #[test]
    fn test_signed_body_verifies() {
        let v = verifier();
        let header = v.sign(1_700_000_000, BODY).unwrap();
        assert!(v.verify(&header, BODY, 1_700_000_010).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let v = verifier();
        let header = v.sign(1_700_000_000, BODY).unwrap();
        assert!(matches!(
            v.verify(&header, br#"{"id":"evt_2"}"#, 1_700_000_000),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let v = verifier();
        let header = v.sign(1_700_000_000, BODY).unwrap();
        assert!(v.verify(&header, BODY, 1_700_000_301).is_err());
        assert!(v.verify(&header, BODY, 1_699_999_699).is_err());
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let v = verifier();
        let header = v.sign(1_700_000_000, BODY).unwrap();
        let rotated = header.replacen("v1=", "v1=00ff,v1=", 1);
        assert!(v.verify(&rotated, BODY, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let v = verifier();
        for header in ["", "t=abc,v1=00", "v1=00", "t=1700000000"] {
            assert!(v.verify(header, BODY, 1_700_000_000).is_err(), "{header}");
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = WebhookVerifier::new("another_secret_value", Duration::from_secs(300))
            .sign(1_700_000_000, BODY)
            .unwrap();
        assert!(verifier().verify(&header, BODY, 1_700_000_000).is_err());
    }
}
