//! # Webhook Signature Verification
//!
//! Stripe signs every webhook delivery with HMAC-SHA256 over
//! `"{timestamp}.{raw body}"` and sends the result in the `Stripe-Signature`
//! header as `t=<unix>,v1=<hex>[,v1=<hex>...]`.

use hmac::{Hmac, Mac};
use pay_core::{PaymentError, PaymentResult};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age (either direction) of a signed delivery, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed `Stripe-Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// All `v1` signatures; more than one appears while a secret is being rolled
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> PaymentResult<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse().ok(),
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            PaymentError::SignatureVerification("missing timestamp in signature header".to_string())
        })?;

        if signatures.is_empty() {
            return Err(PaymentError::SignatureVerification(
                "no v1 signature found".to_string(),
            ));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Hex-encoded `v1` signature for a payload
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    hex::encode(signed_mac(secret, timestamp, payload).finalize().into_bytes())
}

/// Build a complete `Stripe-Signature` header value, as Stripe would send it
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)
    )
}

/// Verify a delivery against the webhook secret.
///
/// `now` is the current unix time; the header timestamp must be within
/// `tolerance_secs` of it.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    tolerance_secs: i64,
    now: i64,
) -> PaymentResult<()> {
    let header = SignatureHeader::parse(header)?;

    let within_tolerance = now
        .checked_sub(header.timestamp)
        .map(i64::unsigned_abs)
        .is_some_and(|age| age <= tolerance_secs.unsigned_abs());

    if !within_tolerance {
        return Err(PaymentError::SignatureVerification(
            "timestamp outside the tolerance zone".to_string(),
        ));
    }

    let mac = signed_mac(secret, header.timestamp, payload);
    let matched = header.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        return Err(PaymentError::SignatureVerification(
            "no signatures found matching the expected signature for payload".to_string(),
        ));
    }

    Ok(())
}
