//! # Stripe Webhook Handling
//!
//! Event envelope parsing and dispatch for verified Stripe webhooks.
//! Signature checks live in [`crate::signature`]; this module only sees
//! payloads that already passed them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pay_core::payment::{METADATA_USER_EMAIL, METADATA_USER_NAME};
use pay_core::{Currency, PaymentError, PaymentResult, WebhookEvent, WebhookEventType};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Parsed checkout.session.completed event data
#[derive(Debug, Clone)]
pub struct CheckoutCompletedData {
    pub session_id: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub payment_intent_id: Option<String>,
    /// Settled amount in minor units
    pub amount_total: i64,
    pub currency: Option<Currency>,
    /// Raw settled currency code, e.g. "jpy" when `currency` is `None`
    pub currency_code: Option<String>,
    pub payment_status: String,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutCompletedData {
    /// Parse from a webhook event
    pub fn from_event(event: &WebhookEvent) -> PaymentResult<Self> {
        let obj = event
            .raw_data
            .as_ref()
            .and_then(|raw| raw.as_object())
            .ok_or_else(|| PaymentError::WebhookParse("event has no data object".to_string()))?;

        let str_field = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);

        let session_id = str_field("id")
            .ok_or_else(|| PaymentError::WebhookParse("missing session id".to_string()))?;

        let metadata = event.metadata.clone();

        let user_id = event
            .user_id()
            .map(String::from)
            .or_else(|| str_field("client_reference_id"));

        let user_email = metadata
            .get(METADATA_USER_EMAIL)
            .cloned()
            .or_else(|| event.customer_email.clone());

        Ok(Self {
            session_id,
            user_id,
            user_email,
            user_name: metadata.get(METADATA_USER_NAME).cloned(),
            customer_id: str_field("customer"),
            subscription_id: str_field("subscription"),
            payment_intent_id: event.payment_intent_id.clone(),
            amount_total: event.amount_paid.unwrap_or(0),
            currency: event.currency,
            currency_code: event.currency_code.clone(),
            payment_status: str_field("payment_status").unwrap_or_else(|| "unknown".to_string()),
            metadata,
        })
    }

    /// Check if payment was successful
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Webhook event handler trait
///
/// Implement this trait to act on events. Every method defaults to logging,
/// so an implementation only overrides what it cares about.
#[allow(unused_variables)]
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Called when a checkout session is completed.
    ///
    /// This is where the paying user's plan gets upgraded.
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> PaymentResult<()> {
        info!(
            session_id = %data.session_id,
            user_id = data.user_id.as_deref().unwrap_or("unknown"),
            user_email = data.user_email.as_deref().unwrap_or("unknown"),
            amount_total = data.amount_total,
            currency = data.currency_code.as_deref().unwrap_or("unknown"),
            paid = data.is_paid(),
            payment_status = %data.payment_status,
            "Checkout completed, plan update pending"
        );
        Ok(())
    }

    /// Called when a payment intent succeeds
    async fn on_payment_succeeded(&self, event: &WebhookEvent) -> PaymentResult<()> {
        info!(
            "Payment succeeded: intent={:?}, amount={:?}",
            event.payment_intent_id, event.amount_paid
        );
        Ok(())
    }

    /// Called for unknown/unhandled events
    async fn on_unknown_event(&self, event: &WebhookEvent) -> PaymentResult<()> {
        debug!("Unhandled webhook event: {}", event.event_type);
        Ok(())
    }
}

/// Default webhook handler (just logs events)
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a webhook event to the appropriate handler method
pub async fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: &WebhookEvent,
) -> PaymentResult<()> {
    match &event.event_type {
        WebhookEventType::CheckoutCompleted => {
            let data = CheckoutCompletedData::from_event(event)?;
            handler.on_checkout_completed(data).await
        }
        WebhookEventType::PaymentSucceeded => handler.on_payment_succeeded(event).await,
        WebhookEventType::Unknown(_) => handler.on_unknown_event(event).await,
    }
}

/// Events to enable on the Stripe Dashboard endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] =
    &["checkout.session.completed", "payment_intent.succeeded"];

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

/// Parse a Stripe event envelope into a [`WebhookEvent`].
///
/// Call only after the signature has been verified.
pub fn parse_event(payload: &[u8]) -> PaymentResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::WebhookParse(format!("failed to parse webhook: {}", e)))?;

    let event_type = WebhookEventType::from_tag(&event.event_type);
    let object = event.data.object;
    let str_field = |key: &str| object.get(key).and_then(|v| v.as_str()).map(String::from);

    // checkout sessions report `amount_total`, payment intents `amount_received`
    let amount_paid = ["amount_total", "amount_received", "amount"]
        .iter()
        .find_map(|key| object.get(*key).and_then(|v| v.as_i64()));

    let session_id = match event_type {
        WebhookEventType::CheckoutCompleted => str_field("id"),
        _ => None,
    };

    let payment_intent_id = match event_type {
        WebhookEventType::PaymentSucceeded => str_field("id"),
        _ => str_field("payment_intent"),
    };

    let customer_email = str_field("customer_email").or_else(|| {
        object
            .get("customer_details")
            .and_then(|cd| cd.get("email"))
            .and_then(|v| v.as_str())
            .map(String::from)
    });

    let currency_code = str_field("currency");
    let currency = currency_code.as_deref().and_then(Currency::from_code);
    if let (Some(code), None) = (currency_code.as_deref(), currency) {
        warn!(event_id = %event.id, "Unrecognized currency {:?} on webhook event", code);
    }

    let metadata = object
        .get("metadata")
        .and_then(|m| m.as_object())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(WebhookEvent {
        event_id: event.id,
        session_id,
        payment_intent_id,
        customer_email,
        amount_paid,
        currency,
        currency_code,
        metadata,
        event_type,
        provider: "stripe".to_string(),
        raw_data: Some(serde_json::Value::Object(object)),
        timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}
