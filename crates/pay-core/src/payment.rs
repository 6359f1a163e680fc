//! # Payment Types
//!
//! Request, session, and webhook event types for pay-relay.
//! Nothing here is persisted: requests live for one HTTP call, sessions and
//! events are owned by the provider.

use crate::error::{PaymentError, PaymentResult};
use crate::plan::{Currency, Plan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Metadata key carrying the caller's user id
pub const METADATA_USER_ID: &str = "user_id";
/// Metadata key carrying the caller's email
pub const METADATA_USER_EMAIL: &str = "user_email";
/// Metadata key carrying the caller's display name
pub const METADATA_USER_NAME: &str = "user_name";

/// Identity of the user paying for a plan.
///
/// Echoed back by the provider in the completion webhook, which is the only
/// way to correlate a payment with the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub user_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl UserIdentity {
    /// Build an identity from caller-supplied fields.
    ///
    /// `user_email` and `user_id` must be present and non-blank; values are
    /// kept verbatim.
    pub fn validated(
        user_id: Option<String>,
        user_email: Option<String>,
        user_name: Option<String>,
    ) -> PaymentResult<Self> {
        let user_email = user_email
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PaymentError::validation("user_email is required"))?;
        let user_id = user_id
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PaymentError::validation("user_id is required"))?;

        Ok(Self {
            user_id,
            user_email,
            user_name,
        })
    }

    /// Metadata attached to the provider session for later correlation
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_USER_ID.to_string(), self.user_id.clone());
        metadata.insert(METADATA_USER_EMAIL.to_string(), self.user_email.clone());
        if let Some(name) = &self.user_name {
            metadata.insert(METADATA_USER_NAME.to_string(), name.clone());
        }
        metadata
    }
}

/// A request to open a hosted checkout session for a plan
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user: UserIdentity,
    pub plan: Plan,
    pub success_url: String,
    pub cancel_url: String,
    /// Sent as `Idempotency-Key` so a replayed HTTP call does not open two sessions
    pub idempotency_key: String,
}

impl CheckoutRequest {
    pub fn new(
        user: UserIdentity,
        plan: Plan,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            user,
            plan,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            idempotency_key: Uuid::new_v4().to_string(),
        }
    }

    /// Stripe checkout mode for this plan
    pub fn mode(&self) -> &'static str {
        if self.plan.is_recurring() {
            "subscription"
        } else {
            "payment"
        }
    }
}

/// A request to create a raw payment intent for a caller-chosen amount
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    /// Amount in minor units (centavos for BRL)
    pub amount: i64,
    pub currency: Currency,
    pub idempotency_key: String,
}

impl PaymentIntentRequest {
    /// Validate the amount and build the request
    pub fn new(amount: Option<i64>, currency: Currency) -> PaymentResult<Self> {
        let amount = amount.ok_or_else(|| PaymentError::validation("amount is required"))?;
        if amount <= 0 {
            return Err(PaymentError::validation(format!(
                "amount must be a positive integer in minor units, got {}",
                amount
            )));
        }

        Ok(Self {
            amount,
            currency,
            idempotency_key: Uuid::new_v4().to_string(),
        })
    }
}

/// A checkout session created by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// URL to redirect the customer to for payment
    pub checkout_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    /// When the provider will expire the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(session_id: impl Into<String>, checkout_url: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            checkout_url: checkout_url.into(),
            customer_id: None,
            expires_at: None,
            created_at: Utc::now(),
        }
    }
}

/// A payment intent created by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Handed to the browser to confirm the payment client-side
    pub client_secret: String,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    pub status: String,
}

/// Webhook event types we dispatch on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// `checkout.session.completed`
    CheckoutCompleted,
    /// `payment_intent.succeeded`
    PaymentSucceeded,
    /// Any other tag, acknowledged without action
    Unknown(String),
}

impl WebhookEventType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "checkout.session.completed" => WebhookEventType::CheckoutCompleted,
            "payment_intent.succeeded" => WebhookEventType::PaymentSucceeded,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            WebhookEventType::CheckoutCompleted => "checkout.session.completed",
            WebhookEventType::PaymentSucceeded => "payment_intent.succeeded",
            WebhookEventType::Unknown(tag) => tag,
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A verified webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider
    pub event_id: String,

    pub event_type: WebhookEventType,

    /// Provider name
    pub provider: String,

    /// Related session ID (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Related payment intent ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Amount paid (in minor units)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    /// Currency code as sent by the provider, kept even when [`Currency`] has no variant for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,

    /// Metadata echoed back from session creation
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// The event's `data.object`, untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,

    pub timestamp: DateTime<Utc>,
}

impl WebhookEvent {
    /// User id recorded at session creation
    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_USER_ID).map(String::as_str)
    }
}
