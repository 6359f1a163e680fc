//! # Payment Strategy Trait
//!
//! The seam between the HTTP layer and the payment provider.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentStrategy (trait)                  │
//! │  ├── create_checkout()                                      │
//! │  ├── create_payment_intent()                                │
//! │  ├── verify_webhook()                                       │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │StripeCheckout │
//!                    │   Strategy    │
//!                    └───────────────┘
//! ```

use crate::error::PaymentResult;
use crate::payment::{
    CheckoutRequest, CheckoutSession, PaymentIntent, PaymentIntentRequest, WebhookEvent,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Core trait for payment provider implementations.
///
/// One instance is built at start-up and shared by every request.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Create a hosted checkout session and return its redirect URL.
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession>;

    /// Create a payment intent and return its client secret.
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> PaymentResult<PaymentIntent>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes, exactly as received
    /// * `signature` - Signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str)
        -> PaymentResult<WebhookEvent>;

    /// Get the provider name (for logging and error messages).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;

/// Default redirect URLs used when the caller does not supply them
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the application (e.g., "https://app.example.com.br")
    pub base_url: String,
    /// Success page path
    pub success_path: String,
    /// Cancel page path
    pub cancel_path: String,
}

impl CheckoutUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            success_path: "/pagamento-sucesso".to_string(),
            cancel_path: "/".to_string(),
        }
    }

    /// Success URL with Stripe's session id template appended
    pub fn success_url(&self) -> String {
        format!(
            "{}{}?session_id={{CHECKOUT_SESSION_ID}}",
            self.base_url, self.success_path
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}{}", self.base_url, self.cancel_path)
    }

    /// Pick the caller's URLs, falling back to the defaults when absent or blank
    pub fn resolve(&self, success: Option<&str>, cancel: Option<&str>) -> (String, String) {
        let pick = |value: Option<&str>, fallback: String| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .unwrap_or(fallback)
        };
        (
            pick(success, self.success_url()),
            pick(cancel, self.cancel_url()),
        )
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}
