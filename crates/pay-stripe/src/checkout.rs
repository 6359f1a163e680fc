//! # Stripe Checkout Sessions and Payment Intents
//!
//! The Stripe implementation of [`PaymentStrategy`]. Both session flows are a
//! single form-encoded POST to the Stripe API; webhook verification is local.

use crate::config::StripeConfig;
use crate::signature::{verify_signature, DEFAULT_TOLERANCE_SECS};
use crate::webhook::parse_event;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pay_core::{
    CheckoutRequest, CheckoutSession, Currency, PaymentError, PaymentIntent,
    PaymentIntentRequest, PaymentResult, PaymentStrategy, WebhookEvent,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

const PROVIDER: &str = "stripe";

/// Stripe strategy
///
/// Uses Stripe's hosted checkout page for subscriptions and raw payment
/// intents for client-side confirmation.
pub struct StripeCheckoutStrategy {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutStrategy {
    /// Create a new Stripe strategy; the HTTP client carries the configured timeout
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Form fields for `POST /v1/checkout/sessions`
    pub(crate) fn checkout_form_params(request: &CheckoutRequest) -> Vec<(String, String)> {
        let plan = &request.plan;
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), request.mode().to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                plan.currency.as_str().to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                plan.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                plan.name.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]".to_string(),
                plan.description.clone(),
            ),
        ];

        if let Some(interval) = plan.interval.stripe_interval() {
            params.push((
                "line_items[0][price_data][recurring][interval]".to_string(),
                interval.to_string(),
            ));
        }
        params.push(("line_items[0][quantity]".to_string(), "1".to_string()));

        params.push(("customer_email".to_string(), request.user.user_email.clone()));
        params.push((
            "client_reference_id".to_string(),
            request.user.user_id.clone(),
        ));

        let metadata = request.user.metadata();
        for (key, value) in &metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }
        // Subscription objects carry their own metadata; renewals only see this copy.
        if plan.is_recurring() {
            for (key, value) in &metadata {
                params.push((format!("subscription_data[metadata][{}]", key), value.clone()));
            }
        }

        params
    }

    /// Form fields for `POST /v1/payment_intents`
    pub(crate) fn payment_intent_form_params(
        request: &PaymentIntentRequest,
    ) -> Vec<(String, String)> {
        vec![
            ("amount".to_string(), request.amount.to_string()),
            (
                "currency".to_string(),
                request.currency.as_str().to_string(),
            ),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ]
    }

    /// POST a form to the Stripe API and return the raw success body
    async fn post_form(
        &self,
        path: &str,
        idempotency_key: &str,
        params: &[(String, String)],
    ) -> PaymentResult<String> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", idempotency_key)
            .form(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(PaymentError::Provider {
                    provider: PROVIDER.to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(PaymentError::Provider {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        Ok(body)
    }

    fn transport_error(&self, err: reqwest::Error) -> PaymentError {
        if err.is_timeout() {
            warn!("Stripe call timed out after {:?}", self.config.timeout);
            PaymentError::ProviderTimeout {
                provider: PROVIDER.to_string(),
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else {
            PaymentError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl PaymentStrategy for StripeCheckoutStrategy {
    #[instrument(skip(self, request), fields(user_id = %request.user.user_id, plan = %request.plan.id))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let params = Self::checkout_form_params(request);

        debug!(
            "Creating Stripe checkout session: mode={}, price={}",
            request.mode(),
            request.plan.display_price()
        );

        let body = self
            .post_form("/v1/checkout/sessions", &request.idempotency_key, &params)
            .await?;

        let session: StripeCheckoutSessionResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("failed to parse Stripe response: {}", e))
        })?;

        let checkout_url = session.url.ok_or_else(|| PaymentError::Provider {
            provider: PROVIDER.to_string(),
            message: format!("checkout session {} has no redirect URL", session.id),
        })?;

        info!(
            "Created Stripe checkout session: id={}, url={}",
            session.id, checkout_url
        );

        Ok(CheckoutSession {
            session_id: session.id,
            checkout_url,
            customer_id: session.customer,
            expires_at: session
                .expires_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self, request), fields(amount = request.amount))]
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> PaymentResult<PaymentIntent> {
        let params = Self::payment_intent_form_params(request);

        let body = self
            .post_form("/v1/payment_intents", &request.idempotency_key, &params)
            .await?;

        let intent: StripePaymentIntentResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("failed to parse Stripe response: {}", e))
        })?;

        info!(
            "Created Stripe payment intent: id={}, status={}",
            intent.id, intent.status
        );

        let currency = Currency::from_code(&intent.currency);
        if currency.is_none() {
            warn!(
                "Unrecognized currency {:?} on payment intent {}",
                intent.currency, intent.id
            );
        }

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency,
            status: intent.status,
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<WebhookEvent> {
        verify_signature(
            &self.config.webhook_secret,
            payload,
            signature,
            DEFAULT_TOLERANCE_SECS,
            Utc::now().timestamp(),
        )?;

        let event = parse_event(payload)?;
        debug!("Verified Stripe webhook: type={}", event.event_type);
        Ok(event)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    client_secret: String,
    amount: i64,
    currency: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
