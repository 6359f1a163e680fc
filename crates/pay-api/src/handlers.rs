//! # Request Handlers
//!
//! Axum request handlers for the payment API.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use pay_core::{CheckoutRequest, Currency, PaymentError, PaymentIntentRequest, UserIdentity};
use pay_stripe::dispatch_webhook_event;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// Header Stripe puts the webhook signature in
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Raw payment intent request
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Amount in minor units (centavos)
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
}

/// Subscription checkout request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    /// Falls back to the configured success page
    #[serde(default)]
    pub success_url: Option<String>,
    /// Falls back to the configured cancel page
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    /// Checkout URL (redirect user here)
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Unwrap a JSON body, answering malformed or mistyped bodies with a 400 `{error, code}`
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        let message = rejection.body_text();
        warn!("Rejected request body: {}", message);
        payment_error_to_response(PaymentError::validation(message))
    })
}

fn webhook_rejection(err: &PaymentError) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", err))
}

// =============================================================================
// Handlers
// =============================================================================

/// Liveness line at `/`
pub async fn root() -> &'static str {
    "Servidor Stripe funcionando!"
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "pay-relay",
        "provider": state.strategy.provider_name(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a payment intent for a caller-supplied amount
#[instrument(skip_all, fields(amount = tracing::field::Empty))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentIntentResponse>, ApiError> {
    let request = json_body(payload)?;
    if let Some(amount) = request.amount {
        tracing::Span::current().record("amount", amount);
    }

    let intent_request =
        PaymentIntentRequest::new(request.amount, Currency::BRL).map_err(|e| {
            warn!("Rejected payment intent request: {}", e);
            payment_error_to_response(e)
        })?;

    let intent = state
        .strategy
        .create_payment_intent(&intent_request)
        .await
        .map_err(|e| {
            error!("Failed to create payment intent: {}", e);
            payment_error_to_response(e)
        })?;

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// Create a subscription checkout session for a user
#[instrument(skip_all, fields(user_id = tracing::field::Empty))]
pub async fn create_checkout(
    State(state): State<AppState>,
    payload: Result<Json<CreateCheckoutRequest>, JsonRejection>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let request = json_body(payload)?;
    if let Some(user_id) = request.user_id.as_deref() {
        tracing::Span::current().record("user_id", user_id);
    }

    let user = UserIdentity::validated(request.user_id, request.user_email, request.user_name)
        .map_err(|e| {
            warn!("Rejected checkout request: {}", e);
            payment_error_to_response(e)
        })?;

    let (success_url, cancel_url) = state
        .urls
        .resolve(request.success_url.as_deref(), request.cancel_url.as_deref());

    info!(
        "Creating checkout: user={}, plan={}, price={}, success_url={}",
        user.user_id,
        state.plan.id,
        state.plan.display_price(),
        success_url
    );

    let checkout = CheckoutRequest::new(user, state.plan.clone(), success_url, cancel_url);

    let session = state
        .strategy
        .create_checkout(&checkout)
        .await
        .map_err(|e| {
            error!("Failed to create checkout: {}", e);
            payment_error_to_response(e)
        })?;

    info!("Created checkout session: {}", session.session_id);

    Ok(Json(CreateCheckoutResponse {
        url: session.checkout_url,
        session_id: session.session_id,
    }))
}

fn signature_header(headers: &HeaderMap) -> Result<&str, PaymentError> {
    let value = headers.get(STRIPE_SIGNATURE_HEADER).ok_or_else(|| {
        PaymentError::SignatureVerification("missing stripe-signature header".to_string())
    })?;
    value.to_str().map_err(|_| {
        PaymentError::SignatureVerification(
            "stripe-signature header is not valid ASCII".to_string(),
        )
    })
}

/// Handle a Stripe webhook delivery.
///
/// The body must reach this handler unparsed; the signature covers the exact
/// bytes Stripe sent.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, (StatusCode, String)> {
    let signature = signature_header(&headers).map_err(|e| {
        warn!("Webhook rejected before verification: {}", e);
        webhook_rejection(&e)
    })?;

    let event = state
        .strategy
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            warn!("Webhook verification failed: {}", e);
            webhook_rejection(&e)
        })?;

    info!(
        "Received webhook: type={}, id={}",
        event.event_type, event.event_id
    );

    // Stripe redelivers on anything but 2xx; a failing handler must not cause that.
    if let Err(e) = dispatch_webhook_event(state.webhook_handler.as_ref(), &event).await {
        error!(
            "Webhook handler error: type={}, id={}: {}",
            event.event_type, event.event_id, e
        );
    }

    Ok(Json(WebhookAck { received: true }))
}
