//! HTTP-level tests: drive the router with `oneshot` against a recording
//! strategy, and end-to-end against a mocked Stripe API.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pay_api::{create_router, AppConfig, AppState};
use pay_core::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentIntent, PaymentIntentRequest,
    PaymentResult, PaymentStrategy, WebhookEvent,
};
use pay_stripe::signature::{signature_header, verify_signature, DEFAULT_TOLERANCE_SECS};
use pay_stripe::webhook::parse_event;
use pay_stripe::{CheckoutCompletedData, StripeCheckoutStrategy, StripeConfig, WebhookHandler};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBHOOK_SECRET: &str = "whsec_api_test";

// =============================================================================
// Fakes
// =============================================================================

/// Strategy that records what it was asked to do instead of calling Stripe
#[derive(Default)]
struct RecordingStrategy {
    checkout_calls: AtomicUsize,
    intent_calls: AtomicUsize,
    last_checkout: Mutex<Option<CheckoutRequest>>,
    fail_with: Option<String>,
}

#[async_trait]
impl PaymentStrategy for RecordingStrategy {
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        self.checkout_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_checkout.lock().unwrap() = Some(request.clone());

        if let Some(message) = &self.fail_with {
            return Err(PaymentError::Provider {
                provider: "fake".into(),
                message: message.clone(),
            });
        }
        Ok(CheckoutSession::new(
            "cs_fake_1",
            "https://checkout.stripe.com/c/pay/cs_fake_1",
        ))
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> PaymentResult<PaymentIntent> {
        self.intent_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_with {
            return Err(PaymentError::Provider {
                provider: "fake".into(),
                message: message.clone(),
            });
        }
        Ok(PaymentIntent {
            id: "pi_fake".into(),
            client_secret: format!("pi_fake_secret_{}", request.amount),
            amount: request.amount,
            currency: Some(request.currency),
            status: "requires_payment_method".into(),
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<WebhookEvent> {
        verify_signature(
            WEBHOOK_SECRET,
            payload,
            signature,
            DEFAULT_TOLERANCE_SECS,
            chrono::Utc::now().timestamp(),
        )?;
        parse_event(payload)
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
struct RecordingHandler {
    completed: Mutex<Vec<CheckoutCompletedData>>,
    other: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl WebhookHandler for RecordingHandler {
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> PaymentResult<()> {
        self.completed.lock().unwrap().push(data);
        if self.fail {
            return Err(PaymentError::Network("plan service unavailable".into()));
        }
        Ok(())
    }

    async fn on_payment_succeeded(&self, _event: &WebhookEvent) -> PaymentResult<()> {
        self.other.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_unknown_event(&self, _event: &WebhookEvent) -> PaymentResult<()> {
        self.other.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl RecordingHandler {
    fn dispatched(&self) -> usize {
        self.completed.lock().unwrap().len() + self.other.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key: &str| match key {
        "BASE_URL" => Some("https://app.example.com.br".to_string()),
        _ => None,
    })
    .unwrap()
}

fn app_with(strategy: Arc<RecordingStrategy>, handler: Arc<RecordingHandler>) -> Router {
    let state = AppState::with_strategy(test_config(), strategy).with_webhook_handler(handler);
    create_router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_webhook(payload: &[u8], signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/stripe/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(payload.to_vec())).unwrap()
}

fn as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn checkout_completed_payload() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {
            "id": "cs_test_1",
            "client_reference_id": "u1",
            "amount_total": 2390,
            "currency": "brl",
            "payment_status": "paid",
            "metadata": { "user_id": "u1", "user_email": "a@b.com", "user_name": "Ana" }
        }}
    }))
    .unwrap()
}

fn sign(payload: &[u8]) -> String {
    signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), payload)
}

// =============================================================================
// Liveness
// =============================================================================

#[tokio::test]
async fn health_and_root_respond() {
    let app = app_with(Default::default(), Default::default());

    let (status, body) = send(
        app.clone(),
        Request::get("/api/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["status"], "healthy");

    let (status, body) = send(app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Servidor Stripe funcionando!");
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn checkout_returns_url_and_session_id() {
    let strategy = Arc::new(RecordingStrategy::default());
    let app = app_with(strategy.clone(), Default::default());

    let (status, body) = send(
        app,
        post_json(
            "/api/stripe/create-checkout",
            json!({
                "user_id": "u1",
                "user_email": "a@b.com",
                "user_name": "Ana",
                "success_url": "https://x/ok",
                "cancel_url": "https://x/no"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        as_json(&body),
        json!({
            "url": "https://checkout.stripe.com/c/pay/cs_fake_1",
            "session_id": "cs_fake_1"
        })
    );

    let sent = strategy.last_checkout.lock().unwrap().clone().unwrap();
    assert_eq!(sent.plan.unit_amount, 2390);
    assert_eq!(sent.plan.currency.as_str(), "brl");
    assert_eq!(sent.success_url, "https://x/ok");
    assert_eq!(sent.cancel_url, "https://x/no");
    let metadata = sent.user.metadata();
    assert_eq!(metadata["user_id"], "u1");
    assert_eq!(metadata["user_email"], "a@b.com");
    assert_eq!(metadata["user_name"], "Ana");
}

#[tokio::test]
async fn checkout_uses_default_redirect_urls() {
    let strategy = Arc::new(RecordingStrategy::default());
    let app = app_with(strategy.clone(), Default::default());

    let (status, _) = send(
        app,
        post_json(
            "/api/stripe/create-checkout",
            json!({ "user_id": "u1", "user_email": "a@b.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let sent = strategy.last_checkout.lock().unwrap().clone().unwrap();
    assert_eq!(
        sent.success_url,
        "https://app.example.com.br/pagamento-sucesso?session_id={CHECKOUT_SESSION_ID}"
    );
    assert_eq!(sent.cancel_url, "https://app.example.com.br/");
}

#[tokio::test]
async fn checkout_missing_identity_is_rejected_without_provider_call() {
    let strategy = Arc::new(RecordingStrategy::default());

    let bodies = [
        json!({ "user_id": "u1", "user_name": "Ana" }),
        json!({ "user_email": "a@b.com" }),
        json!({ "user_id": "", "user_email": "a@b.com" }),
        json!({}),
    ];

    for body in bodies {
        let app = app_with(strategy.clone(), Default::default());
        let (status, response) = send(app, post_json("/api/stripe/create-checkout", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(as_json(&response)["error"]
            .as_str()
            .unwrap()
            .ends_with("is required"));
    }

    assert_eq!(strategy.checkout_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn checkout_mistyped_body_is_400_json() {
    let strategy = Arc::new(RecordingStrategy::default());
    let app = app_with(strategy.clone(), Default::default());

    let (status, body) = send(
        app,
        post_json(
            "/api/stripe/create-checkout",
            json!({ "user_id": 1, "user_email": "a@b.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = as_json(&body);
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("user_id"));
    assert_eq!(strategy.checkout_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn checkout_provider_failure_is_500_with_message() {
    let strategy = Arc::new(RecordingStrategy {
        fail_with: Some("No such price".into()),
        ..Default::default()
    });
    let app = app_with(strategy.clone(), Default::default());

    let (status, body) = send(
        app,
        post_json(
            "/api/stripe/create-checkout",
            json!({ "user_id": "u1", "user_email": "a@b.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(as_json(&body)["error"], "No such price");
    assert_eq!(strategy.checkout_calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Payment intent
// =============================================================================

#[tokio::test]
async fn payment_intent_returns_client_secret() {
    let strategy = Arc::new(RecordingStrategy::default());
    let app = app_with(strategy.clone(), Default::default());

    let (status, body) = send(
        app,
        post_json("/create-payment-intent", json!({ "amount": 5000 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({ "clientSecret": "pi_fake_secret_5000" }));
}

#[tokio::test]
async fn payment_intent_requires_positive_amount() {
    let strategy = Arc::new(RecordingStrategy::default());

    for body in [json!({}), json!({ "amount": 0 })] {
        let app = app_with(strategy.clone(), Default::default());
        let (status, _) = send(app, post_json("/create-payment-intent", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    assert_eq!(strategy.intent_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn payment_intent_malformed_body_is_400_json() {
    let strategy = Arc::new(RecordingStrategy::default());

    let requests = [
        post_json("/create-payment-intent", json!({ "amount": "100" })),
        post_json("/create-payment-intent", json!({ "amount": 10.5 })),
        Request::builder()
            .method("POST")
            .uri("/create-payment-intent")
            .header("content-type", "application/json")
            .body(Body::from("{\"amount\":"))
            .unwrap(),
    ];

    for request in requests {
        let app = app_with(strategy.clone(), Default::default());
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = as_json(&body);
        assert_eq!(body["code"], 400);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    assert_eq!(strategy.intent_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn payment_intent_provider_failure_is_500() {
    let strategy = Arc::new(RecordingStrategy {
        fail_with: Some("Amount must be at least R$0.50".into()),
        ..Default::default()
    });
    let app = app_with(strategy, Default::default());

    let (status, body) = send(
        app,
        post_json("/create-payment-intent", json!({ "amount": 10 })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(as_json(&body)["error"], "Amount must be at least R$0.50");
}

// =============================================================================
// Webhook
// =============================================================================

#[tokio::test]
async fn webhook_valid_signature_is_acknowledged_and_dispatched() {
    let handler = Arc::new(RecordingHandler::default());
    let app = app_with(Default::default(), handler.clone());
    let payload = checkout_completed_payload();

    let (status, body) = send(app, post_webhook(&payload, Some(&sign(&payload)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({ "received": true }));

    let completed = handler.completed.lock().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].user_id.as_deref(), Some("u1"));
    assert_eq!(completed[0].user_email.as_deref(), Some("a@b.com"));
    assert_eq!(completed[0].amount_total, 2390);
}

#[tokio::test]
async fn webhook_bad_signature_is_rejected_without_dispatch() {
    let handler = Arc::new(RecordingHandler::default());
    let payload = checkout_completed_payload();
    let forged = signature_header("whsec_forged", chrono::Utc::now().timestamp(), &payload);
    let stale = signature_header(
        WEBHOOK_SECRET,
        chrono::Utc::now().timestamp() - 3600,
        &payload,
    );

    let extreme = format!("t={},v1=00", i64::MIN + 1);

    for signature in [
        Some(forged.as_str()),
        Some(stale.as_str()),
        Some(extreme.as_str()),
        Some("t=1"),
        None,
    ] {
        let app = app_with(Default::default(), handler.clone());
        let (status, body) = send(app, post_webhook(&payload, signature)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().starts_with("Webhook Error:"));
    }

    assert_eq!(handler.dispatched(), 0);
}

#[tokio::test]
async fn webhook_tampered_body_is_rejected() {
    let handler = Arc::new(RecordingHandler::default());
    let app = app_with(Default::default(), handler.clone());
    let payload = checkout_completed_payload();
    let signature = sign(&payload);

    let mut tampered = payload.clone();
    tampered.extend_from_slice(b" ");

    let (status, _) = send(app, post_webhook(&tampered, Some(&signature))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(handler.dispatched(), 0);
}

#[tokio::test]
async fn webhook_handler_failure_still_acknowledged() {
    let handler = Arc::new(RecordingHandler {
        fail: true,
        ..Default::default()
    });
    let app = app_with(Default::default(), handler.clone());
    let payload = checkout_completed_payload();

    let (status, body) = send(app, post_webhook(&payload, Some(&sign(&payload)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({ "received": true }));
    assert_eq!(handler.completed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn webhook_unknown_event_type_is_acknowledged() {
    let handler = Arc::new(RecordingHandler::default());
    let app = app_with(Default::default(), handler.clone());
    let payload = serde_json::to_vec(&json!({
        "id": "evt_2",
        "type": "invoice.payment_failed",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": { "id": "in_1" } }
    }))
    .unwrap();

    let (status, body) = send(app, post_webhook(&payload, Some(&sign(&payload)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({ "received": true }));
    assert_eq!(handler.other.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn webhook_redelivery_is_acknowledged_twice() {
    let handler = Arc::new(RecordingHandler::default());
    let payload = checkout_completed_payload();
    let signature = sign(&payload);

    for _ in 0..2 {
        let app = app_with(Default::default(), handler.clone());
        let (status, body) = send(app, post_webhook(&payload, Some(&signature))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!({ "received": true }));
    }

    assert_eq!(handler.completed.lock().unwrap().len(), 2);
}

// =============================================================================
// End-to-end against a mocked Stripe API
// =============================================================================

#[tokio::test]
async fn end_to_end_checkout_with_stripe_strategy() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(body_string_contains("currency%5D=brl"))
        .and(body_string_contains("unit_amount%5D=2390"))
        .and(body_string_contains("metadata%5Buser_name%5D=Ana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_live_e2e",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_live_e2e"
        })))
        .expect(1)
        .mount(&stripe)
        .await;

    let config = StripeConfig::new("sk_test_e2e", WEBHOOK_SECRET).with_api_base_url(stripe.uri());
    let strategy = StripeCheckoutStrategy::new(config).unwrap();
    let app = create_router(AppState::with_strategy(test_config(), Arc::new(strategy)));

    let (status, body) = send(
        app,
        post_json(
            "/api/stripe/create-checkout",
            json!({
                "user_id": "u1",
                "user_email": "a@b.com",
                "user_name": "Ana",
                "success_url": "https://x/ok",
                "cancel_url": "https://x/no"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        as_json(&body),
        json!({
            "url": "https://checkout.stripe.com/c/pay/cs_live_e2e",
            "session_id": "cs_live_e2e"
        })
    );
}

#[tokio::test]
async fn end_to_end_webhook_with_stripe_strategy() {
    let config = StripeConfig::new("sk_test_e2e", WEBHOOK_SECRET)
        .with_api_base_url("http://127.0.0.1:9");
    let strategy = StripeCheckoutStrategy::new(config).unwrap();
    let handler = Arc::new(RecordingHandler::default());
    let app = create_router(
        AppState::with_strategy(test_config(), Arc::new(strategy))
            .with_webhook_handler(handler.clone()),
    );
    let payload = checkout_completed_payload();

    let (status, _) = send(app.clone(), post_webhook(&payload, Some(&sign(&payload)))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, post_webhook(&payload, Some("t=1,v1=00"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(handler.completed.lock().unwrap().len(), 1);
}
