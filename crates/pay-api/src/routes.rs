//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main application router
///
/// Routes:
/// - GET  /                             - Liveness line
/// - GET  /api/health                   - Health check
/// - POST /create-payment-intent        - Raw payment intent
/// - POST /api/stripe/create-checkout   - Subscription checkout session
/// - POST /api/stripe/webhook           - Stripe webhook (raw body)
pub fn create_router(state: AppState) -> Router {
    let stripe_routes = Router::new()
        .route("/create-checkout", post(handlers::create_checkout))
        .route("/webhook", post(handlers::stripe_webhook));

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .nest("/api/stripe", stripe_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
