//! # pay-relay
//!
//! Relays checkout and payment intent requests to Stripe and receives its
//! webhooks.
//!
//! ## Usage
//!
//! ```bash
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//!
//! pay-relay
//! ```

use pay_api::{routes, state::AppState};
use pay_stripe::REQUIRED_WEBHOOK_EVENTS;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!(
        "pay-relay v{} ({})",
        env!("CARGO_PKG_VERSION"),
        state.config.environment
    );
    info!(
        "Plan: {} ({}), provider: {}",
        state.plan.name,
        state.plan.display_price(),
        state.strategy.provider_name()
    );

    let app = routes::create_router(state);

    info!("Listening on http://{}", addr);

    if !is_prod {
        info!("Checkout: POST http://{}/api/stripe/create-checkout", addr);
        info!(
            "Webhook: POST http://{}/api/stripe/webhook (events: {})",
            addr,
            REQUIRED_WEBHOOK_EVENTS.join(", ")
        );
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
