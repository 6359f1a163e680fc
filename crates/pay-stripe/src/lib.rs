//! # pay-stripe
//!
//! Stripe adapter for pay-relay.
//!
//! - **StripeCheckoutStrategy** creates hosted Checkout Sessions for the plan
//!   and raw Payment Intents, and verifies webhook deliveries.
//! - **signature** implements Stripe's `Stripe-Signature` HMAC scheme.
//! - **webhook** parses verified events and dispatches them to a
//!   [`WebhookHandler`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_stripe::StripeCheckoutStrategy;
//! use pay_core::{CheckoutRequest, PaymentStrategy};
//!
//! let strategy = StripeCheckoutStrategy::from_env()?;
//! let session = strategy.create_checkout(&request).await?;
//! // Redirect user to session.checkout_url
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use pay_stripe::{dispatch_webhook_event, LoggingWebhookHandler};
//!
//! let event = strategy.verify_webhook(&body, signature).await?;
//! dispatch_webhook_event(&LoggingWebhookHandler, &event).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod signature;
pub mod webhook;

// Re-exports
pub use checkout::StripeCheckoutStrategy;
pub use config::StripeConfig;
pub use webhook::{
    dispatch_webhook_event, CheckoutCompletedData, LoggingWebhookHandler, WebhookHandler,
    REQUIRED_WEBHOOK_EVENTS,
};
