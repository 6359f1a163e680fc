//! # pay-core
//!
//! Core types and traits for the pay-relay payment service.
//!
//! This crate provides:
//! - `PaymentStrategy` trait for implementing payment providers
//! - `Plan` and `Currency` for the product sold through checkout
//! - `CheckoutRequest`, `PaymentIntentRequest`, and `WebhookEvent` for the two flows
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{CheckoutRequest, CheckoutUrls, Plan, UserIdentity};
//!
//! let user = UserIdentity::validated(Some("u1".into()), Some("a@b.com".into()), None)?;
//! let (success, cancel) = CheckoutUrls::new("https://app.example.com.br").resolve(None, None);
//! let request = CheckoutRequest::new(user, Plan::premium(), success, cancel);
//!
//! let session = strategy.create_checkout(&request).await?;
//! // Redirect user to session.checkout_url
//! ```

pub mod error;
pub mod payment;
pub mod plan;
pub mod strategy;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use payment::{
    CheckoutRequest, CheckoutSession, PaymentIntent, PaymentIntentRequest, UserIdentity,
    WebhookEvent, WebhookEventType,
};
pub use plan::{BillingInterval, Currency, Plan};
pub use strategy::{BoxedPaymentStrategy, CheckoutUrls, PaymentStrategy};
