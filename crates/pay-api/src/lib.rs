//! # pay-api
//!
//! HTTP API layer for pay-relay.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Liveness line |
//! | GET | `/api/health` | Health check |
//! | POST | `/create-payment-intent` | Create payment intent, returns `clientSecret` |
//! | POST | `/api/stripe/create-checkout` | Create checkout session, returns `url` |
//! | POST | `/api/stripe/webhook` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
