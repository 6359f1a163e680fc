//! # Application State
//!
//! Shared state for the Axum application.
//! Built once at start-up and immutable afterwards: the payment strategy,
//! the webhook handler, the plan, and the redirect URL defaults.

use pay_core::{BoxedPaymentStrategy, CheckoutUrls, Plan};
use pay_stripe::{LoggingWebhookHandler, StripeCheckoutStrategy, WebhookHandler};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_PLAN_PATHS: [&str; 3] = [
    "config/plan.toml",
    "../config/plan.toml",
    "../../config/plan.toml",
];

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL the default redirect URLs are built from
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Explicit plan file (`PLAN_CONFIG`)
    pub plan_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got {:?}", raw))?,
            None => 3000,
        };

        let config = Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            base_url: lookup("BASE_URL").unwrap_or_else(|| format!("http://localhost:{}", port)),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            plan_path: lookup("PLAN_CONFIG").map(PathBuf::from),
        };

        config.socket_addr()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment provider, shared by every request
    pub strategy: BoxedPaymentStrategy,
    /// Receives verified webhook events
    pub webhook_handler: Arc<dyn WebhookHandler>,
    /// The plan sold by the checkout flow
    pub plan: Plan,
    /// Default redirect URLs
    pub urls: CheckoutUrls,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the production state: Stripe strategy and logging webhook handler
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let plan = load_plan(config.plan_path.as_deref())?;

        let stripe = StripeCheckoutStrategy::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        if stripe.config().is_live_mode() && !config.is_production() {
            tracing::warn!("Live Stripe key in use outside production");
        }
        if stripe.config().is_test_mode() && config.is_production() {
            tracing::warn!("Test Stripe key in use in production");
        }

        Ok(Self::with_strategy(config, Arc::new(stripe)).with_plan(plan))
    }

    /// Create state around an existing strategy
    pub fn with_strategy(config: AppConfig, strategy: BoxedPaymentStrategy) -> Self {
        Self {
            strategy,
            webhook_handler: Arc::new(LoggingWebhookHandler),
            plan: Plan::premium(),
            urls: CheckoutUrls::new(&config.base_url),
            config,
        }
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_webhook_handler(mut self, handler: Arc<dyn WebhookHandler>) -> Self {
        self.webhook_handler = handler;
        self
    }
}

/// Load the plan from an explicit file, a default location, or fall back to premium
fn load_plan(explicit: Option<&Path>) -> anyhow::Result<Plan> {
    if let Some(path) = explicit {
        let plan = Plan::load(path)?;
        tracing::info!("Loaded plan {} from {}", plan.id, path.display());
        return Ok(plan);
    }

    for path in DEFAULT_PLAN_PATHS {
        if Path::new(path).is_file() {
            let plan = Plan::load(path)?;
            tracing::info!("Loaded plan {} from {}", plan.id, path);
            return Ok(plan);
        }
    }

    tracing::info!("No plan file found, using built-in premium plan");
    Ok(Plan::premium())
}
