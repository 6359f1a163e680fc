//! # Plan Types
//!
//! The subscription plan sold through the checkout flow.
//! A built-in premium plan is used unless `config/plan.toml` overrides it.

use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    BRL,
    USD,
    EUR,
}

impl Currency {
    /// Returns the ISO 4217 currency code in the lowercase form Stripe expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::BRL => "brl",
            Currency::USD => "usd",
            Currency::EUR => "eur",
        }
    }

    /// Parse a provider currency code, case-insensitively
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "brl" => Some(Currency::BRL),
            "usd" => Some(Currency::USD),
            "eur" => Some(Currency::EUR),
            _ => None,
        }
    }

    /// Format an amount in minor units for display (e.g. "R$ 23.90")
    pub fn display_amount(&self, minor_units: i64) -> String {
        let symbol = match self {
            Currency::BRL => "R$ ",
            Currency::USD => "$",
            Currency::EUR => "€",
        };
        format!("{}{}.{:02}", symbol, minor_units / 100, (minor_units % 100).abs())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::BRL
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Billing interval for the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    /// One-time payment (not a subscription)
    OneTime,
    Monthly,
    Yearly,
}

impl BillingInterval {
    /// Stripe `recurring[interval]` value, `None` for one-time prices
    pub fn stripe_interval(&self) -> Option<&'static str> {
        match self {
            BillingInterval::OneTime => None,
            BillingInterval::Monthly => Some("month"),
            BillingInterval::Yearly => Some("year"),
        }
    }
}

impl Default for BillingInterval {
    fn default() -> Self {
        BillingInterval::Monthly
    }
}

/// The product sold by the checkout flow.
///
/// Price and description are fixed server-side; callers only supply identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier (e.g. "premium")
    pub id: String,

    /// Display name shown on the hosted payment page
    pub name: String,

    /// Short description shown under the name
    pub description: String,

    /// Price per interval in minor units
    pub unit_amount: i64,

    #[serde(default)]
    pub currency: Currency,

    #[serde(default)]
    pub interval: BillingInterval,
}

impl Plan {
    /// The default premium plan: R$ 23,90 per month
    pub fn premium() -> Self {
        Self {
            id: "premium".to_string(),
            name: "Plano Premium".to_string(),
            description: "Acesso completo a todos os recursos premium".to_string(),
            unit_amount: 2390,
            currency: Currency::BRL,
            interval: BillingInterval::Monthly,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.interval.stripe_interval().is_some()
    }

    /// Parse a plan from TOML text
    pub fn from_toml(content: &str) -> PaymentResult<Self> {
        let plan: Plan = toml::from_str(content)
            .map_err(|e| PaymentError::Configuration(format!("invalid plan file: {}", e)))?;

        if plan.unit_amount <= 0 {
            return Err(PaymentError::Configuration(
                "plan unit_amount must be positive".to_string(),
            ));
        }

        Ok(plan)
    }

    /// Load a plan from a TOML file
    pub fn load(path: impl AsRef<Path>) -> PaymentResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PaymentError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Price for display, e.g. "R$ 23.90"
    pub fn display_price(&self) -> String {
        self.currency.display_amount(self.unit_amount)
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::premium()
    }
}
