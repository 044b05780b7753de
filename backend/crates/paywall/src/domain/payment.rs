//! Payment Provider Interface
//!
//! The payment-session provider is an external collaborator consumed
//! through this narrow surface. The HTTP implementation lives in the
//! infrastructure layer; tests substitute their own.

use crate::error::PaywallResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Settlement state of a checkout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// A checkout session as reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page, present on freshly created sessions
    pub url: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub customer_email: Option<String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status,
            PaymentStatus::Paid | PaymentStatus::NoPaymentRequired
        )
    }
}

/// What is being sold in a checkout session
#[derive(Debug, Clone)]
pub struct CheckoutItem {
    pub content_id: String,
    pub name: String,
    pub amount_cents: u32,
    pub currency: String,
}

/// Payment provider trait
#[trait_variant::make(PaymentProvider: Send)]
pub trait LocalPaymentProvider {
    /// Create a checkout session for one item
    async fn create_session(
        &self,
        item: &CheckoutItem,
        metadata: &HashMap<String, String>,
        success_url: &str,
        cancel_url: &str,
    ) -> PaywallResult<CheckoutSession>;

    /// Retrieve an existing session by id
    async fn retrieve_session(&self, session_id: &str) -> PaywallResult<CheckoutSession>;
}
