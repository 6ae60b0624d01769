use anyhow::Result;
use async_trait::async_trait;

/// Result of the product/price/session chain at the payment provider.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub payment_link: String,
}

/// External checkout provider. The production implementation talks to
/// Stripe; tests substitute a recording mock.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a product, a price in minor units, and a checkout session
    /// for it, returning the session id and the hosted payment link.
    async fn create_checkout(&self, product_name: &str, amount: f64) -> Result<CheckoutSession>;
}
