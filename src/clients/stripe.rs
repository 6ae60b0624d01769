use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::clients::gateway::{CheckoutSession, PaymentGateway};
use crate::config::StripeConfig;

/// Minimal Stripe API client covering the product -> price -> checkout
/// session chain. Requests use the form-encoded v1 API.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
    api_key: String,
    success_url: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .build()
            .context("Failed to build Stripe HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            success_url: config.success_url.clone(),
            currency: config.currency.clone(),
        })
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Stripe request to {path} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Stripe returned {status} for {path}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to decode Stripe response from {path}"))
    }

    async fn create_product(&self, name: &str) -> Result<String> {
        let product: ProductResponse = self
            .post_form("/v1/products", &[("name", name.to_string())])
            .await?;

        debug!("Created Stripe product {}", product.id);
        Ok(product.id)
    }

    async fn create_price(&self, product_id: &str, amount: f64) -> Result<String> {
        let unit_amount = to_minor_units(amount);

        let price: PriceResponse = self
            .post_form(
                "/v1/prices",
                &[
                    ("product", product_id.to_string()),
                    ("unit_amount", unit_amount.to_string()),
                    ("currency", self.currency.clone()),
                ],
            )
            .await?;

        debug!("Created Stripe price {} ({unit_amount})", price.id);
        Ok(price.id)
    }

    async fn create_session(&self, price_id: &str) -> Result<SessionResponse> {
        let session: SessionResponse = self
            .post_form(
                "/v1/checkout/sessions",
                &[
                    ("success_url", self.success_url.clone()),
                    ("line_items[0][price]", price_id.to_string()),
                    ("line_items[0][quantity]", "1".to_string()),
                    ("mode", "payment".to_string()),
                ],
            )
            .await?;

        Ok(session)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout(&self, product_name: &str, amount: f64) -> Result<CheckoutSession> {
        let product_id = self.create_product(product_name).await?;
        let price_id = self.create_price(&product_id, amount).await?;
        let session = self.create_session(&price_id).await?;

        Ok(CheckoutSession {
            session_id: session.id,
            payment_link: session.url,
        })
    }
}

/// Convert a major-unit amount to integer minor units (kopecks).
#[must_use]
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
