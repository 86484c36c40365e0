//! Stripe Checkout session client
//!
//! Creates hosted subscription checkout sessions. The caller is redirected
//! to the returned URL; completion comes back asynchronously through the
//! webhook, never through this client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use versewright_common::config::BillingConfig;
use versewright_common::{Error, Result};

/// Stripe API base URL
const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

/// Default timeout for Stripe API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect origin used when neither the request nor config supplies one
const DEFAULT_ORIGIN: &str = "http://localhost:5173";

/// A created checkout session
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted checkout page the client should redirect to
    pub url: String,
}

/// Client for the checkout sessions endpoint
pub struct CheckoutClient {
    http_client: Client,
    secret_key: String,
    price_id: String,
    base_url: String,
    fallback_origin: Option<String>,
}

impl CheckoutClient {
    /// Build a client from billing configuration
    ///
    /// Returns `None` unless both the secret key and the subscription price
    /// are configured; without them checkout is simply unavailable.
    pub fn from_config(config: &BillingConfig) -> Option<Self> {
        let secret_key = config.secret_key.clone()?;
        let price_id = config.price_id.clone()?;
        Some(Self::new(secret_key, price_id, config.checkout_origin.clone()))
    }

    pub fn new(secret_key: String, price_id: String, fallback_origin: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            secret_key,
            price_id,
            base_url: STRIPE_API_URL.to_string(),
            fallback_origin,
        }
    }

    /// Point the client at a different API host; tests aim this at a mock
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Create a subscription checkout session for a user
    ///
    /// `request_origin` comes from the request's `Origin` header and decides
    /// where Stripe redirects after success or cancel.
    ///
    /// # Errors
    /// Returns `Error::Billing` if:
    /// - Network request fails
    /// - Stripe returns a non-success status
    /// - Response parse fails
    pub async fn create_session(
        &self,
        user_id: &str,
        email: Option<&str>,
        request_origin: Option<&str>,
    ) -> Result<CheckoutSession> {
        let origin = self.resolve_origin(request_origin);
        let url = format!("{}/checkout/sessions", self.base_url);

        debug!(user_id = %user_id, origin = %origin, "Creating checkout session");

        let mut form = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", self.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "success_url",
                format!("{}?session_id={{CHECKOUT_SESSION_ID}}", origin),
            ),
            ("cancel_url", origin.to_string()),
            ("metadata[user_id]", user_id.to_string()),
            ("subscription_data[metadata][user_id]", user_id.to_string()),
        ];
        // Stripe rejects an empty customer_email outright
        if let Some(email) = email.filter(|e| !e.is_empty()) {
            form.push(("customer_email", email.to_string()));
        }

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Billing(format!("Stripe API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Billing(format!(
                "Stripe API returned error {}: {}",
                status, body
            )));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| Error::Billing(format!("Failed to parse Stripe response: {}", e)))?;

        debug!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }

    fn resolve_origin<'a>(&'a self, request_origin: Option<&'a str>) -> &'a str {
        request_origin
            .filter(|o| !o.is_empty())
            .or(self.fallback_origin.as_deref())
            .unwrap_or(DEFAULT_ORIGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> CheckoutClient {
        CheckoutClient::new("sk_test_123".to_string(), "price_123".to_string(), None)
            .with_base_url(base_url.to_string())
    }

    #[test]
    fn test_from_config_requires_key_and_price() {
        let mut config = BillingConfig::default();
        assert!(CheckoutClient::from_config(&config).is_none());

        config.secret_key = Some("sk_test_123".to_string());
        assert!(CheckoutClient::from_config(&config).is_none());

        config.price_id = Some("price_123".to_string());
        assert!(CheckoutClient::from_config(&config).is_some());
    }

    #[test]
    fn test_origin_resolution_order() {
        let with_fallback = CheckoutClient::new(
            "sk".to_string(),
            "price".to_string(),
            Some("https://versewright.example.com".to_string()),
        );
        assert_eq!(
            with_fallback.resolve_origin(Some("https://app.example.com")),
            "https://app.example.com"
        );
        assert_eq!(
            with_fallback.resolve_origin(None),
            "https://versewright.example.com"
        );

        let bare = CheckoutClient::new("sk".to_string(), "price".to_string(), None);
        assert_eq!(bare.resolve_origin(None), DEFAULT_ORIGIN);
        assert_eq!(bare.resolve_origin(Some("")), DEFAULT_ORIGIN);
    }

    #[tokio::test]
    async fn test_create_session_posts_subscription_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout/sessions"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("mode=subscription"))
            .and(body_string_contains("metadata%5Buser_id%5D=user-1"))
            .and(body_string_contains("customer_email=poet%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1"
            })))
            .mount(&server)
            .await;

        let session = client(&server.uri())
            .create_session("user-1", Some("poet@example.com"), Some("https://app.example.com"))
            .await
            .unwrap();

        assert_eq!(session.id, "cs_test_1");
        assert!(session.url.starts_with("https://checkout.stripe.com/"));
    }

    #[tokio::test]
    async fn test_stripe_error_maps_to_billing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout/sessions"))
            .respond_with(ResponseTemplate::new(402).set_body_string("card declined"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .create_session("user-1", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Billing(_)));
        assert!(err.to_string().contains("402"));
    }
}
