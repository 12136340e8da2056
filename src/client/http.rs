//! `reqwest`-backed [`PaymentsApi`]
//!
//! One client, one contract: every bulk endpoint takes
//! `{ "payment_ids": [...], ...options }`.

use crate::config::ClientConfig;
use crate::core::entity::{NewPayment, PaymentId, PaymentRecord};
use crate::core::error::{PayError, PayResult};
use crate::core::lifecycle::{BulkOperation, Transition};
use crate::core::outcome::{BulkOperationResult, BulkRequest, ValidateRequest, ValidationReport};
use crate::core::query::{PaymentFilters, PaymentPage};
use crate::core::service::PaymentsApi;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Payments API over HTTP
#[derive(Debug, Clone)]
pub struct HttpPaymentsApi {
    client: Client,
    root: String,
}

impl HttpPaymentsApi {
    /// Build a client from configuration
    pub fn new(config: &ClientConfig) -> PayResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                crate::core::error::ConfigError::InvalidValue {
                    field: "api_token".to_string(),
                    value: "<redacted>".to_string(),
                    message: e.to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| PayError::Transport {
            message: e.to_string(),
        })?;

        Ok(Self::with_client(client, config.api_root()))
    }

    /// Wrap an existing `reqwest::Client`
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            root: format!("{}/payments", base_url.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.root.clone()
        } else {
            format!("{}/{}", self.root, path)
        }
    }

    async fn send(&self, request: RequestBuilder) -> PayResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(PayError::Api {
            status,
            message: error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            }),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> PayResult<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| PayError::Decode {
            context: context.to_string(),
            message: e.to_string(),
        })
    }
}

/// Extract a message from a JSON error body (`detail`, `message` or `error`)
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message", "error"].iter().find_map(|key| {
        value.get(*key).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    })
}

#[async_trait]
impl PaymentsApi for HttpPaymentsApi {
    async fn list(&self, filters: &PaymentFilters) -> PayResult<PaymentPage> {
        tracing::debug!(page = filters.page(), size = filters.size(), "GET /payments");
        let request = self
            .client
            .get(self.url(""))
            .query(&filters.to_query_pairs());
        self.send_json(request, "payment page").await
    }

    async fn create(&self, payment: &NewPayment) -> PayResult<PaymentRecord> {
        tracing::debug!(reference = %payment.reference, "POST /payments");
        let request = self.client.post(self.url("")).json(payment);
        self.send_json(request, "created payment").await
    }

    async fn transition(&self, id: &PaymentId, transition: Transition) -> PayResult<()> {
        let request = match transition.path_segment() {
            Some(segment) => self
                .client
                .post(self.url(&format!("{}/{}", id, segment))),
            None => self.client.delete(self.url(id.as_str())),
        };
        tracing::debug!(payment_id = %id, %transition, "single-payment transition");
        self.send(request).await?;
        Ok(())
    }

    async fn bulk(
        &self,
        operation: BulkOperation,
        request: &BulkRequest,
    ) -> PayResult<BulkOperationResult> {
        tracing::debug!(
            %operation,
            count = request.payment_ids.len(),
            "POST /payments/bulk/{}",
            operation.path_segment()
        );
        let builder = self
            .client
            .post(self.url(&format!("bulk/{}", operation.path_segment())))
            .json(request);
        self.send_json(builder, "bulk operation result").await
    }

    async fn validate_bulk(&self, ids: &[PaymentId]) -> PayResult<ValidationReport> {
        tracing::debug!(count = ids.len(), "POST /payments/bulk/validate");
        let body = ValidateRequest {
            payment_ids: ids.to_vec(),
        };
        let builder = self.client.post(self.url("bulk/validate")).json(&body);
        self.send_json(builder, "validation report").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let api = HttpPaymentsApi::with_client(Client::new(), "https://erp.test/api/");
        assert_eq!(api.url(""), "https://erp.test/api/payments");
        assert_eq!(
            api.url("bulk/reset-to-draft"),
            "https://erp.test/api/payments/bulk/reset-to-draft"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"detail": "Payment is posted"}"#).as_deref(),
            Some("Payment is posted")
        );
        assert_eq!(
            error_message(r#"{"error": {"code": 7}}"#).as_deref(),
            Some(r#"{"code":7}"#)
        );
        assert_eq!(error_message("<html>oops</html>"), None);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ClientConfig {
            base_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(HttpPaymentsApi::new(&config).is_err());
    }
}
