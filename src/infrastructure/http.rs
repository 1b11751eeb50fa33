use crate::config::EngineConfig;
use crate::domain::ports::{CreateRequest, CreateResponse, PaymentGateway};
use crate::error::CreationError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Talks to the remote payment service over HTTP.
///
/// `POST {base}/payments` and `POST {base}/payouts`, JSON in and out. The
/// idempotency key travels as a header so a retried request for the same attempt
/// is recognised by the service.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(config: &EngineConfig) -> Result<Self, CreationError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CreationError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post(
        &self,
        path: &str,
        request: &CreateRequest,
    ) -> Result<CreateResponse, CreationError> {
        let mut builder = self
            .client
            .post(self.endpoint(path))
            .header(IDEMPOTENCY_HEADER, &request.idempotency_key)
            .json(request);
        if let Some(api_key) = &request.api_key {
            builder = builder.header(API_KEY_HEADER, api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CreationError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CreationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| CreationError::Transport(format!("invalid response body: {e}")))
    }
}

fn rejection(status: StatusCode, body: &str) -> CreationError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    CreationError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment(
        &self,
        request: &CreateRequest,
    ) -> Result<CreateResponse, CreationError> {
        tracing::debug!(endpoint = %self.endpoint("payments"), "POST create payment");
        self.post("payments", request).await
    }

    async fn create_payout(
        &self,
        request: &CreateRequest,
    ) -> Result<CreateResponse, CreationError> {
        tracing::debug!(endpoint = %self.endpoint("payouts"), "POST create payout");
        self.post("payouts", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base() {
        let gateway = HttpPaymentGateway::with_client(Client::new(), "https://api.adeypay.com/v1/");
        assert_eq!(
            gateway.endpoint("payments"),
            "https://api.adeypay.com/v1/payments"
        );
    }

    #[test]
    fn test_rejection_uses_error_body() {
        let err = rejection(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message": "amount too low"}"#);
        assert_eq!(
            err,
            CreationError::Rejected {
                status: 422,
                message: "amount too low".to_string()
            }
        );

        let err = rejection(StatusCode::BAD_REQUEST, r#"{"error": "bad email"}"#);
        assert_eq!(
            err,
            CreationError::Rejected {
                status: 400,
                message: "bad email".to_string()
            }
        );
    }

    #[test]
    fn test_rejection_falls_back_to_reason() {
        let err = rejection(StatusCode::BAD_GATEWAY, "<html>upstream down</html>");
        assert_eq!(
            err,
            CreationError::Rejected {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let gateway = HttpPaymentGateway::with_client(Client::new(), "http://127.0.0.1:1");
        let request = CreateRequest {
            amount: crate::domain::amount::Amount::new(rust_decimal_macros::dec!(10)).unwrap(),
            recipient: "a@b.com".to_string(),
            note: None,
            api_key: None,
            idempotency_key: "k".to_string(),
        };
        assert!(matches!(
            gateway.create_payout(&request).await,
            Err(CreationError::Transport(_))
        ));
    }
}
