// Live supplier client: the reqwest-backed implementation of the wire
// contract in `supplier`.
//
// Endpoint layout, shared by both providers:
//   POST {base}/oauth/token          credential or refresh-token exchange
//   POST {base}/{flow}/initiate      start a job, returns the job id
//   GET  {base}/{flow}/poll/{id}     pending marker or terminal payload
//
// Every call carries the per-call timeout from settings; the overall polling
// window is the orchestrator's concern.

use crate::config::{Credentials, SupplierSettings};
use crate::error::SupplierCallError;
use crate::supplier::{Flow, InitiateReply, PollReply, Supplier, SupplierApi, TokenGrant};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::debug;

pub struct HttpSupplierApi {
    supplier: Supplier,
    base_url: String,
    credentials: Credentials,
    timeout_ms: u64,
    client: reqwest::Client,
}

impl HttpSupplierApi {
    pub fn new(
        supplier: Supplier,
        settings: &SupplierSettings,
        credentials: Credentials,
    ) -> Result<Self, SupplierCallError> {
        let client = reqwest::Client::builder()
            .timeout(settings.call_timeout)
            .build()
            .map_err(|e| SupplierCallError::Network(e.to_string()))?;
        Ok(Self {
            supplier,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            credentials,
            timeout_ms: settings.call_timeout.as_millis() as u64,
            client,
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> SupplierCallError {
        if err.is_timeout() {
            SupplierCallError::Timeout(self.timeout_ms)
        } else {
            SupplierCallError::Network(err.to_string())
        }
    }

    async fn checked(&self, response: Response) -> Result<Response, SupplierCallError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(SupplierCallError::RateLimited { retry_after });
        }

        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SupplierCallError::AuthRejected(message));
        }
        Err(SupplierCallError::UnexpectedResponse {
            status: status.as_u16(),
            message,
        })
    }

    async fn token_exchange(
        &self,
        form: &[(&str, &str)],
    ) -> Result<TokenGrant, SupplierCallError> {
        let response = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .form(form)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let response = self.checked(response).await?;
        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| self.map_transport(e))
    }
}

#[async_trait]
impl SupplierApi for HttpSupplierApi {
    async fn login(&self) -> Result<TokenGrant, SupplierCallError> {
        debug!(supplier = %self.supplier, "credential exchange");
        self.token_exchange(&[
            ("grant_type", "client_credentials"),
            ("client_id", &self.credentials.client_id),
            ("client_secret", &self.credentials.client_secret),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, SupplierCallError> {
        debug!(supplier = %self.supplier, "refresh-token exchange");
        self.token_exchange(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn initiate(
        &self,
        flow: Flow,
        bearer: &str,
        criteria: &Value,
    ) -> Result<InitiateReply, SupplierCallError> {
        let response = self
            .client
            .post(format!(
                "{}/{}/initiate",
                self.base_url,
                flow.path_segment()
            ))
            .bearer_auth(bearer)
            .json(criteria)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let response = self.checked(response).await?;
        response
            .json::<InitiateReply>()
            .await
            .map_err(|e| self.map_transport(e))
    }

    async fn poll(
        &self,
        flow: Flow,
        bearer: &str,
        job_id: &str,
    ) -> Result<PollReply, SupplierCallError> {
        let response = self
            .client
            .get(format!(
                "{}/{}/poll/{}",
                self.base_url,
                flow.path_segment(),
                job_id
            ))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let response = self.checked(response).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| self.map_transport(e))?;
        Ok(classify_poll_body(body))
    }
}

/// The polling endpoint answers with either a pending marker or the terminal
/// payload itself; anything without a PENDING status is the result.
fn classify_poll_body(body: Value) -> PollReply {
    match body.get("status").and_then(Value::as_str) {
        Some("PENDING") => PollReply::Pending,
        _ => PollReply::Complete(body),
    }
}
