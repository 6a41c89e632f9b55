//! JSON-over-HTTP implementation of [`ExternalOperations`], for a JSON
//! gateway placed in front of the gRPC services.
//!
//! Every call is a single `POST {base_url}/v1/...` attempt bounded by the
//! configured timeout. No retries.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use cb_domain::config::OperationsConfig;
use cb_domain::error::{Error, Result};

use crate::traits::ExternalOperations;
use crate::types::{
    CreateContactRequest, CreateContactResponse, CreateEventRequest, CreateEventResponse,
    ListConnectionsRequest, ListConnectionsResponse, ListEventsRequest, ListEventsResponse,
    SendEmailRequest, SendEmailResponse,
};

pub const LIST_EVENTS_PATH: &str = "/v1/calendar/events:list";
pub const CREATE_EVENT_PATH: &str = "/v1/calendar/events:create";
pub const SEND_EMAIL_PATH: &str = "/v1/gmail/messages:send";
pub const LIST_CONNECTIONS_PATH: &str = "/v1/contacts/connections:list";
pub const CREATE_CONTACT_PATH: &str = "/v1/contacts:create";

#[derive(Debug, Clone)]
pub struct HttpOperations {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpOperations {
    pub fn new(cfg: &OperationsConfig) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.timeout_secs);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<Req, Resp>(&self, path: &str, req: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let start = Instant::now();
        let resp = self
            .http
            .post(self.url(path))
            .header("X-Trace-Id", Uuid::new_v4().to_string())
            .json(req)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let body = resp.text().await.map_err(from_reqwest)?;
        tracing::debug!(
            path,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "operations call"
        );

        if !status.is_success() {
            return Err(Error::Http(format!(
                "POST {path} returned {}: {body}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Http(format!("POST {path}: invalid response body: {e}")))
    }
}

fn from_reqwest(e: reqwest::Error) -> Error {
    let e = e.without_url();
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

#[async_trait]
impl ExternalOperations for HttpOperations {
    async fn list_events(&self, req: ListEventsRequest) -> Result<ListEventsResponse> {
        self.post(LIST_EVENTS_PATH, &req).await
    }

    async fn create_event(&self, req: CreateEventRequest) -> Result<CreateEventResponse> {
        self.post(CREATE_EVENT_PATH, &req).await
    }

    async fn send_email(&self, req: SendEmailRequest) -> Result<SendEmailResponse> {
        self.post(SEND_EMAIL_PATH, &req).await
    }

    async fn list_connections(
        &self,
        req: ListConnectionsRequest,
    ) -> Result<ListConnectionsResponse> {
        self.post(LIST_CONNECTIONS_PATH, &req).await
    }

    async fn create_contact(&self, req: CreateContactRequest) -> Result<CreateContactResponse> {
        self.post(CREATE_CONTACT_PATH, &req).await
    }
}
