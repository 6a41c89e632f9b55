//! gRPC implementation of [`ExternalOperations`].
//!
//! Talks to the `CalendarService`, `GmailService` and `ContactsService`
//! declared in the configured protobuf package, over one shared lazily
//! connected channel. Every call is a single unary attempt bounded by the
//! configured timeout. No retries.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

use cb_domain::config::OperationsConfig;
use cb_domain::error::{Error, Result};

use crate::traits::ExternalOperations;
use crate::types::{
    CreateContactRequest, CreateContactResponse, CreateEventRequest, CreateEventResponse,
    ListConnectionsRequest, ListConnectionsResponse, ListEventsRequest, ListEventsResponse,
    SendEmailRequest, SendEmailResponse,
};
use crate::wire;

pub const CALENDAR_SERVICE: &str = "CalendarService";
pub const GMAIL_SERVICE: &str = "GmailService";
pub const CONTACTS_SERVICE: &str = "ContactsService";

#[derive(Debug, Clone)]
pub struct GrpcOperations {
    channel: Channel,
    package: String,
    timeout: Duration,
}

impl GrpcOperations {
    /// Must be called inside a tokio runtime. No connection is attempted
    /// until the first call.
    pub fn new(cfg: &OperationsConfig) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.timeout_secs);
        let endpoint = Endpoint::from_shared(cfg.base_url.trim().to_owned())
            .map_err(|e| Error::Config(format!("operations.base_url: {e}")))?
            .connect_timeout(timeout)
            .timeout(timeout);

        Ok(Self {
            channel: endpoint.connect_lazy(),
            package: cfg.proto_package.trim().to_owned(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn path(&self, service: &str, method: &str) -> Result<PathAndQuery> {
        PathAndQuery::try_from(format!("/{}.{service}/{method}", self.package))
            .map_err(|e| Error::Config(format!("invalid gRPC method path: {e}")))
    }

    async fn unary<Req, Resp>(&self, service: &str, method: &str, req: Req) -> Result<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let path = self.path(service, method)?;
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| Error::Http(format!("operations service not ready: {e}")))?;

        let start = Instant::now();
        let mut request = tonic::Request::new(req);
        request.set_timeout(self.timeout);
        let result = grpc.unary(request, path, ProstCodec::default()).await;

        tracing::debug!(
            service,
            method,
            ok = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "operations call"
        );

        result.map(tonic::Response::into_inner).map_err(from_status)
    }
}

fn from_status(status: tonic::Status) -> Error {
    match status.code() {
        tonic::Code::DeadlineExceeded => Error::Timeout(status.message().to_owned()),
        code => Error::Rpc {
            code: format!("{code:?}"),
            message: status.message().to_owned(),
        },
    }
}

#[async_trait]
impl ExternalOperations for GrpcOperations {
    async fn list_events(&self, req: ListEventsRequest) -> Result<ListEventsResponse> {
        let resp: wire::ListEventsResponse = self
            .unary(CALENDAR_SERVICE, "ListEvents", wire::ListEventsRequest::from(req))
            .await?;
        Ok(resp.into())
    }

    async fn create_event(&self, req: CreateEventRequest) -> Result<CreateEventResponse> {
        let resp: wire::CreateEventResponse = self
            .unary(CALENDAR_SERVICE, "CreateEvent", wire::CreateEventRequest::from(req))
            .await?;
        Ok(resp.into())
    }

    async fn send_email(&self, req: SendEmailRequest) -> Result<SendEmailResponse> {
        let resp: wire::SendEmailResponse = self
            .unary(GMAIL_SERVICE, "SendEmail", wire::SendEmailRequest::from(req))
            .await?;
        Ok(resp.into())
    }

    async fn list_connections(
        &self,
        req: ListConnectionsRequest,
    ) -> Result<ListConnectionsResponse> {
        let resp: wire::ListConnectionsResponse = self
            .unary(
                CONTACTS_SERVICE,
                "ListConnections",
                wire::ListConnectionsRequest::from(req),
            )
            .await?;
        Ok(resp.into())
    }

    async fn create_contact(&self, req: CreateContactRequest) -> Result<CreateContactResponse> {
        let resp: wire::CreateContactResponse = self
            .unary(CONTACTS_SERVICE, "CreateContact", wire::CreateContactRequest::from(req))
            .await?;
        Ok(resp.into())
    }
}
