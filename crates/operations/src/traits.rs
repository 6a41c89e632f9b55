use async_trait::async_trait;

use cb_domain::error::Result;

use crate::types::{
    CreateContactRequest, CreateContactResponse, CreateEventRequest, CreateEventResponse,
    ListConnectionsRequest, ListConnectionsResponse, ListEventsRequest, ListEventsResponse,
    SendEmailRequest, SendEmailResponse,
};

/// The operations service.
///
/// `Err` means the service could not be reached or answered garbage. A
/// service that ran the call but refused it answers `Ok` with
/// `common.status == "ERROR"`.
#[async_trait]
pub trait ExternalOperations: Send + Sync {
    async fn list_events(&self, req: ListEventsRequest) -> Result<ListEventsResponse>;

    async fn create_event(&self, req: CreateEventRequest) -> Result<CreateEventResponse>;

    async fn send_email(&self, req: SendEmailRequest) -> Result<SendEmailResponse>;

    async fn list_connections(&self, req: ListConnectionsRequest)
        -> Result<ListConnectionsResponse>;

    async fn create_contact(&self, req: CreateContactRequest) -> Result<CreateContactResponse>;
}
