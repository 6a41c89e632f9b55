//! Protobuf messages of the calendar, mail and contacts gRPC services.
//!
//! Field tags follow declaration order of each message. Conversions to and
//! from the transport-neutral bodies in [`crate::types`] live here so the
//! gRPC client only ever handles domain types at its edges.

use cb_domain::credentials::CredentialSet;

use crate::types;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Envelopes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, PartialEq, prost::Message)]
pub struct OAuthTokens {
    #[prost(string, tag = "1")]
    pub access_token: String,
    #[prost(string, tag = "2")]
    pub refresh_token: String,
    #[prost(string, tag = "3")]
    pub token_type: String,
    #[prost(int64, tag = "4")]
    pub expiry_unix: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommonRequest {
    #[prost(message, optional, tag = "1")]
    pub auth_tokens: Option<OAuthTokens>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommonResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(string, tag = "2")]
    pub message: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Calendar
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, PartialEq, prost::Message)]
pub struct Event {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub summary: String,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(string, tag = "4")]
    pub start_time: String,
    #[prost(string, tag = "5")]
    pub end_time: String,
    #[prost(string, tag = "6")]
    pub html_link: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListEventsRequest {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonRequest>,
    #[prost(string, tag = "2")]
    pub calendar_id: String,
    #[prost(int32, tag = "3")]
    pub max_results: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListEventsResponse {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonResponse>,
    #[prost(message, repeated, tag = "2")]
    pub events: Vec<Event>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateEventRequest {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonRequest>,
    #[prost(string, tag = "2")]
    pub calendar_id: String,
    #[prost(string, tag = "3")]
    pub summary: String,
    #[prost(string, tag = "4")]
    pub description: String,
    #[prost(string, tag = "5")]
    pub start_time: String,
    #[prost(string, tag = "6")]
    pub end_time: String,
    #[prost(string, tag = "7")]
    pub time_zone: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateEventResponse {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonResponse>,
    #[prost(message, optional, tag = "2")]
    pub created_event: Option<Event>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mail
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, PartialEq, prost::Message)]
pub struct SendEmailRequest {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonRequest>,
    #[prost(string, tag = "2")]
    pub to: String,
    #[prost(string, tag = "3")]
    pub subject: String,
    #[prost(string, tag = "4")]
    pub body: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SendEmailResponse {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonResponse>,
    #[prost(string, tag = "2")]
    pub message_id: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Contacts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, PartialEq, prost::Message)]
pub struct Person {
    #[prost(string, tag = "1")]
    pub resource_name: String,
    #[prost(string, tag = "2")]
    pub display_name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub phone_number: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListConnectionsRequest {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonRequest>,
    #[prost(int32, tag = "2")]
    pub page_size: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListConnectionsResponse {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonResponse>,
    #[prost(message, repeated, tag = "2")]
    pub people: Vec<Person>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateContactRequest {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonRequest>,
    #[prost(string, tag = "2")]
    pub display_name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub phone_number: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateContactResponse {
    #[prost(message, optional, tag = "1")]
    pub common: Option<CommonResponse>,
    #[prost(message, optional, tag = "2")]
    pub created_contact: Option<Person>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl From<CredentialSet> for OAuthTokens {
    fn from(c: CredentialSet) -> Self {
        Self {
            access_token: c.access_token,
            refresh_token: c.refresh_token,
            token_type: c.token_type,
            expiry_unix: c.expiry_unix,
        }
    }
}

impl From<types::CommonRequest> for CommonRequest {
    fn from(c: types::CommonRequest) -> Self {
        Self {
            auth_tokens: Some(c.auth_tokens.into()),
        }
    }
}

/// A response without an envelope carries nothing to reject, so it reads
/// as neither `OK` nor `ERROR`.
fn common(c: Option<CommonResponse>) -> types::CommonResponse {
    let c = c.unwrap_or_default();
    types::CommonResponse {
        status: c.status,
        message: c.message,
    }
}

impl From<Event> for types::Event {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            summary: e.summary,
            description: e.description,
            start_time: e.start_time,
            end_time: e.end_time,
            html_link: e.html_link,
        }
    }
}

impl From<Person> for types::Person {
    fn from(p: Person) -> Self {
        Self {
            resource_name: p.resource_name,
            display_name: p.display_name,
            email: p.email,
            phone_number: p.phone_number,
        }
    }
}

impl From<types::ListEventsRequest> for ListEventsRequest {
    fn from(r: types::ListEventsRequest) -> Self {
        Self {
            common: Some(r.common.into()),
            calendar_id: r.calendar_id,
            max_results: r.max_results,
        }
    }
}

impl From<ListEventsResponse> for types::ListEventsResponse {
    fn from(r: ListEventsResponse) -> Self {
        Self {
            common: common(r.common),
            events: r.events.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<types::CreateEventRequest> for CreateEventRequest {
    fn from(r: types::CreateEventRequest) -> Self {
        Self {
            common: Some(r.common.into()),
            calendar_id: r.calendar_id,
            summary: r.summary,
            description: r.description,
            start_time: r.start_time,
            end_time: r.end_time,
            time_zone: r.time_zone,
        }
    }
}

impl From<CreateEventResponse> for types::CreateEventResponse {
    fn from(r: CreateEventResponse) -> Self {
        Self {
            common: common(r.common),
            created_event: r.created_event.map(Into::into),
        }
    }
}

impl From<types::SendEmailRequest> for SendEmailRequest {
    fn from(r: types::SendEmailRequest) -> Self {
        Self {
            common: Some(r.common.into()),
            to: r.to,
            subject: r.subject,
            body: r.body,
        }
    }
}

impl From<SendEmailResponse> for types::SendEmailResponse {
    fn from(r: SendEmailResponse) -> Self {
        Self {
            common: common(r.common),
            message_id: r.message_id,
        }
    }
}

impl From<types::ListConnectionsRequest> for ListConnectionsRequest {
    fn from(r: types::ListConnectionsRequest) -> Self {
        Self {
            common: Some(r.common.into()),
            page_size: r.page_size,
        }
    }
}

impl From<ListConnectionsResponse> for types::ListConnectionsResponse {
    fn from(r: ListConnectionsResponse) -> Self {
        Self {
            common: common(r.common),
            people: r.people.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<types::CreateContactRequest> for CreateContactRequest {
    fn from(r: types::CreateContactRequest) -> Self {
        Self {
            common: Some(r.common.into()),
            display_name: r.display_name,
            email: r.email,
            phone_number: r.phone_number,
        }
    }
}

impl From<CreateContactResponse> for types::CreateContactResponse {
    fn from(r: CreateContactResponse) -> Self {
        Self {
            common: common(r.common),
            created_contact: r.created_contact.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn credentials_ride_in_the_common_envelope() {
        let req: SendEmailRequest = types::SendEmailRequest {
            common: types::CommonRequest::new(&CredentialSet {
                access_token: "ya29.a".into(),
                refresh_token: "1//r".into(),
                token_type: "Bearer".into(),
                expiry_unix: 1_716_400_800,
            }),
            to: "a@b.c".into(),
            subject: "s".into(),
            body: "b".into(),
        }
        .into();

        let tokens = req.common.as_ref().and_then(|c| c.auth_tokens.as_ref()).unwrap();
        assert_eq!(tokens.access_token, "ya29.a");
        assert_eq!(tokens.expiry_unix, 1_716_400_800);

        // Field 1 (common) is a length-delimited submessage: tag byte 0x0a.
        let bytes = req.encode_to_vec();
        assert_eq!(bytes[0], 0x0a);
    }

    #[test]
    fn missing_envelope_is_not_an_error() {
        let resp: types::CreateContactResponse = CreateContactResponse {
            common: None,
            created_contact: Some(Person {
                resource_name: "people/c1".into(),
                display_name: "Joe Doe".into(),
                ..Default::default()
            }),
        }
        .into();
        assert!(!resp.common.is_error());
        assert_eq!(resp.created_contact.unwrap().display_name, "Joe Doe");
    }

    #[test]
    fn error_status_survives_conversion() {
        let resp: types::ListEventsResponse = ListEventsResponse {
            common: Some(CommonResponse {
                status: types::STATUS_ERROR.into(),
                message: "calendar not found".into(),
            }),
            events: vec![],
        }
        .into();
        assert!(resp.common.is_error());
        assert_eq!(resp.common.message, "calendar not found");
    }
}
