//! Request and response bodies of the operations service.

use serde::{Deserialize, Serialize};

use cb_domain::credentials::CredentialSet;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Envelopes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonRequest {
    pub auth_tokens: CredentialSet,
}

impl CommonRequest {
    pub fn new(credentials: &CredentialSet) -> Self {
        Self {
            auth_tokens: credentials.clone(),
        }
    }
}

pub const STATUS_OK: &str = "OK";
pub const STATUS_ERROR: &str = "ERROR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommonResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl CommonResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.into(),
            message: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Calendar
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub html_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEventsRequest {
    pub common: CommonRequest,
    pub calendar_id: String,
    pub max_results: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListEventsResponse {
    #[serde(default)]
    pub common: CommonResponse,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub common: CommonRequest,
    pub calendar_id: String,
    pub summary: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEventResponse {
    #[serde(default)]
    pub common: CommonResponse,
    #[serde(default)]
    pub created_event: Option<Event>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mail
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub common: CommonRequest,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendEmailResponse {
    #[serde(default)]
    pub common: CommonResponse,
    #[serde(default)]
    pub message_id: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Contacts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    pub resource_name: String,
    pub display_name: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConnectionsRequest {
    pub common: CommonRequest,
    pub page_size: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListConnectionsResponse {
    #[serde(default)]
    pub common: CommonResponse,
    #[serde(default)]
    pub people: Vec<Person>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContactRequest {
    pub common: CommonRequest,
    pub display_name: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateContactResponse {
    #[serde(default)]
    pub common: CommonResponse,
    #[serde(default)]
    pub created_contact: Option<Person>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_carries_auth_tokens() {
        let creds = CredentialSet {
            access_token: "ya29.a".into(),
            refresh_token: "1//r".into(),
            token_type: "Bearer".into(),
            expiry_unix: 1_716_400_800,
        };
        let req = SendEmailRequest {
            common: CommonRequest::new(&creds),
            to: "a@b.c".into(),
            subject: "s".into(),
            body: "b".into(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["common"]["auth_tokens"]["access_token"], "ya29.a");
        assert_eq!(v["common"]["auth_tokens"]["expiry_unix"], 1_716_400_800);
    }

    #[test]
    fn sparse_responses_fill_defaults() {
        let resp: ListEventsResponse = serde_json::from_value(json!({
            "common": { "status": "OK" },
            "events": [{ "id": "e1", "summary": "Standup" }]
        }))
        .unwrap();
        assert!(!resp.common.is_error());
        assert_eq!(resp.events[0].start_time, "");

        let resp: CreateContactResponse = serde_json::from_value(json!({
            "common": { "status": "ERROR", "message": "display_name is required" }
        }))
        .unwrap();
        assert!(resp.common.is_error());
        assert!(resp.created_contact.is_none());
    }
}
