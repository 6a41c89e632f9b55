//! Tool definitions exposed to the model and the dispatcher that runs them
//! against the operations service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};

use cb_domain::credentials::CredentialSet;
use cb_domain::tool::{ToolArgs, ToolDefinition, ToolInvocation, ToolOutcome, ToolResult};
use cb_domain::trace::TraceEvent;
use cb_operations::{
    CommonRequest, CommonResponse, CreateContactRequest, CreateEventRequest, ExternalOperations,
    ListConnectionsRequest, ListEventsRequest, SendEmailRequest,
};

pub const LIST_CALENDAR_EVENTS: &str = "list_calendar_events";
pub const CREATE_CALENDAR_EVENT: &str = "create_calendar_event";
pub const SEND_EMAIL: &str = "send_email";
pub const LIST_CONTACTS: &str = "list_contacts";
pub const CREATE_CONTACT: &str = "create_contact";

const DEFAULT_CALENDAR_ID: &str = "primary";
const DEFAULT_MAX_RESULTS: i64 = 10;
const DEFAULT_PAGE_SIZE: i64 = 10;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool definitions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The calendar, mail and contacts tools offered to the model on every turn.
pub fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: LIST_CALENDAR_EVENTS.into(),
            description: "List events from the user's Google Calendar.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "calendar_id": { "type": "string", "description": "The ID of the calendar to list events from (e.g., 'primary')." },
                    "max_results": { "type": "integer", "description": "Maximum number of events to return." }
                },
                "required": ["calendar_id", "max_results"]
            }),
        },
        ToolDefinition {
            name: CREATE_CALENDAR_EVENT.into(),
            description: "Create a new event in the user's Google Calendar.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "calendar_id": { "type": "string", "description": "The ID of the calendar to create the event in (e.g., 'primary')." },
                    "summary": { "type": "string", "description": "Summary or title of the event." },
                    "description": { "type": "string", "description": "Description of the event." },
                    "start_time": { "type": "string", "description": "Start time of the event in RFC3339 format (e.g., '2025-05-22T15:00:00Z')." },
                    "end_time": { "type": "string", "description": "End time of the event in RFC3339 format (e.g., '2025-05-22T16:00:00Z')." },
                    "time_zone": { "type": "string", "description": "Time zone of the event (e.g., 'America/Argentina/Buenos_Aires')." }
                },
                "required": ["calendar_id", "summary", "start_time", "end_time", "time_zone"]
            }),
        },
        ToolDefinition {
            name: SEND_EMAIL.into(),
            description: "Send an email on behalf of the user.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Recipient's email address." },
                    "subject": { "type": "string", "description": "Subject of the email." },
                    "body": { "type": "string", "description": "Body content of the email." }
                },
                "required": ["to", "subject", "body"]
            }),
        },
        ToolDefinition {
            name: LIST_CONTACTS.into(),
            description: "List connections (contacts) from the user's Google Contacts.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "page_size": { "type": "integer", "description": "Maximum number of contacts to return per page." }
                },
                "required": ["page_size"]
            }),
        },
        ToolDefinition {
            name: CREATE_CONTACT.into(),
            description: "Create a new contact in the user's Google Contacts.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "display_name": { "type": "string", "description": "Display name of the new contact." },
                    "email": { "type": "string", "description": "Email address of the new contact." },
                    "phone_number": { "type": "string", "description": "Phone number of the new contact." }
                },
                "required": ["display_name"]
            }),
        },
    ]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why a single tool call produced no payload. Every variant reaches the
/// model the same way: as a failure message.
enum DispatchError {
    /// The operations service could not be reached or answered garbage.
    Transport(String),
    /// The service ran the call and reported `ERROR`.
    Application(String),
}

type Outcome = Result<Map<String, Value>, DispatchError>;

/// Runs one tool invocation against the operations service.
///
/// A single attempt per call, bounded by `timeout`. Failures never escape:
/// they come back as a failed [`ToolResult`].
pub struct ToolDispatcher {
    operations: Arc<dyn ExternalOperations>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(operations: Arc<dyn ExternalOperations>, timeout: Duration) -> Self {
        Self {
            operations,
            timeout,
        }
    }

    pub async fn execute(
        &self,
        user_id: &str,
        credentials: &CredentialSet,
        invocation: &ToolInvocation,
    ) -> ToolResult {
        let start = Instant::now();
        let tool = invocation.name.as_str();

        let result = match tokio::time::timeout(
            self.timeout,
            self.dispatch(credentials, tool, &invocation.args),
        )
        .await
        {
            Ok(Some(Ok(payload))) => ToolResult::success(invocation, payload),
            Ok(Some(Err(DispatchError::Transport(e)))) => {
                ToolResult::failure(invocation, format!("{tool} RPC failed: {e}"))
            }
            Ok(Some(Err(DispatchError::Application(msg)))) => {
                ToolResult::failure(invocation, format!("{tool} MCP error: {msg}"))
            }
            Ok(None) => ToolResult::failure(invocation, format!("unknown tool: {tool}")),
            Err(_) => ToolResult::failure(
                invocation,
                format!("{tool} timed out after {}s", self.timeout.as_secs()),
            ),
        };

        if let ToolOutcome::Failure(ref msg) = result.outcome {
            tracing::warn!(user_id, tool, error = %msg, "tool call failed");
        }

        TraceEvent::ToolExecuted {
            user_id: user_id.to_owned(),
            tool_name: tool.to_owned(),
            duration_ms: start.elapsed().as_millis() as u64,
            is_error: result.is_error(),
        }
        .emit();

        result
    }

    /// `None` when the tool name is not one we know.
    async fn dispatch(
        &self,
        credentials: &CredentialSet,
        tool: &str,
        args: &ToolArgs,
    ) -> Option<Outcome> {
        let common = CommonRequest::new(credentials);
        let outcome = match tool {
            LIST_CALENDAR_EVENTS => self.list_calendar_events(common, args).await,
            CREATE_CALENDAR_EVENT => self.create_calendar_event(common, args).await,
            SEND_EMAIL => self.send_email(common, args).await,
            LIST_CONTACTS => self.list_contacts(common, args).await,
            CREATE_CONTACT => self.create_contact(common, args).await,
            _ => return None,
        };
        Some(outcome)
    }

    async fn list_calendar_events(&self, common: CommonRequest, args: &ToolArgs) -> Outcome {
        let req = ListEventsRequest {
            common,
            calendar_id: args.string_or("calendar_id", DEFAULT_CALENDAR_ID),
            max_results: clamp_i32(args.integer_or("max_results", DEFAULT_MAX_RESULTS)),
        };
        let resp = self.operations.list_events(req).await.map_err(transport)?;
        check(&resp.common)?;

        let events: Vec<Value> = resp
            .events
            .iter()
            .map(|e| {
                Value::String(format!(
                    "ID: {}, Summary: '{}', Start: {}",
                    e.id, e.summary, e.start_time
                ))
            })
            .collect();
        Ok(object(json!({ "events": events })))
    }

    async fn create_calendar_event(&self, common: CommonRequest, args: &ToolArgs) -> Outcome {
        let req = CreateEventRequest {
            common,
            calendar_id: args.string_or("calendar_id", ""),
            summary: args.string_or("summary", ""),
            description: args.string_or("description", ""),
            start_time: args.string_or("start_time", ""),
            end_time: args.string_or("end_time", ""),
            time_zone: args.string_or("time_zone", ""),
        };
        let resp = self.operations.create_event(req).await.map_err(transport)?;
        check(&resp.common)?;

        let event = resp.created_event.unwrap_or_default();
        Ok(object(json!({
            "event_id": event.id,
            "summary": event.summary,
            "link": event.html_link,
        })))
    }

    async fn send_email(&self, common: CommonRequest, args: &ToolArgs) -> Outcome {
        let req = SendEmailRequest {
            common,
            to: args.string_or("to", ""),
            subject: args.string_or("subject", ""),
            body: args.string_or("body", ""),
        };
        let resp = self.operations.send_email(req).await.map_err(transport)?;
        check(&resp.common)?;
        Ok(object(json!({ "message_id": resp.message_id })))
    }

    async fn list_contacts(&self, common: CommonRequest, args: &ToolArgs) -> Outcome {
        let req = ListConnectionsRequest {
            common,
            page_size: clamp_i32(args.integer_or("page_size", DEFAULT_PAGE_SIZE)),
        };
        let resp = self
            .operations
            .list_connections(req)
            .await
            .map_err(transport)?;
        check(&resp.common)?;

        let contacts: Vec<Value> = resp
            .people
            .iter()
            .map(|p| {
                Value::String(format!(
                    "Name: {}, Email: {}, Phone: {}",
                    p.display_name, p.email, p.phone_number
                ))
            })
            .collect();
        Ok(object(json!({ "contacts": contacts })))
    }

    async fn create_contact(&self, common: CommonRequest, args: &ToolArgs) -> Outcome {
        let req = CreateContactRequest {
            common,
            display_name: args.string_or("display_name", ""),
            email: args.string_or("email", ""),
            phone_number: args.string_or("phone_number", ""),
        };
        let resp = self.operations.create_contact(req).await.map_err(transport)?;
        check(&resp.common)?;

        let person = resp.created_contact.unwrap_or_default();
        Ok(object(json!({
            "contact_name": person.display_name,
            "contact_id": person.resource_name,
        })))
    }
}

fn transport(e: cb_domain::error::Error) -> DispatchError {
    DispatchError::Transport(e.to_string())
}

fn check(common: &CommonResponse) -> Result<(), DispatchError> {
    if common.is_error() {
        Err(DispatchError::Application(common.message.clone()))
    } else {
        Ok(())
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
