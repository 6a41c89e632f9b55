use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use cb_bus::{InProcessBus, MessageBus, Subscription, SubscriptionId};
use cb_domain::config::Config;
use cb_domain::credentials::CredentialSet;
use cb_domain::error::{Error, Result};
use cb_gateway::api;
use cb_gateway::bootstrap::{build_app_state, Backends};
use cb_gateway::state::AppState;
use cb_operations::*;
use cb_providers::{LlmProvider, ModelRequest, ModelResponse};
use cb_sessions::CredentialSource;

struct Unreachable;

#[async_trait]
impl LlmProvider for Unreachable {
    async fn generate(&self, _req: &ModelRequest) -> Result<ModelResponse> {
        Err(Error::Http("unreachable".into()))
    }
    fn provider_id(&self) -> &str {
        "unreachable"
    }
    fn default_model(&self) -> &str {
        "none"
    }
}

#[async_trait]
impl ExternalOperations for Unreachable {
    async fn list_events(&self, _req: ListEventsRequest) -> Result<ListEventsResponse> {
        Err(Error::Http("unreachable".into()))
    }
    async fn create_event(&self, _req: CreateEventRequest) -> Result<CreateEventResponse> {
        Err(Error::Http("unreachable".into()))
    }
    async fn send_email(&self, _req: SendEmailRequest) -> Result<SendEmailResponse> {
        Err(Error::Http("unreachable".into()))
    }
    async fn list_connections(&self, _req: ListConnectionsRequest) -> Result<ListConnectionsResponse> {
        Err(Error::Http("unreachable".into()))
    }
    async fn create_contact(&self, _req: CreateContactRequest) -> Result<CreateContactResponse> {
        Err(Error::Http("unreachable".into()))
    }
}

#[async_trait]
impl CredentialSource for Unreachable {
    async fn load(&self, _user_id: &str) -> Result<CredentialSet> {
        Err(Error::Auth("not authorized".into()))
    }
    fn name(&self) -> &str {
        "unreachable"
    }
}

/// Accepts the first `budget` publishes, then fails.
struct FailingAfter {
    inner: InProcessBus,
    budget: usize,
    published: AtomicUsize,
}

#[async_trait]
impl MessageBus for FailingAfter {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        if self.published.fetch_add(1, Ordering::SeqCst) >= self.budget {
            return Err(Error::Bus("connection lost".into()));
        }
        self.inner.publish(subject, payload).await
    }
    async fn subscribe(&self, subject: &str) -> Result<Subscription> {
        self.inner.subscribe(subject).await
    }
    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.unsubscribe(id)
    }
    fn subscription_count(&self, subject: &str) -> usize {
        self.inner.subscription_count(subject)
    }
    async fn close(&self) {
        self.inner.close()
    }
}

fn state(await_timeout_secs: u64) -> AppState {
    state_on(await_timeout_secs, Arc::new(InProcessBus::new(16)))
}

fn state_on(await_timeout_secs: u64, bus: Arc<dyn MessageBus>) -> AppState {
    let mut config = Config::default();
    config.bus.await_timeout_secs = await_timeout_secs;
    let backends = Backends {
        bus,
        llm: Arc::new(Unreachable),
        operations: Arc::new(Unreachable),
        credentials: Arc::new(Unreachable),
    };
    build_app_state(Arc::new(config), backends, CancellationToken::new()).unwrap()
}

async fn call(state: &AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = api::router()
        .with_state(state.clone())
        .oneshot(req)
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn webhook(body: &str) -> Request<Body> {
    Request::post("/whatsapp/webhook")
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

const ONE_MESSAGE: &str = r#"{"entry":[{"changes":[{"value":{"messages":[
    {"from":"5491100","type":"text","text":{"body":"hola"}}
]}}]}]}"#;

#[tokio::test]
async fn health_reports_session_count() {
    let state = state(1);
    state.sessions.get_or_create("u1");

    let (status, body) = call(&state, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], 1);
}

#[tokio::test]
async fn webhook_rejects_malformed_json() {
    let (status, body) = call(&state(1), webhook("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid payload");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn webhook_queues_text_messages() {
    let state = state(1);
    let mut inbound = state
        .bus
        .subscribe(state.correlator.inbound_subject())
        .await
        .unwrap();

    let (status, body) = call(&state, webhook(ONE_MESSAGE)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Message received and queued");
    assert_eq!(body["queued"], 1);

    let msg = inbound.next().await.unwrap();
    let env: cb_domain::envelope::InboundEnvelope = serde_json::from_slice(&msg.payload).unwrap();
    assert_eq!(env.user_id, "5491100");
    assert_eq!(env.text, "hola");
}

#[tokio::test]
async fn webhook_without_messages_is_acknowledged() {
    let (status, body) = call(&state(1), webhook(r#"{"entry":[]}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], 0);
}

#[tokio::test]
async fn webhook_reports_bus_failure() {
    let state = state(1);
    state.bus.close().await;

    let (status, body) = call(&state, webhook(ONE_MESSAGE)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Failed to queue message");
    assert_eq!(body["queued"], 0);
}

#[tokio::test]
async fn partial_queue_failure_reports_queued_count() {
    let state = state_on(
        1,
        Arc::new(FailingAfter {
            inner: InProcessBus::new(16),
            budget: 1,
            published: AtomicUsize::new(0),
        }),
    );
    let two_messages = r#"{"entry":[{"changes":[{"value":{"messages":[
        {"from":"5491100","text":{"body":"hola"}},
        {"from":"5491199","text":{"body":"agenda"}}
    ]}}]}]}"#;

    let (status, body) = call(&state, webhook(two_messages)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to queue message");
    assert_eq!(body["queued"], 1);
}

#[tokio::test]
async fn response_times_out_with_408() {
    let state = state(1);

    let (status, body) = call(
        &state,
        Request::get("/response/u1").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"], "response timeout");
}

#[tokio::test]
async fn response_returns_published_answer() {
    let state = state(5);

    let publisher = {
        let state = state.clone();
        tokio::spawn(async move {
            let subject = state.correlator.response_subject("u1");
            while state.bus.subscription_count(&subject) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            state.correlator.publish_outbound("u1", "Tu agenda está libre.").await.unwrap();
        })
    };

    let (status, body) = call(
        &state,
        Request::get("/response/u1").body(Body::empty()).unwrap(),
    )
    .await;
    publisher.await.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["response"], "Tu agenda está libre.");
}
