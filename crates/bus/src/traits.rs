use async_trait::async_trait;
use tokio::sync::mpsc;

use cb_domain::error::Result;

/// One message delivered on a subject.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Publish/subscribe transport.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish `payload` to every current subscriber of `subject`.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()>;

    /// Subscribe to `subject`. Dropping the returned handle unsubscribes.
    async fn subscribe(&self, subject: &str) -> Result<Subscription>;

    /// Remove a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Number of live subscriptions on `subject`.
    fn subscription_count(&self, subject: &str) -> usize;

    /// Stop accepting traffic. Existing subscriptions see end-of-stream and
    /// later publishes fail with `Error::Bus`.
    async fn close(&self);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Subscription handle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type Release = Box<dyn FnOnce(SubscriptionId) + Send + Sync>;

/// A live subscription. Unsubscribes from the bus when dropped.
pub struct Subscription {
    id: SubscriptionId,
    subject: String,
    rx: mpsc::Receiver<BusMessage>,
    release: Option<Release>,
}

impl Subscription {
    /// Used by bus implementations. `release` runs exactly once, on drop.
    pub fn new(
        id: SubscriptionId,
        subject: impl Into<String>,
        rx: mpsc::Receiver<BusMessage>,
        release: impl FnOnce(SubscriptionId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            rx,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Next message, or `None` once the bus has shut down.
    pub async fn next(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("subject", &self.subject)
            .finish()
    }
}
