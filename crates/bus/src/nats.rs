//! [`MessageBus`] over a NATS server.
//!
//! Each [`Subscription`] is backed by one NATS subscription and a forwarder
//! task that copies messages into the handle's bounded queue. Releasing the
//! handle cancels the forwarder, which unsubscribes upstream. Delivery
//! across processes is whatever the NATS server provides: at most once, in
//! publish order per subject.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use cb_domain::error::{Error, Result};

use crate::traits::{BusMessage, MessageBus, Subscription, SubscriptionId};

struct LocalSubscription {
    subject: String,
    cancel: CancellationToken,
}

struct Inner {
    client: async_nats::Client,
    local: Mutex<HashMap<SubscriptionId, LocalSubscription>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    capacity: usize,
    shutdown: CancellationToken,
}

impl Inner {
    fn remove(&self, id: SubscriptionId) {
        if let Some(sub) = self.local.lock().remove(&id) {
            sub.cancel.cancel();
        }
    }
}

#[derive(Clone)]
pub struct NatsBus {
    inner: Arc<Inner>,
}

impl NatsBus {
    /// Connect to `url`. `capacity` bounds each subscriber's local queue.
    pub async fn connect(url: &str, capacity: usize) -> Result<Self> {
        let client = async_nats::ConnectOptions::new()
            .name("chatbridge")
            .connect(url)
            .await
            .map_err(|e| Error::Bus(format!("connect: {e}")))?;

        tracing::info!("connected to NATS");
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                local: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                capacity: capacity.max(1),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Bus("bus unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        self.inner
            .client
            .publish(subject.to_owned(), payload.into())
            .await
            .map_err(|e| Error::Bus(format!("publish {subject}: {e}")))
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription> {
        self.ensure_open()?;

        let mut upstream = self
            .inner
            .client
            .subscribe(subject.to_owned())
            .await
            .map_err(|e| Error::Bus(format!("subscribe {subject}: {e}")))?;

        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = self.inner.shutdown.child_token();
        self.inner.local.lock().insert(
            id,
            LocalSubscription {
                subject: subject.to_owned(),
                cancel: cancel.clone(),
            },
        );

        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task_weak = weak.clone();
        let task_subject = subject.to_owned();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    msg = upstream.next() => {
                        let Some(msg) = msg else { break };
                        let msg = BusMessage {
                            subject: msg.subject.to_string(),
                            payload: msg.payload.to_vec(),
                        };
                        match tx.try_send(msg) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                tracing::warn!(
                                    subject = %task_subject,
                                    id = id.0,
                                    "slow subscriber, message dropped"
                                );
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }
            if let Err(e) = upstream.unsubscribe().await {
                tracing::debug!(subject = %task_subject, error = %e, "NATS unsubscribe failed");
            }
            if let Some(inner) = task_weak.upgrade() {
                inner.local.lock().remove(&id);
            }
        });

        Ok(Subscription::new(id, subject, rx, move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        }))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.remove(id);
    }

    /// Counts subscriptions held by this process only.
    fn subscription_count(&self, subject: &str) -> usize {
        self.inner
            .local
            .lock()
            .values()
            .filter(|s| s.subject == subject && !s.cancel.is_cancelled())
            .count()
    }

    async fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.shutdown.cancel();
        self.inner.local.lock().clear();
        if let Err(e) = self.inner.client.flush().await {
            tracing::warn!(error = %e, "NATS flush on close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_server_is_bus_error() {
        // Port 1 refuses connections on loopback.
        let err = NatsBus::connect("nats://127.0.0.1:1", 8).await.err().unwrap();
        assert!(matches!(err, Error::Bus(_)));
    }
}
