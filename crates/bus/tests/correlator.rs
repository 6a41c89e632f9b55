use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use cb_bus::{AwaitError, BusCorrelator, InProcessBus, MessageBus};
use cb_domain::config::BusConfig;
use cb_domain::envelope::InboundEnvelope;

fn setup() -> (InProcessBus, Arc<BusCorrelator>) {
    let bus = InProcessBus::new(16);
    let correlator = BusCorrelator::new(Arc::new(bus.clone()), &BusConfig::default());
    (bus, Arc::new(correlator))
}

/// Spawn a waiter and give it time to subscribe.
async fn spawn_waiter(
    correlator: &Arc<BusCorrelator>,
    user_id: &str,
    timeout: Duration,
) -> tokio::task::JoinHandle<Result<String, AwaitError>> {
    let c = Arc::clone(correlator);
    let user = user_id.to_owned();
    let handle = tokio::spawn(async move { c.await_outbound(&user, timeout).await });
    for _ in 0..100 {
        if correlator.bus().subscription_count(&correlator.response_subject(user_id)) > 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    handle
}

#[tokio::test]
async fn waiter_receives_published_answer() {
    let (_bus, correlator) = setup();
    let waiter = spawn_waiter(&correlator, "u1", Duration::from_secs(5)).await;

    correlator.publish_outbound("u1", "Tenés 2 eventos hoy.").await.unwrap();

    assert_eq!(waiter.await.unwrap().unwrap(), "Tenés 2 eventos hoy.");
    assert_eq!(correlator.bus().subscription_count("response.messages.u1"), 0);
}

#[tokio::test(start_paused = true)]
async fn timeout_tears_down_subscription() {
    let (bus, correlator) = setup();
    let err = correlator
        .await_outbound("u1", Duration::from_secs(15))
        .await
        .unwrap_err();

    assert!(matches!(err, AwaitError::Timeout { .. }));
    assert_eq!(bus.subscription_count("response.messages.u1"), 0);
}

#[tokio::test]
async fn answers_never_cross_users() {
    let (_bus, correlator) = setup();
    let a = spawn_waiter(&correlator, "alice", Duration::from_secs(5)).await;
    let b = spawn_waiter(&correlator, "bob", Duration::from_secs(5)).await;

    correlator.publish_outbound("bob", "for bob").await.unwrap();
    correlator.publish_outbound("alice", "for alice").await.unwrap();

    assert_eq!(a.await.unwrap().unwrap(), "for alice");
    assert_eq!(b.await.unwrap().unwrap(), "for bob");
}

#[tokio::test]
async fn cancelled_waiter_releases_subscription() {
    let (bus, correlator) = setup();
    let waiter = spawn_waiter(&correlator, "u1", Duration::from_secs(60)).await;
    assert_eq!(bus.subscription_count("response.messages.u1"), 1);

    waiter.abort();
    let _ = waiter.await;
    assert_eq!(bus.subscription_count("response.messages.u1"), 0);
}

#[tokio::test]
async fn undecodable_answer_is_reported_as_text() {
    let (bus, correlator) = setup();
    let waiter = spawn_waiter(&correlator, "u1", Duration::from_secs(5)).await;

    bus.publish("response.messages.u1", b"{not json".to_vec()).await.unwrap();

    assert_eq!(waiter.await.unwrap().unwrap(), "Error processing response.");
}

#[tokio::test]
async fn inbound_handler_sees_envelopes_and_skips_garbage() {
    let (bus, correlator) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = correlator
        .subscribe_inbound(move |env: InboundEnvelope| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(env);
            }
        })
        .await
        .unwrap();

    bus.publish("incoming.messages", b"garbage".to_vec()).await.unwrap();
    correlator
        .publish_inbound(&InboundEnvelope {
            user_id: "u1".into(),
            text: "hola".into(),
        })
        .await
        .unwrap();

    let env = rx.recv().await.unwrap();
    assert_eq!(env.user_id, "u1");
    assert_eq!(env.text, "hola");
}

#[tokio::test]
async fn dropping_inbound_subscription_stops_delivery() {
    let (bus, correlator) = setup();
    let sub = correlator.subscribe_inbound(|_env| async {}).await.unwrap();
    assert!(sub.is_active());
    drop(sub);

    for _ in 0..100 {
        if bus.subscription_count("incoming.messages") == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(bus.subscription_count("incoming.messages"), 0);
}

#[tokio::test]
async fn publish_inbound_on_closed_bus_fails() {
    let (bus, correlator) = setup();
    bus.close();
    let err = correlator
        .publish_inbound(&InboundEnvelope {
            user_id: "u1".into(),
            text: "hola".into(),
        })
        .await;
    assert!(err.is_err());
}
