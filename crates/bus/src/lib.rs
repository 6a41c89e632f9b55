//! Message-bus plumbing for chatbridge.
//!
//! [`MessageBus`] is the narrow publish/subscribe contract the gateway
//! depends on. [`InProcessBus`] implements it on tokio channels and
//! [`NatsBus`] on a NATS server.
//! [`BusCorrelator`] layers per-user response subjects and a bounded
//! "wait for this user's next answer" primitive on top.

pub mod correlator;
pub mod memory;
pub mod nats;
pub mod traits;

pub use correlator::{AwaitError, BusCorrelator, InboundSubscription};
pub use memory::InProcessBus;
pub use nats::NatsBus;
pub use traits::{BusMessage, MessageBus, Subscription, SubscriptionId};
