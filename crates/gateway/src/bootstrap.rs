//! AppState construction and background-task spawning extracted from `main.rs`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use cb_bus::{BusCorrelator, InProcessBus, InboundSubscription, MessageBus, NatsBus};
use cb_domain::config::{BusConfig, Config, ConfigSeverity, OperationsTransport, ProviderKind};
use cb_operations::{ExternalOperations, GrpcOperations, HttpOperations};
use cb_providers::{GoogleProvider, LlmProvider};
use cb_sessions::{CredentialSource, SessionStore, TokenFileSource};

use crate::runtime::{
    build_tool_definitions, ModelSettings, SessionLockMap, ToolDispatcher, TurnDriver,
};
use crate::state::AppState;

/// How often idle per-user turn locks are dropped.
const LOCK_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// The external collaborators a gateway talks to.
pub struct Backends {
    pub bus: Arc<dyn MessageBus>,
    pub llm: Arc<dyn LlmProvider>,
    pub operations: Arc<dyn ExternalOperations>,
    pub credentials: Arc<dyn CredentialSource>,
}

impl Backends {
    /// Production backends: the configured bus, Gemini, the operations
    /// service and the shared token file.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let bus = connect_bus(&config.bus).await?;
        let llm: Arc<dyn LlmProvider> = match config.llm.provider {
            ProviderKind::Google => Arc::new(
                GoogleProvider::from_config(&config.llm)
                    .context("initializing Gemini provider")?,
            ),
        };
        let operations: Arc<dyn ExternalOperations> = match config.operations.transport {
            OperationsTransport::Grpc => Arc::new(
                GrpcOperations::new(&config.operations)
                    .context("initializing gRPC operations client")?,
            ),
            OperationsTransport::Http => Arc::new(
                HttpOperations::new(&config.operations)
                    .context("initializing HTTP operations client")?,
            ),
        };
        let credentials = Arc::new(TokenFileSource::new(config.credentials.token_file.clone()));

        tracing::info!(
            provider = %llm.provider_id(),
            model = %config.llm.model,
            operations = %config.operations.base_url,
            transport = ?config.operations.transport,
            token_file = %config.credentials.token_file.display(),
            "backends ready"
        );

        Ok(Self {
            bus,
            llm,
            operations,
            credentials,
        })
    }
}

/// NATS when `bus.url` is set, otherwise the in-process bus.
pub async fn connect_bus(config: &BusConfig) -> anyhow::Result<Arc<dyn MessageBus>> {
    match &config.url {
        Some(url) => {
            let bus = NatsBus::connect(url, config.channel_capacity)
                .await
                .context("connecting to the NATS server")?;
            Ok(Arc::new(bus))
        }
        None => {
            tracing::info!("bus.url not set, using the in-process bus");
            Ok(Arc::new(InProcessBus::new(config.channel_capacity)))
        }
    }
}

/// Validate config and return a fully-wired [`AppState`].
pub fn build_app_state(
    config: Arc<Config>,
    backends: Backends,
    shutdown: CancellationToken,
) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Bus ──────────────────────────────────────────────────────────
    let bus = backends.bus;
    let correlator = Arc::new(BusCorrelator::new(bus.clone(), &config.bus));

    // ── Sessions & turn driver ───────────────────────────────────────
    let sessions = Arc::new(SessionStore::new());
    let session_locks = Arc::new(SessionLockMap::new());

    let driver = Arc::new(TurnDriver {
        sessions: sessions.clone(),
        locks: session_locks.clone(),
        credentials: backends.credentials,
        llm: backends.llm,
        dispatcher: ToolDispatcher::new(
            backends.operations,
            Duration::from_secs(config.operations.timeout_secs),
        ),
        correlator: correlator.clone(),
        tools: build_tool_definitions(),
        settings: ModelSettings {
            model: Some(config.llm.model.clone()),
            temperature: Some(config.llm.temperature),
            timeout: Duration::from_secs(config.llm.timeout_secs),
        },
        messages: config.messages.clone(),
        shutdown: shutdown.clone(),
    });

    Ok(AppState {
        config,
        bus,
        correlator,
        sessions,
        session_locks,
        driver,
        shutdown,
    })
}

/// Subscribe the turn driver to the ingress subject. Each inbound envelope
/// runs on its own task. Dropping the handle stops consumption.
pub async fn start_turn_driver(state: &AppState) -> anyhow::Result<InboundSubscription> {
    let driver = state.driver.clone();
    let subscription = state
        .correlator
        .subscribe_inbound(move |envelope| {
            let driver = driver.clone();
            async move { driver.handle(envelope).await }
        })
        .await
        .context("subscribing to inbound subject")?;

    tracing::info!(subject = %state.correlator.inbound_subject(), "turn driver subscribed");
    Ok(subscription)
}

/// Spawn periodic housekeeping. Loops exit when `state.shutdown` fires.
pub fn spawn_background_tasks(state: &AppState) {
    let locks = state.session_locks.clone();
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LOCK_PRUNE_INTERVAL);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let before = locks.session_count();
                    locks.prune_idle();
                    tracing::debug!(before, after = locks.session_count(), "pruned idle turn locks");
                }
            }
        }
    });
}
