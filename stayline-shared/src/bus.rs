//! In-process publish/subscribe router for domain events.
//!
//! Synchronous subscribers run on the publisher's task in registration order
//! and the first failure stops the chain and is returned to the publisher.
//! Asynchronous subscribers are spawned one task each, bounded by a timeout,
//! and their outcome is only ever logged.
//!
//! There is no persistence and no replay. Ordering holds only among the
//! subscribers of one event type within one `publish` call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::context::RequestContext;

pub const DEFAULT_ASYNC_TIMEOUT: Duration = Duration::from_secs(30);

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A payload that can travel on the bus. The type tag selects subscribers.
pub trait BusEvent: Clone + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;
}

/// Immutable, stamped wrapper around a published payload.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope<E> {
    pub id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub payload: E,
}

#[async_trait]
pub trait EventHandler<E: BusEvent>: Send + Sync {
    /// Name used in logs and publish errors.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &EventEnvelope<E>) -> Result<(), HandlerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("handler {handler} failed on {event_type}: {source}")]
    HandlerFailed {
        event_type: &'static str,
        handler: &'static str,
        #[source]
        source: HandlerError,
    },
}

type HandlerList<E> = Vec<Arc<dyn EventHandler<E>>>;

struct Registry<E: BusEvent> {
    sync_handlers: HashMap<&'static str, HandlerList<E>>,
    async_handlers: HashMap<&'static str, HandlerList<E>>,
}

impl<E: BusEvent> Default for Registry<E> {
    fn default() -> Self {
        Self {
            sync_handlers: HashMap::new(),
            async_handlers: HashMap::new(),
        }
    }
}

pub struct EventBus<E: BusEvent> {
    // Written at start-up, read on every publish.
    registry: RwLock<Registry<E>>,
    async_timeout: Duration,
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::with_async_timeout(DEFAULT_ASYNC_TIMEOUT)
    }

    pub fn with_async_timeout(async_timeout: Duration) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            async_timeout,
        }
    }

    /// Register a handler that runs inline with `publish`, in registration order.
    pub async fn subscribe(&self, event_type: &'static str, handler: Arc<dyn EventHandler<E>>) {
        debug!("Subscribing {} (sync) to {}", handler.name(), event_type);
        let mut registry = self.registry.write().await;
        registry.sync_handlers.entry(event_type).or_default().push(handler);
    }

    /// Register a fire-and-forget handler, dispatched on its own task.
    pub async fn subscribe_async(&self, event_type: &'static str, handler: Arc<dyn EventHandler<E>>) {
        debug!("Subscribing {} (async) to {}", handler.name(), event_type);
        let mut registry = self.registry.write().await;
        registry.async_handlers.entry(event_type).or_default().push(handler);
    }

    pub async fn subscriber_count(&self, event_type: &str) -> usize {
        let registry = self.registry.read().await;
        registry.sync_handlers.get(event_type).map_or(0, Vec::len)
            + registry.async_handlers.get(event_type).map_or(0, Vec::len)
    }

    /// Stamp `payload` and deliver it. Returns the generated event ID.
    ///
    /// Async subscribers are dispatched before the synchronous chain runs, so a
    /// failing synchronous handler never withholds the event from them.
    pub async fn publish(&self, ctx: &RequestContext, payload: E) -> Result<Uuid, PublishError> {
        let event_type = payload.event_type();
        let envelope = Arc::new(EventEnvelope {
            id: Uuid::new_v4(),
            event_type,
            occurred_at: Utc::now(),
            correlation_id: ctx.correlation_id().map(str::to_owned),
            payload,
        });

        // Snapshot the handler lists so no lock is held across handler awaits.
        let (sync_handlers, async_handlers) = {
            let registry = self.registry.read().await;
            (
                registry.sync_handlers.get(event_type).cloned().unwrap_or_default(),
                registry.async_handlers.get(event_type).cloned().unwrap_or_default(),
            )
        };

        if sync_handlers.is_empty() && async_handlers.is_empty() {
            debug!("No subscribers for {} ({})", event_type, envelope.id);
        }

        for handler in async_handlers {
            self.dispatch_async(handler, Arc::clone(&envelope));
        }

        for handler in sync_handlers {
            if let Err(source) = handler.handle(&envelope).await {
                warn!(
                    "Sync handler {} failed on {} ({}), remaining sync handlers skipped",
                    handler.name(),
                    event_type,
                    envelope.id
                );
                return Err(PublishError::HandlerFailed {
                    event_type,
                    handler: handler.name(),
                    source,
                });
            }
        }

        Ok(envelope.id)
    }

    fn dispatch_async(&self, handler: Arc<dyn EventHandler<E>>, envelope: Arc<EventEnvelope<E>>) {
        let timeout = self.async_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, handler.handle(&envelope)).await {
                Ok(Ok(())) => debug!("Async handler {} done for {}", handler.name(), envelope.id),
                Ok(Err(e)) => error!(
                    "Async handler {} failed on {} ({}): {}",
                    handler.name(),
                    envelope.event_type,
                    envelope.id,
                    e
                ),
                Err(_) => error!(
                    "Async handler {} timed out after {:?} on {} ({})",
                    handler.name(),
                    timeout,
                    envelope.event_type,
                    envelope.id
                ),
            }
        });
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
