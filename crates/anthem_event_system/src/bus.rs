//! Typed event bus.
//!
//! Handlers are registered under namespaced string keys (`core:<name>` or
//! `plugin:<plugin>:<name>`) and receive a strongly typed payload that is
//! serialized through serde at the boundary, matching how the host moves
//! events between isolation domains.

use serde::{de::DeserializeOwned, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

pub trait Event: Send + Sync + Any + std::fmt::Debug {
    fn type_name() -> &'static str
    where
        Self: Sized;
    fn serialize(&self) -> Result<Vec<u8>, EventError>;
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(EventError::Serialization)
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(EventError::Deserialization)
    }
}

trait EventHandler: Send + Sync {
    fn handle(&self, data: &[u8]) -> Result<(), EventError>;
    fn expected_type_id(&self) -> TypeId;
    fn handler_name(&self) -> &str;
}

struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<fn(T)>,
}

impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        let event = T::deserialize(data)?;
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default, Clone)]
pub struct EventSystemStats {
    pub total_handlers: usize,
    pub events_emitted: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
    #[error("handler execution error: {0}")]
    HandlerExecution(String),
}

pub struct EventSystem {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    stats: RwLock<EventSystemStats>,
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            stats: RwLock::new(EventSystemStats::default()),
        }
    }

    /// Register a handler for a core server event.
    pub async fn on_core<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("core:{event_name}");
        self.register_typed_handler(event_key, handler).await
    }

    /// Register a handler for an event another plugin emits.
    pub async fn on_plugin<T, F>(
        &self,
        plugin_name: &str,
        event_name: &str,
        handler: F,
    ) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("plugin:{plugin_name}:{event_name}");
        self.register_typed_handler(event_key, handler).await
    }

    async fn register_typed_handler<T, F>(
        &self,
        event_key: String,
        handler: F,
    ) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler_name = format!("{}::{}", event_key, T::type_name());
        let typed = TypedEventHandler {
            handler,
            name: handler_name,
            _phantom: std::marker::PhantomData,
        };
        let handler_arc: Arc<dyn EventHandler> = Arc::new(typed);

        let mut handlers = self.handlers.write().await;
        handlers.entry(event_key.clone()).or_default().push(handler_arc);

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        debug!("registered handler for {event_key}");
        Ok(())
    }

    /// Emit a core event to every registered handler.
    pub async fn emit_core<T>(&self, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("core:{event_name}");
        self.emit_event(&event_key, event).await
    }

    /// Emit a plugin event to every registered handler.
    pub async fn emit_plugin<T>(
        &self,
        plugin_name: &str,
        event_name: &str,
        event: &T,
    ) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("plugin:{plugin_name}:{event_name}");
        self.emit_event(&event_key, event).await
    }

    async fn emit_event<T>(&self, event_key: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let data = event.serialize()?;
        let handlers = self.handlers.read().await;

        if let Some(event_handlers) = handlers.get(event_key) {
            debug!("emitting {event_key} to {} handlers", event_handlers.len());
            for handler in event_handlers {
                if let Err(e) = handler.handle(&data) {
                    error!("handler {} failed: {e}", handler.handler_name());
                }
            }
            let mut stats = self.stats.write().await;
            stats.events_emitted += 1;
        } else {
            trace!("no handlers for event: {event_key}");
        }

        Ok(())
    }

    pub async fn get_stats(&self) -> EventSystemStats {
        self.stats.read().await.clone()
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_event_system() -> Arc<EventSystem> {
    Arc::new(EventSystem::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Serialize, Deserialize)]
    struct TestEvent {
        message: String,
    }

    #[tokio::test]
    async fn core_events_reach_their_handlers() {
        let events = create_event_system();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = Arc::clone(&seen);
        events
            .on_core("round_mvp", move |event: TestEvent| {
                assert_eq!(event.message, "crowned");
                seen_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        events
            .emit_core("round_mvp", &TestEvent { message: "crowned".into() })
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        let stats = events.get_stats().await;
        assert_eq!(stats.total_handlers, 1);
        assert_eq!(stats.events_emitted, 1);
    }

    #[tokio::test]
    async fn plugin_namespace_is_isolated_from_core() {
        let events = create_event_system();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = Arc::clone(&seen);
        events
            .on_plugin("mvp_anthem", "anthem_played", move |_: TestEvent| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        // Same event name in the core namespace must not trip the handler.
        events
            .emit_core("anthem_played", &TestEvent { message: "x".into() })
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        events
            .emit_plugin("mvp_anthem", "anthem_played", &TestEvent { message: "x".into() })
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn emitting_without_handlers_is_not_an_error() {
        let events = create_event_system();
        events
            .emit_core("server_tick", &TestEvent { message: "tick".into() })
            .await
            .unwrap();
    }
}
