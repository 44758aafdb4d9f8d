//! Event routing from a key to a single async handler.
//!
//! A registry holds at most one handler per key. The first registration for a
//! key wins; later registrations are refused and logged.
//!
//! ```
//! use slashkit::emitter::EventRegistry;
//!
//! # tokio_test::block_on(async {
//! let registry: EventRegistry<u32, u32> = EventRegistry::new("arith");
//! registry.on("double", |n: u32| async move { Ok::<_, slashkit::Error>(n * 2) });
//! assert_eq!(registry.emit("double", 21).await.unwrap(), Some(42));
//! assert_eq!(registry.emit("triple", 21).await.unwrap(), None);
//! # });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};

use crate::error::Result;

////////////////////////////////////////////// Handler /////////////////////////////////////////////

/// An async handler invoked with an input of type `I`.
///
/// Implemented for every `Fn(I) -> impl Future<Output = Result<O>>`, so async
/// closures and `async fn` items can be registered directly.
#[async_trait::async_trait]
pub trait Handler<I, O>: Send + Sync
where
    I: Send + 'static,
{
    /// Run the handler.
    async fn call(&self, input: I) -> Result<O>;
}

#[async_trait::async_trait]
impl<I, O, F, Fut> Handler<I, O> for F
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    async fn call(&self, input: I) -> Result<O> {
        (self)(input).await
    }
}

/////////////////////////////////////////// EventRegistry //////////////////////////////////////////

/// Maps event keys to exactly one registered handler.
pub struct EventRegistry<I, O>
where
    I: Send + 'static,
{
    name: &'static str,
    handlers: RwLock<HashMap<String, Arc<dyn Handler<I, O>>>>,
}

impl<I, O> EventRegistry<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Create an empty registry; `name` identifies it in log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register `handler` under `key`.
    ///
    /// Returns false when a handler is already registered for `key`; the
    /// existing handler stays in place. Registering the same `Arc` again is a
    /// quiet no-op.
    pub fn register(&self, key: impl Into<String>, handler: Arc<dyn Handler<I, O>>) -> bool {
        let key = key.into();
        let mut handlers = match self.handlers.write() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = handlers.get(&key) {
            if !std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&handler)) {
                tracing::warn!(
                    registry = self.name,
                    key = %key,
                    "handler already registered; keeping the first one"
                );
            }
            return false;
        }
        tracing::debug!(registry = self.name, key = %key, "registered handler");
        handlers.insert(key, handler);
        true
    }

    /// Register an async closure or other handler value under `key`.
    pub fn on<H>(&self, key: impl Into<String>, handler: H) -> bool
    where
        H: Handler<I, O> + 'static,
    {
        self.register(key, Arc::new(handler))
    }

    /// The handler registered for `key`, if any.
    pub fn handler(&self, key: &str) -> Option<Arc<dyn Handler<I, O>>> {
        let handlers = match self.handlers.read() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.get(key).cloned()
    }

    /// True when a handler is registered for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.handler(key).is_some()
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let handlers = match self.handlers.read() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut keys: Vec<String> = handlers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Run the handler registered for `key`.
    ///
    /// Returns `Ok(None)` when nothing is registered. Handler errors are
    /// returned unchanged.
    pub async fn emit(&self, key: &str, input: I) -> Result<Option<O>> {
        let Some(handler) = self.handler(key) else {
            tracing::debug!(registry = self.name, key, "no handler registered");
            return Ok(None);
        };
        handler.call(input).await.map(Some)
    }
}

impl<I, O> fmt::Debug for EventRegistry<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("name", &self.name)
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::Error;

    #[tokio::test]
    async fn emit_runs_the_registered_handler_once() {
        let registry: EventRegistry<u32, u32> = EventRegistry::new("test");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        assert!(registry.on("double", move |x: u32| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(x * 2)
            }
        }));
        assert_eq!(registry.emit("double", 21).await.unwrap(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_handler_yields_none() {
        let registry: EventRegistry<u32, u32> = EventRegistry::new("test");
        assert_eq!(registry.emit("nothing", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn first_registration_wins() {
        let registry: EventRegistry<(), &'static str> = EventRegistry::new("test");
        assert!(registry.on("key", |_: ()| async { Ok::<_, Error>("first") }));
        assert!(!registry.on("key", |_: ()| async { Ok::<_, Error>("second") }));
        assert_eq!(registry.emit("key", ()).await.unwrap(), Some("first"));
        assert_eq!(registry.keys(), vec!["key".to_string()]);
    }

    #[test]
    fn same_handler_registers_quietly() {
        let registry: EventRegistry<(), ()> = EventRegistry::new("test");
        let handler: Arc<dyn Handler<(), ()>> = Arc::new(|_: ()| async { Ok::<(), Error>(()) });
        assert!(registry.register("key", Arc::clone(&handler)));
        assert!(!registry.register("key", handler));
        assert!(registry.contains("key"));
    }

    #[tokio::test]
    async fn handler_errors_propagate() {
        let registry: EventRegistry<(), ()> = EventRegistry::new("test");
        registry.on("boom", |_: ()| async { Err::<(), _>(Error::handler("boom")) });
        let err = registry.emit("boom", ()).await.unwrap_err();
        assert!(matches!(err, Error::Handler { .. }));
    }
}
