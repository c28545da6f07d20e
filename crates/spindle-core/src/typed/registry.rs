//! HandlerRegistry - resolves a message's runtime type to its handler.

use std::sync::Arc;

use dashmap::DashMap;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::message::Message;
use crate::domain::{Envelope, MessageType};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler for message type '{0}' is already registered")]
    AlreadyRegistered(MessageType),
}

/// Collects handlers in registration order.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: Vec<Arc<dyn DynHandler>>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M: Message, H: Handler<M> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<&mut Self, RegistryError> {
        self.register_dyn(Arc::new(TypedHandler::<M, H>::new(handler)))
    }

    pub fn register_dyn(
        &mut self,
        handler: Arc<dyn DynHandler>,
    ) -> Result<&mut Self, RegistryError> {
        let declared = handler.declared_type();
        if self.handlers.iter().any(|h| h.declared_type() == declared) {
            return Err(RegistryError::AlreadyRegistered(declared.clone()));
        }
        self.handlers.push(handler);
        Ok(self)
    }

    pub fn declared_types(&self) -> Vec<MessageType> {
        self.handlers
            .iter()
            .map(|h| h.declared_type().clone())
            .collect()
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
            cache: DashMap::new(),
        }
    }
}

/// Fixed set of handlers plus a lazily built resolution cache.
///
/// Resolution scans handlers in registration order and picks the first whose
/// declared type the message satisfies. When both a family handler and a
/// variant handler are registered, whichever came first wins; nothing checks
/// this at build time.
///
/// The cache is keyed by the runtime type together with the families the
/// message declares, so an envelope with missing or different families gets
/// its own entry. Misses are cached too.
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn DynHandler>>,
    cache: DashMap<ResolutionKey, Option<Arc<dyn DynHandler>>>,
}

/// Everything resolution looks at: runtime type plus sorted families.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    message_type: MessageType,
    families: Vec<MessageType>,
}

impl ResolutionKey {
    fn of(envelope: &Envelope) -> Self {
        let mut families = envelope.families().to_vec();
        families.sort();
        families.dedup();
        Self {
            message_type: envelope.message_type().clone(),
            families,
        }
    }
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    pub fn resolve(&self, envelope: &Envelope) -> Option<Arc<dyn DynHandler>> {
        let key = ResolutionKey::of(envelope);
        if let Some(hit) = self.cache.get(&key) {
            return hit.value().clone();
        }

        let found = self
            .handlers
            .iter()
            .find(|h| envelope.satisfies(h.declared_type()))
            .cloned();

        // 競合したら先に入った方を使う
        self.cache
            .entry(key)
            .or_insert(found)
            .value()
            .clone()
    }

    pub fn declared_types(&self) -> Vec<MessageType> {
        self.handlers
            .iter()
            .map(|h| h.declared_type().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Number of distinct (type, families) shapes resolved so far.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
