use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::client::Client;
use super::{Message, Result};

/// Application code run for a message whose text matched a trigger.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, client: &Client, message: &Message) -> Result<()>;
}

/// A registered handler. Two handlers are the same listener when they share
/// the same allocation, so keep a clone around to unregister it later.
pub type Handler = Arc<dyn MessageHandler>;

fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Routes text messages to handlers by exact, case-sensitive match.
#[derive(Default, Clone)]
pub struct Dispatcher {
    listeners: HashMap<String, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, word: impl Into<String>, handler: Handler) -> Self {
        self.add_message_listener(word, handler);
        self
    }

    pub fn has_listener(&self, handler: &Handler) -> bool {
        self.listeners.values().any(|h| same_handler(h, handler))
    }

    /// Registers `handler` for messages whose text is exactly `word`.
    ///
    /// Ignored when this handler is already registered under any word. A
    /// different handler for an existing word replaces the old one.
    pub fn add_message_listener(&mut self, word: impl Into<String>, handler: Handler) {
        let word = word.into();
        if self.has_listener(&handler) {
            debug!(word = %word, "handler already registered, ignoring");
            return;
        }

        self.listeners.insert(word, handler);
    }

    /// Unregisters `handler`. Returns false if it was not registered.
    pub fn remove_message_listener(&mut self, handler: &Handler) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|_, h| !same_handler(h, handler));
        before != self.listeners.len()
    }

    pub fn listener_for(&self, text: &str) -> Option<&Handler> {
        self.listeners.get(text)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Runs the handler registered for `message.text`, if any.
    ///
    /// Returns whether a handler ran. Messages without text, or with text no
    /// one listens for, are dropped.
    pub async fn dispatch_message(&self, client: &Client, message: &Message) -> Result<bool> {
        let Some(text) = message.text.as_deref() else {
            return Ok(false);
        };

        match self.listeners.get(text) {
            Some(handler) => {
                debug!(message_id = message.message_id, text, "dispatching message");
                handler.handle(client, message).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
