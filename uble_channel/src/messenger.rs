use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::{fmt, future::Future, sync::Arc};
use tracing::{debug, trace};

/// Handles one encoded message and produces the encoded reply.
pub type MessageHandler = Arc<dyn Fn(Bytes) -> BoxFuture<'static, Bytes> + Send + Sync>;

/// Boxes an async closure into a [`MessageHandler`].
pub fn message_handler<F, Fut>(f: F) -> MessageHandler
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Bytes> + Send + 'static,
{
    Arc::new(move |message| Box::pin(f(message)))
}

/// Transport that routes encoded messages to the handler registered on a
/// named channel.
#[async_trait]
pub trait BinaryMessenger: Send + Sync {
    /// Sends `message` on `channel` and waits for the reply.
    ///
    /// Returns `None` when no handler is registered for `channel`.
    async fn send(&self, channel: &str, message: Bytes) -> Option<Bytes>;

    /// Registers `handler` for `channel`, replacing any previous handler.
    /// `None` removes the registration.
    fn set_message_handler(&self, channel: &str, handler: Option<MessageHandler>);
}

/// In-process messenger that calls handlers directly.
#[derive(Default)]
pub struct MemoryMessenger {
    handlers: DashMap<String, MessageHandler>,
}

impl fmt::Debug for MemoryMessenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMessenger")
            .field("channels", &self.handlers.len())
            .finish()
    }
}

impl MemoryMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_handler(&self, channel: &str) -> bool {
        self.handlers.contains_key(channel)
    }

    /// Names of all channels with a registered handler, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        channels.sort();
        channels
    }
}

#[async_trait]
impl BinaryMessenger for MemoryMessenger {
    async fn send(&self, channel: &str, message: Bytes) -> Option<Bytes> {
        // the map guard must not be held across the handler's await
        let handler = self.handlers.get(channel).map(|e| e.value().clone());
        match handler {
            Some(handler) => {
                trace!("{channel}: {} byte message", message.len());
                Some(handler(message).await)
            }
            None => {
                debug!("{channel}: no handler registered");
                None
            }
        }
    }

    fn set_message_handler(&self, channel: &str, handler: Option<MessageHandler>) {
        match handler {
            Some(handler) => {
                self.handlers.insert(channel.to_owned(), handler);
            }
            None => {
                self.handlers.remove(channel);
            }
        }
    }
}
