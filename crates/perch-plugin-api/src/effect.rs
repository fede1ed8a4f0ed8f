//! Messages delivered to plugins and the effects they return.
//!
//! Plugin `update` is synchronous. Anything slow is handed back to the
//! runtime as an [`Effect`]: a set of futures, each resolving to the next
//! [`Message`] for the plugin that returned it.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;

use crate::adapter::Event;

// =============================================================================
// Message
// =============================================================================

/// Input delivered to a plugin's `update`.
pub enum Message {
    /// A key chord no binding claimed, e.g. "x" or "ctrl+o".
    Key(String),

    /// A bound or palette-selected command.
    Command { id: String, context: String },

    /// An adapter produced an event. `None` means its stream ended.
    Adapter { source: String, event: Option<Event> },

    /// The terminal was resized.
    Resize { width: u16, height: u16 },

    /// Plugin-private payload, typically the result of an effect.
    Custom(Box<dyn Any + Send>),
}

impl Message {
    /// Convenience constructor for `Message::Command`.
    pub fn command(id: impl Into<String>, context: impl Into<String>) -> Self {
        Message::Command {
            id: id.into(),
            context: context.into(),
        }
    }

    /// Wrap a plugin-private value.
    pub fn custom<T: Any + Send>(value: T) -> Self {
        Message::Custom(Box::new(value))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Message::Command { id, context } => f
                .debug_struct("Command")
                .field("id", id)
                .field("context", context)
                .finish(),
            Message::Adapter { source, event } => f
                .debug_struct("Adapter")
                .field("source", source)
                .field("event", event)
                .finish(),
            Message::Resize { width, height } => f
                .debug_struct("Resize")
                .field("width", width)
                .field("height", height)
                .finish(),
            Message::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// =============================================================================
// Effect
// =============================================================================

/// Deferred work returned from a lifecycle call.
///
/// Each future runs on the runtime; its output is routed back to the plugin
/// that produced the effect.
#[derive(Default)]
#[must_use]
pub struct Effect {
    futures: Vec<BoxFuture<'static, Message>>,
}

impl Effect {
    /// No follow-up work.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single future.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Message> + Send + 'static,
    {
        Self {
            futures: vec![future.boxed()],
        }
    }

    /// Deliver `message` on the next loop iteration.
    pub fn message(message: Message) -> Self {
        Self::from_future(async move { message })
    }

    /// Combine several effects.
    pub fn batch(effects: impl IntoIterator<Item = Effect>) -> Self {
        Self {
            futures: effects.into_iter().flat_map(|e| e.futures).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    /// Take the futures for spawning.
    pub fn into_futures(self) -> Vec<BoxFuture<'static, Message>> {
        self.futures
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("futures", &self.futures.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_empty() {
        assert!(Effect::none().is_empty());
    }

    #[test]
    fn test_batch_flattens() {
        let effect = Effect::batch([
            Effect::message(Message::Key("a".into())),
            Effect::none(),
            Effect::batch([
                Effect::message(Message::Key("b".into())),
                Effect::message(Message::Key("c".into())),
            ]),
        ]);
        assert_eq!(effect.len(), 3);
    }

    #[tokio::test]
    async fn test_message_effect_resolves() {
        let mut futures = Effect::message(Message::command("refresh", "global")).into_futures();
        let msg = futures.remove(0).await;
        match msg {
            Message::Command { id, context } => {
                assert_eq!(id, "refresh");
                assert_eq!(context, "global");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_custom_downcast() {
        let msg = Message::custom(42u32);
        match msg {
            Message::Custom(payload) => assert_eq!(payload.downcast_ref::<u32>(), Some(&42)),
            _ => panic!("expected custom"),
        }
    }
}
