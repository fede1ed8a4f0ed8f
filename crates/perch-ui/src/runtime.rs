//! Effect execution.
//!
//! Effects returned by plugins are spawned on the runtime. Each resolved
//! message is routed back to the plugin that issued the effect and enters
//! the main loop through a single channel.

use perch_plugin_api::Effect;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::model::Routed;

/// Spawns effects and routes their results.
#[derive(Clone)]
pub struct EffectRunner {
    tx: mpsc::UnboundedSender<Routed>,
    handle: Handle,
}

impl EffectRunner {
    /// Create a runner and the receiver the main loop drains.
    pub fn new(handle: Handle) -> (Self, mpsc::UnboundedReceiver<Routed>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, handle }, rx)
    }

    /// Spawn every future in `effect`, tagging results with `plugin_id`.
    pub fn spawn(&self, plugin_id: &str, effect: Effect) {
        for future in effect.into_futures() {
            let tx = self.tx.clone();
            let plugin_id = plugin_id.to_string();
            self.handle.spawn(async move {
                let message = future.await;
                if tx.send(Routed { plugin_id, message }).is_err() {
                    tracing::trace!("Main loop gone, dropping effect result");
                }
            });
        }
    }

    /// Spawn a batch of (plugin, effect) pairs.
    pub fn spawn_all(&self, effects: Vec<(String, Effect)>) {
        for (plugin_id, effect) in effects {
            self.spawn(&plugin_id, effect);
        }
    }
}
