//! Block instances: the runtime face of a block definition.
//!
//! A block only sees its own action names and its own event names. Event names
//! are translated to app-level channels through the block's `EventsDefinition`;
//! a name the definition does not declare is silently ignored.

use crate::app::BlockDefinition;
use crate::bus::{Event, SubscriptionId};
use crate::context::ExecutionContext;
use crate::dispatch::{DispatchResult, Dispatcher};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tessera_core::ActionDefinition;

pub struct BlockInstance {
    definition: BlockDefinition,
    dispatcher: Arc<Dispatcher>,
    ctx: ExecutionContext,
    subscriptions: Mutex<Vec<(String, SubscriptionId)>>,
}

impl BlockInstance {
    pub(crate) fn new(definition: BlockDefinition, dispatcher: Arc<Dispatcher>, ctx: ExecutionContext) -> Self {
        Self {
            definition,
            dispatcher,
            ctx,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn block_type(&self) -> &str {
        &self.definition.block_type
    }

    pub fn definition(&self) -> &BlockDefinition {
        &self.definition
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn actions(&self) -> BlockActions<'_> {
        BlockActions { block: self }
    }

    pub fn events(&self) -> BlockEvents<'_> {
        BlockEvents { block: self }
    }

    /// Shorthand for `actions().dispatch(name, data)`.
    pub async fn dispatch(&self, name: &str, data: Value) -> DispatchResult {
        self.actions().dispatch(name, data).await
    }

    pub fn is_mounted(&self) -> bool {
        !self.ctx.scope.is_cancelled()
    }

    /// Drop every subscription and cancel outstanding waits. Idempotent.
    pub fn teardown(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for (channel, id) in subscriptions {
            self.ctx.bus.off(&channel, id);
        }
        self.ctx.scope.cancel();
    }
}

impl Drop for BlockInstance {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for BlockInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockInstance")
            .field("type", &self.definition.block_type)
            .field("actions", &self.definition.actions.keys().collect::<Vec<_>>())
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish()
    }
}

pub struct BlockActions<'a> {
    block: &'a BlockInstance,
}

impl<'a> BlockActions<'a> {
    pub fn names(&self) -> impl Iterator<Item = &'a str> {
        self.block.definition.actions.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&'a ActionDefinition> {
        self.block.definition.actions.get(name)
    }

    /// Dispatch the action bound to `name`. An unbound name behaves as `noop`.
    pub async fn dispatch(&self, name: &str, data: Value) -> DispatchResult {
        match self.get(name) {
            Some(action) => self.block.dispatcher.dispatch(action, data, &self.block.ctx).await,
            None => {
                tracing::debug!(block = %self.block.block_type(), action = name, "Unbound action");
                Ok(data)
            }
        }
    }
}

pub struct BlockEvents<'a> {
    block: &'a BlockInstance,
}

impl BlockEvents<'_> {
    /// Emit on the channel mapped to `name`. Returns `false` when `name` is undeclared.
    pub fn emit(&self, name: &str, data: Value, error: Option<Value>) -> bool {
        let Some(channel) = self.block.definition.events.emit_channel(name) else {
            return false;
        };
        if !self.block.is_mounted() {
            return false;
        }
        let event = match error {
            Some(error) => Event::failed(data, error),
            None => Event::new(data),
        };
        self.block.ctx.bus.emit(channel, event);
        true
    }

    /// Listen on the channel mapped to `name` until the block is torn down.
    pub fn on<F>(&self, name: &str, listener: F) -> Option<SubscriptionId>
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let channel = self.block.definition.events.listen_channel(name)?;
        if !self.block.is_mounted() {
            return None;
        }
        let id = self.block.ctx.bus.on(channel, listener);
        self.block
            .subscriptions
            .lock()
            .push((channel.to_string(), id));
        Some(id)
    }

    pub fn off(&self, name: &str, id: SubscriptionId) -> bool {
        let Some(channel) = self.block.definition.events.listen_channel(name) else {
            return false;
        };
        {
            let mut subscriptions = self.block.subscriptions.lock();
            let Some(position) = subscriptions.iter().position(|(_, sub)| *sub == id) else {
                return false;
            };
            subscriptions.remove(position);
        }
        self.block.ctx.bus.off(channel, id)
    }
}
