//! Sessions: one per app load on the client, one per request on the server.

use crate::app::{AppDefinition, FlowKind, PageDefinition, SubPageDefinition};
use crate::block::BlockInstance;
use crate::bus::EventBus;
use crate::context::{ExecutionContext, Origin};
use crate::dispatch::{DispatchResult, Dispatcher};
use crate::flow::FlowController;
use crate::page::{PageInstance, SubPageInstance};
use serde_json::{Map, Value};
use std::sync::Arc;
use tessera_core::{ActionDefinition, ActionError, HostAdapter, RemapperContext};
use tessera_flow::FlowMachine;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct Session {
    id: Uuid,
    app: Arc<AppDefinition>,
    dispatcher: Arc<Dispatcher>,
    host: Arc<dyn HostAdapter>,
    bus: Arc<EventBus>,
    remap: RemapperContext,
    scope: CancellationToken,
}

impl Session {
    pub fn new(app: Arc<AppDefinition>, dispatcher: Arc<Dispatcher>, host: Arc<dyn HostAdapter>) -> Self {
        let mut remap = RemapperContext::new(app.id.clone());
        remap.variables = app.variables.clone();
        Self {
            id: Uuid::new_v4(),
            app,
            dispatcher,
            host,
            bus: Arc::new(EventBus::new()),
            remap,
            scope: CancellationToken::new(),
        }
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.remap.user = Some(user);
        self
    }

    /// Adjust the remapper context every execution of this session starts from.
    pub fn with_remap_context(mut self, configure: impl FnOnce(RemapperContext) -> RemapperContext) -> Self {
        let remap = std::mem::replace(&mut self.remap, RemapperContext::new(self.app.id.clone()));
        self.remap = configure(remap);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn app(&self) -> &Arc<AppDefinition> {
        &self.app
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// A fresh context rooted in this session's scope.
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.remap.clone(), Arc::clone(&self.host), Arc::clone(&self.bus))
            .with_scope(self.scope.child_token())
    }

    pub async fn dispatch(&self, action: &ActionDefinition, data: Value) -> DispatchResult {
        let ctx = self.context();
        self.dispatcher.dispatch(action, data, &ctx).await
    }

    pub async fn dispatch_with(
        &self,
        action: &ActionDefinition,
        data: Value,
        ctx: &ExecutionContext,
    ) -> DispatchResult {
        self.dispatcher.dispatch(action, data, ctx).await
    }

    /// Mount `name`. Loop pages get one subpage per item of `data`.
    pub fn mount_page(
        &self,
        name: &str,
        params: Map<String, Value>,
        data: Value,
    ) -> Result<PageInstance, ActionError> {
        let page = self
            .app
            .page(name)
            .ok_or_else(|| ActionError::Navigation(format!("no page named `{name}`")))?;

        let scope = self.scope.child_token();
        let mut ctx = ExecutionContext::new(
            self.remap.clone().with_page(name, params),
            Arc::clone(&self.host),
            Arc::clone(&self.bus),
        )
        .with_scope(scope.clone())
        .with_origin(Origin {
            page: Some(name.to_string()),
            ..Origin::default()
        });

        let mut subpages = Vec::new();
        let mut flow = None;
        if let Some(definition) = &page.flow {
            let (machine, pages) = match &definition.kind {
                FlowKind::Flow { steps } => {
                    let names = steps.iter().map(|step| step.name.clone());
                    let machine = FlowMachine::new(names, definition.retain_flow_data);
                    let pages = steps.iter().map(|step| (step, None)).collect::<Vec<_>>();
                    (machine, pages)
                }
                FlowKind::Loop { foreach } => {
                    let items = data.as_array().cloned().unwrap_or_default();
                    let machine = FlowMachine::looped(items.len(), definition.retain_flow_data);
                    let pages = items.into_iter().map(|item| (foreach, Some(item))).collect();
                    (machine, pages)
                }
            };
            let machine = machine.map_err(|err| {
                ActionError::Configuration(format!("page `{name}` cannot start its flow: {err}"))
            })?;
            let controller = Arc::new(FlowController::new(
                machine,
                definition.on_flow_finish.clone(),
                definition.on_flow_cancel.clone(),
            ));
            ctx = ctx.with_flow(Arc::clone(&controller));
            for (index, (subpage, item)) in pages.into_iter().enumerate() {
                subpages.push(self.mount_subpage(subpage, index, item, &ctx));
            }
            flow = Some(controller);
        }

        let blocks = self.mount_blocks(page, &ctx);
        tracing::debug!(page = name, blocks = blocks.len(), subpages = subpages.len(), "Page mounted");
        Ok(PageInstance::new(name.to_string(), blocks, subpages, flow, scope))
    }

    fn mount_blocks(&self, page: &PageDefinition, ctx: &ExecutionContext) -> Vec<BlockInstance> {
        page.blocks
            .iter()
            .map(|block| self.mount_block(block.clone(), ctx))
            .collect()
    }

    fn mount_subpage(
        &self,
        subpage: &SubPageDefinition,
        index: usize,
        item: Option<Value>,
        ctx: &ExecutionContext,
    ) -> SubPageInstance {
        let mut ctx = ctx.clone();
        let name = match item {
            Some(item) => {
                ctx.remap = ctx.remap.with_value("item", item).with_value("index", Value::from(index));
                index.to_string()
            }
            None => subpage.name.clone(),
        };
        SubPageInstance {
            blocks: subpage
                .blocks
                .iter()
                .map(|block| self.mount_block(block.clone(), &ctx))
                .collect(),
            name,
        }
    }

    fn mount_block(&self, block: crate::app::BlockDefinition, ctx: &ExecutionContext) -> BlockInstance {
        let mut ctx = ctx.child();
        ctx.origin.block = Some(block.block_type.clone());
        BlockInstance::new(block, Arc::clone(&self.dispatcher), ctx)
    }

    /// End the session: every page, block and pending wait is cancelled.
    pub fn close(&self) {
        self.scope.cancel();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("app", &self.app.id)
            .field("bus", &self.bus)
            .finish()
    }
}
