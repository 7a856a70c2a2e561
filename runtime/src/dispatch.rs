//! # Dispatcher: Action Execution
//!
//! Every action runs through [`Dispatcher::dispatch`]:
//!
//! 1. `remapBefore` reshapes the input,
//! 2. the kind runs (control flow recurses, delegate kinds call the host),
//! 3. `remapAfter` reshapes a successful result,
//! 4. `onSuccess` receives the result, or `onError` the error payload.
//!
//! Errors climb outward one action at a time: the failing action's own `onError`
//! gets the first chance, then each enclosing `condition`, `match` or `each`.
//! Cancellation is never handed to `onError`.

use crate::bus::{BusClosed, Event, Waiter};
use crate::context::ExecutionContext;
use crate::flow::FlowController;
use crate::host_call;
use futures_util::future::join_all;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tessera_core::{
    ActionDefinition, ActionError, ActionKind, EngineConfig, Evaluator, FlowAction, LogLevel,
    Remapper, truthy,
};
use tessera_flow::{FlowOutcome, FlowState};
use tracing::Instrument;

/// Type alias for the boxed futures of recursive dispatch.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type DispatchResult = Result<Value, ActionError>;

/// Stateless action interpreter. Shared read-only by every session.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    evaluator: Evaluator,
    max_depth: usize,
    wait_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(evaluator: Evaluator, config: &EngineConfig) -> Self {
        Self {
            evaluator,
            max_depth: config.max_depth,
            wait_timeout: config.wait_timeout(),
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub async fn dispatch(
        &self,
        action: &ActionDefinition,
        data: Value,
        ctx: &ExecutionContext,
    ) -> DispatchResult {
        self.dispatch_at(action, data, ctx, 0).await
    }

    fn dispatch_at<'a>(
        &'a self,
        action: &'a ActionDefinition,
        data: Value,
        ctx: &'a ExecutionContext,
        depth: usize,
    ) -> BoxFuture<'a, DispatchResult> {
        Box::pin(async move {
            if depth >= self.max_depth {
                return Err(ActionError::Validation(format!(
                    "action nesting exceeds the limit of {}",
                    self.max_depth
                )));
            }
            if ctx.scope.is_cancelled() {
                return Err(ActionError::Cancelled("scope was torn down".into()));
            }

            let span = tracing::info_span!(
                "action",
                tessera.action = action.kind_name(),
                tessera.depth = depth
            );

            async move {
                match self.run(action, data, ctx, depth).await {
                    Ok(value) => match &action.on_success {
                        Some(next) => self.dispatch_at(next, value, ctx, depth + 1).await,
                        None => Ok(value),
                    },
                    Err(err) if err.is_cancellation() => Err(err),
                    Err(err) => match &action.on_error {
                        Some(handler) => {
                            tracing::debug!(error = %err, "Handing failure to onError");
                            self.dispatch_at(handler, err.to_payload(), ctx, depth + 1)
                                .await
                        }
                        None => {
                            tracing::debug!(kind = %err.kind(), error = %err, "Action failed");
                            Err(err)
                        }
                    },
                }
            }
            .instrument(span)
            .await
        })
    }

    async fn run(
        &self,
        action: &ActionDefinition,
        data: Value,
        ctx: &ExecutionContext,
        depth: usize,
    ) -> DispatchResult {
        let input = match &action.remap_before {
            Some(remapper) => self.remap(remapper, &data, ctx)?,
            None => data,
        };
        let output = self.execute(&action.kind, input, ctx, depth).await?;
        match &action.remap_after {
            Some(remapper) => self.remap(remapper, &output, ctx),
            None => Ok(output),
        }
    }

    fn remap(&self, remapper: &Remapper, data: &Value, ctx: &ExecutionContext) -> DispatchResult {
        Ok(self.evaluator.evaluate(remapper, data, &ctx.remap)?)
    }

    async fn execute(
        &self,
        kind: &ActionKind,
        data: Value,
        ctx: &ExecutionContext,
        depth: usize,
    ) -> DispatchResult {
        match kind {
            ActionKind::Noop => Ok(data),
            ActionKind::Throw => Err(ActionError::Rejected(data)),
            ActionKind::Log { level } => {
                log(*level, &data);
                Ok(data)
            }
            ActionKind::Static { value } => Ok(value.clone()),
            ActionKind::Condition {
                condition,
                then,
                otherwise,
            } => {
                if truthy(&self.remap(condition, &data, ctx)?) {
                    self.dispatch_at(then, data, ctx, depth + 1).await
                } else if let Some(otherwise) = otherwise {
                    self.dispatch_at(otherwise, data, ctx, depth + 1).await
                } else {
                    Ok(data)
                }
            }
            ActionKind::Match { cases } => {
                for case in cases {
                    if truthy(&self.remap(&case.case, &data, ctx)?) {
                        return self.dispatch_at(&case.action, data, ctx, depth + 1).await;
                    }
                }
                Ok(data)
            }
            ActionKind::Each { body, serial } => self.each(body, *serial, data, ctx, depth).await,
            ActionKind::Event { event, wait_for } => {
                // Register before emitting so a synchronous reply is not missed.
                let waiter = wait_for.as_deref().map(|channel| ctx.bus.wait_for(channel));
                ctx.bus.emit(event, Event::new(data.clone()));
                match waiter {
                    Some(waiter) => self.await_event(waiter, ctx).await,
                    None => Ok(data),
                }
            }
            ActionKind::Flow(flow) => self.flow(flow, data, ctx, depth).await,
            ActionKind::Host(host) => host_call::call(&self.evaluator, host, data, ctx).await,
            ActionKind::Unresolved(name) => Err(ActionError::Configuration(format!(
                "unknown action type `{name}`"
            ))),
        }
    }

    /// Results keep input order. Concurrent items all run to completion; the
    /// lowest-index failure is reported. Serial items stop at the first failure.
    async fn each(
        &self,
        body: &ActionDefinition,
        serial: bool,
        data: Value,
        ctx: &ExecutionContext,
        depth: usize,
    ) -> DispatchResult {
        let Value::Array(items) = data else {
            return self.dispatch_at(body, data, ctx, depth + 1).await;
        };

        if serial {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                results.push(self.dispatch_at(body, item, ctx, depth + 1).await?);
            }
            return Ok(Value::Array(results));
        }

        join_all(
            items
                .into_iter()
                .map(|item| self.dispatch_at(body, item, ctx, depth + 1)),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
    }

    async fn await_event(&self, waiter: Waiter, ctx: &ExecutionContext) -> DispatchResult {
        let wait = async {
            tokio::select! {
                biased;
                _ = ctx.scope.cancelled() => {
                    Err(ActionError::Cancelled("scope was torn down while waiting".into()))
                }
                received = waiter => match received {
                    Ok(event) => event.into_result(),
                    Err(BusClosed) => Err(ActionError::Cancelled("event bus closed".into())),
                },
            }
        };
        match self.wait_timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.unwrap_or_else(|_| {
                Err(ActionError::Cancelled(format!(
                    "no event within {}ms",
                    limit.as_millis()
                )))
            }),
            None => wait.await,
        }
    }

    async fn flow(
        &self,
        action: &FlowAction,
        data: Value,
        ctx: &ExecutionContext,
        depth: usize,
    ) -> DispatchResult {
        let controller = ctx.flow.as_ref().ok_or_else(|| {
            ActionError::Configuration("flow actions are only available on flow pages".into())
        })?;

        let (outcome, previous) = controller.apply(action, &data)?;
        match outcome {
            FlowOutcome::Moved { index, step } => {
                tracing::debug!(index, step = %step, "Flow moved");
                Ok(Value::Object(controller.carried()))
            }
            FlowOutcome::Stayed { .. } => Ok(Value::Object(controller.carried())),
            FlowOutcome::Finish(carried) => {
                let result = self
                    .flow_handler(controller.on_finish(), Value::Object(carried), ctx, depth)
                    .await;
                settle(controller, previous, &result);
                result
            }
            FlowOutcome::Cancel(retained) => {
                let payload = retained.map_or_else(|| Value::Object(Map::new()), Value::Object);
                let result = self
                    .flow_handler(controller.on_cancel(), payload, ctx, depth)
                    .await;
                settle(controller, previous, &result);
                result
            }
        }
    }

    async fn flow_handler(
        &self,
        handler: Option<&ActionDefinition>,
        data: Value,
        ctx: &ExecutionContext,
        depth: usize,
    ) -> DispatchResult {
        match handler {
            Some(handler) => self.dispatch_at(handler, data, ctx, depth + 1).await,
            None => Ok(data),
        }
    }
}

/// A flow ends only when its handler succeeds; otherwise it is left as it was
/// before the transition, carried data included.
fn settle(controller: &FlowController, previous: FlowState, result: &DispatchResult) {
    match result {
        Ok(_) => controller.terminate(),
        Err(err) => {
            tracing::debug!(kind = %err.kind(), "Flow handler failed, flow reopened");
            controller.rollback(previous);
        }
    }
}

fn log(level: LogLevel, data: &Value) {
    match level {
        LogLevel::Debug => tracing::debug!(%data, "log action"),
        LogLevel::Info => tracing::info!(%data, "log action"),
        LogLevel::Warn => tracing::warn!(%data, "log action"),
        LogLevel::Error => tracing::error!(%data, "log action"),
    }
}
