use parking_lot::Mutex;
use serde_json::{Map, Value};
use tessera_core::{ActionDefinition, ActionError, FlowAction};
use tessera_flow::{FlowError, FlowMachine, FlowOutcome, FlowState};

/// The flow state of one mounted flow or loop page, shared by all its blocks.
#[derive(Debug)]
pub struct FlowController {
    machine: Mutex<FlowMachine>,
    on_finish: Option<ActionDefinition>,
    on_cancel: Option<ActionDefinition>,
}

impl FlowController {
    pub fn new(
        machine: FlowMachine,
        on_finish: Option<ActionDefinition>,
        on_cancel: Option<ActionDefinition>,
    ) -> Self {
        Self {
            machine: Mutex::new(machine),
            on_finish,
            on_cancel,
        }
    }

    /// Run one transition, returning its outcome and the state it started from.
    /// The lock is released before any handler is dispatched.
    pub fn apply(
        &self,
        action: &FlowAction,
        data: &Value,
    ) -> Result<(FlowOutcome, FlowState), ActionError> {
        let mut machine = self.machine.lock();
        let previous = machine.state().clone();
        let outcome = match action {
            FlowAction::Next => machine.next(data),
            FlowAction::Back => machine.back(),
            FlowAction::To(step) => machine.to(step),
            FlowAction::Finish => machine.finish(data),
            FlowAction::Cancel => machine.cancel(),
        };
        outcome
            .map(|outcome| (outcome, previous))
            .map_err(|err| match err {
                FlowError::UnknownStep(_) => ActionError::Navigation(err.to_string()),
                FlowError::Empty | FlowError::Inactive(_) => {
                    ActionError::Configuration(err.to_string())
                }
            })
    }

    pub fn on_finish(&self) -> Option<&ActionDefinition> {
        self.on_finish.as_ref()
    }

    pub fn on_cancel(&self) -> Option<&ActionDefinition> {
        self.on_cancel.as_ref()
    }

    pub fn state(&self) -> FlowState {
        self.machine.lock().state().clone()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.machine.lock().current_index()
    }

    pub fn current_step(&self) -> Option<String> {
        self.machine.lock().current_step().map(str::to_string)
    }

    pub fn carried(&self) -> Map<String, Value> {
        self.machine.lock().carried().cloned().unwrap_or_default()
    }

    /// Reopen the flow after its finish or cancel handler failed.
    pub fn rollback(&self, previous: FlowState) {
        self.machine.lock().rollback(previous);
    }

    pub fn terminate(&self) {
        self.machine.lock().terminate();
    }
}
