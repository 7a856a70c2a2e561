//! FlowState - Subpage Navigation
//!
//! A flow page is an ordered list of subpages. Each `next` submits the current
//! subpage's data; the submissions are shallow-merged in order into the carried
//! data that `onFlowFinish` eventually receives.
//!
//! # Example
//! ```rust
//! use serde_json::json;
//! use tessera_flow::{FlowMachine, FlowOutcome};
//!
//! let mut flow = FlowMachine::new(["name", "address"], false).unwrap();
//! flow.next(&json!({ "name": "Ada" })).unwrap();
//! let outcome = flow.next(&json!({ "city": "London" })).unwrap();
//! assert_eq!(
//!     outcome,
//!     FlowOutcome::Finish(json!({ "name": "Ada", "city": "London" }).as_object().unwrap().clone())
//! );
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("a flow needs at least one subpage")]
    Empty,

    #[error("no subpage named `{0}`")]
    UnknownStep(String),

    #[error("flow is {0}, not active")]
    Inactive(&'static str),
}

/// Where a flow is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    /// Showing subpage `index` with the data carried so far.
    Active {
        index: usize,
        carried: Map<String, Value>,
    },
    /// `onFlowFinish` is running.
    Finishing,
    /// `onFlowCancel` is running, or has run.
    Cancelled,
    /// The page was unmounted, or the finish handler completed.
    Terminated,
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Active { .. } => "active",
            FlowState::Finishing => "finishing",
            FlowState::Cancelled => "cancelled",
            FlowState::Terminated => "terminated",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, FlowState::Active { .. })
    }
}

/// Result of a transition, telling the runtime what to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// Now showing `index`.
    Moved { index: usize, step: String },
    /// Nothing changed (`back` on the first subpage).
    Stayed { index: usize },
    /// Run `onFlowFinish` with this data.
    Finish(Map<String, Value>),
    /// Run `onFlowCancel`; carries the data only when it is retained.
    Cancel(Option<Map<String, Value>>),
}

#[derive(Debug, Clone)]
pub struct FlowMachine {
    steps: Vec<String>,
    retain: bool,
    state: FlowState,
}

impl FlowMachine {
    pub fn new<I, S>(steps: I, retain: bool) -> Result<Self, FlowError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps: Vec<String> = steps.into_iter().map(Into::into).collect();
        if steps.is_empty() {
            return Err(FlowError::Empty);
        }
        Ok(Self {
            steps,
            retain,
            state: FlowState::Active {
                index: 0,
                carried: Map::new(),
            },
        })
    }

    /// A loop page: one subpage per item, named by position.
    pub fn looped(count: usize, retain: bool) -> Result<Self, FlowError> {
        Self::new((0..count).map(|i| i.to_string()), retain)
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn retains_data(&self) -> bool {
        self.retain
    }

    pub fn current_index(&self) -> Option<usize> {
        match &self.state {
            FlowState::Active { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn current_step(&self) -> Option<&str> {
        self.current_index().map(|i| self.steps[i].as_str())
    }

    pub fn carried(&self) -> Option<&Map<String, Value>> {
        match &self.state {
            FlowState::Active { carried, .. } => Some(carried),
            _ => None,
        }
    }

    /// Merge `submitted` and advance; on the last subpage this is `finish`.
    pub fn next(&mut self, submitted: &Value) -> Result<FlowOutcome, FlowError> {
        let last = self.steps.len() - 1;
        let (index, carried) = self.active_mut()?;
        merge(carried, submitted);
        if *index >= last {
            return Ok(self.begin_finish());
        }
        *index += 1;
        let index = *index;
        Ok(self.moved(index))
    }

    pub fn back(&mut self) -> Result<FlowOutcome, FlowError> {
        let (index, _) = self.active_mut()?;
        if *index == 0 {
            return Ok(FlowOutcome::Stayed { index: 0 });
        }
        *index -= 1;
        let index = *index;
        Ok(self.moved(index))
    }

    /// Jump to the subpage called `name`. Carried data is untouched.
    pub fn to(&mut self, name: &str) -> Result<FlowOutcome, FlowError> {
        let target = self
            .steps
            .iter()
            .position(|step| step == name)
            .ok_or_else(|| FlowError::UnknownStep(name.to_string()))?;
        let (index, _) = self.active_mut()?;
        *index = target;
        Ok(self.moved(target))
    }

    pub fn finish(&mut self, submitted: &Value) -> Result<FlowOutcome, FlowError> {
        let (_, carried) = self.active_mut()?;
        merge(carried, submitted);
        Ok(self.begin_finish())
    }

    pub fn cancel(&mut self) -> Result<FlowOutcome, FlowError> {
        self.active_mut()?;
        let previous = std::mem::replace(&mut self.state, FlowState::Cancelled);
        let retained = match previous {
            FlowState::Active { carried, .. } if self.retain => Some(carried),
            _ => None,
        };
        Ok(FlowOutcome::Cancel(retained))
    }

    /// Put back the state captured before a `finish` or `cancel` whose handler failed.
    /// Ignored once the flow has moved on (e.g. was terminated by an unmount).
    pub fn rollback(&mut self, previous: FlowState) {
        if matches!(self.state, FlowState::Finishing | FlowState::Cancelled)
            && previous.is_active()
        {
            self.state = previous;
        }
    }

    /// Unmount or completion. Valid from any state.
    pub fn terminate(&mut self) {
        self.state = FlowState::Terminated;
    }

    fn active_mut(&mut self) -> Result<(&mut usize, &mut Map<String, Value>), FlowError> {
        match &mut self.state {
            FlowState::Active { index, carried } => Ok((index, carried)),
            other => Err(FlowError::Inactive(other.name())),
        }
    }

    fn begin_finish(&mut self) -> FlowOutcome {
        match std::mem::replace(&mut self.state, FlowState::Finishing) {
            FlowState::Active { carried, .. } => FlowOutcome::Finish(carried),
            _ => FlowOutcome::Finish(Map::new()),
        }
    }

    fn moved(&self, index: usize) -> FlowOutcome {
        FlowOutcome::Moved {
            index,
            step: self.steps[index].clone(),
        }
    }
}

/// Shallow merge; later keys win. Anything but an object is ignored.
fn merge(carried: &mut Map<String, Value>, submitted: &Value) {
    if let Value::Object(fields) = submitted {
        for (key, value) in fields {
            carried.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn next_on_last_step_equals_finish() {
        let mut via_next = FlowMachine::new(["a", "b"], false).unwrap();
        via_next.next(&json!({ "x": 1 })).unwrap();
        let a = via_next.next(&json!({ "y": 2 })).unwrap();

        let mut via_finish = FlowMachine::new(["a", "b"], false).unwrap();
        via_finish.next(&json!({ "x": 1 })).unwrap();
        let b = via_finish.finish(&json!({ "y": 2 })).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, FlowOutcome::Finish(object(json!({ "x": 1, "y": 2 }))));
        assert_eq!(via_next.state(), &FlowState::Finishing);
    }

    #[test]
    fn later_submissions_override_earlier_keys() {
        let mut flow = FlowMachine::new(["a", "b", "c"], false).unwrap();
        flow.next(&json!({ "name": "first", "keep": true })).unwrap();
        flow.next(&json!({ "name": "second" })).unwrap();
        let outcome = flow.next(&json!("not an object")).unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::Finish(object(json!({ "name": "second", "keep": true })))
        );
    }

    #[test]
    fn rollback_reopens_a_failed_finish() {
        let mut flow = FlowMachine::new(["a", "b"], false).unwrap();
        flow.next(&json!({ "x": 1 })).unwrap();
        let before = flow.state().clone();
        flow.next(&json!({ "y": 2 })).unwrap();

        flow.rollback(before.clone());
        assert_eq!(flow.state(), &before);
        assert_eq!(flow.current_step(), Some("b"));

        flow.terminate();
        flow.rollback(before);
        assert_eq!(flow.state(), &FlowState::Terminated);
    }

    #[test]
    fn back_on_first_step_stays() {
        let mut flow = FlowMachine::new(["a", "b"], false).unwrap();
        assert_eq!(flow.back().unwrap(), FlowOutcome::Stayed { index: 0 });
        flow.next(&json!({})).unwrap();
        assert_eq!(
            flow.back().unwrap(),
            FlowOutcome::Moved {
                index: 0,
                step: "a".into()
            }
        );
    }

    #[test]
    fn to_jumps_or_fails() {
        let mut flow = FlowMachine::new(["intro", "details", "summary"], false).unwrap();
        assert_eq!(
            flow.to("summary").unwrap(),
            FlowOutcome::Moved {
                index: 2,
                step: "summary".into()
            }
        );
        assert_eq!(
            flow.to("missing").unwrap_err(),
            FlowError::UnknownStep("missing".into())
        );
        assert_eq!(flow.current_step(), Some("summary"));
    }

    #[test]
    fn cancel_discards_unless_retained() {
        let mut dropped = FlowMachine::new(["a", "b"], false).unwrap();
        dropped.next(&json!({ "x": 1 })).unwrap();
        assert_eq!(dropped.cancel().unwrap(), FlowOutcome::Cancel(None));
        assert_eq!(dropped.state(), &FlowState::Cancelled);

        let mut kept = FlowMachine::new(["a", "b"], true).unwrap();
        kept.next(&json!({ "x": 1 })).unwrap();
        assert_eq!(
            kept.cancel().unwrap(),
            FlowOutcome::Cancel(Some(object(json!({ "x": 1 }))))
        );
    }

    #[test]
    fn inactive_flows_reject_transitions() {
        let mut flow = FlowMachine::new(["only"], false).unwrap();
        flow.finish(&json!({})).unwrap();
        assert_eq!(flow.next(&json!({})).unwrap_err(), FlowError::Inactive("finishing"));
        flow.terminate();
        assert_eq!(flow.back().unwrap_err(), FlowError::Inactive("terminated"));
    }

    #[test]
    fn loops_have_one_step_per_item() {
        let flow = FlowMachine::looped(3, false).unwrap();
        assert_eq!(flow.steps(), ["0", "1", "2"]);
        assert_eq!(FlowMachine::looped(0, false).unwrap_err(), FlowError::Empty);
    }
}
