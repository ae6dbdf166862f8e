//! Execution planner - turns a stack and its state into ordered steps

use anyhow::{Context, Result};
use crmkit::Client;
use declarative::{Action, Target};
use serde_json::Value;

use crate::resource::Kind;
use crate::stack::Stack;
use crate::state::{ResourceState, State};

/// What a step does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Converge a declaration
    Apply(Action),
    /// Remove a recorded resource
    Delete,
}

impl Operation {
    pub fn is_change(&self) -> bool {
        match self {
            Self::Apply(action) => action.is_change(),
            Self::Delete => true,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Apply(action) => action.symbol(),
            Self::Delete => "-",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Apply(Action::Create) => "create",
            Self::Apply(Action::Update) => "update",
            Self::Apply(Action::Replace) => "replace",
            Self::Apply(Action::NoOp) => "unchanged",
            Self::Delete => "delete",
        }
    }
}

/// One unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub kind: Kind,
    pub operation: Operation,

    /// Normalized declaration; the recorded one for deletes
    pub inputs: Value,

    /// Recorded inputs and output of the same kind
    pub prior: Option<(Value, Value)>,

    /// Declared fields that differ from what was applied
    pub changed: Vec<String>,
}

impl Step {
    /// `kind.name`
    pub fn address(&self) -> String {
        format!("{}.{}", self.kind, self.name)
    }

    fn delete(recorded: &ResourceState) -> Self {
        Self {
            name: recorded.name.clone(),
            kind: recorded.kind,
            operation: Operation::Delete,
            inputs: recorded.inputs.clone(),
            prior: Some((recorded.inputs.clone(), recorded.output.clone())),
            changed: Vec::new(),
        }
    }
}

/// Ordered steps for one run
#[derive(Debug, Default, Clone)]
pub struct ExecutionPlan {
    pub steps: Vec<Step>,
}

impl ExecutionPlan {
    /// Plan an apply
    ///
    /// Declarations come first in stack order. A declaration whose kind
    /// changed is a delete of the recorded resource followed by a create.
    /// Recorded resources no longer declared are deleted last, newest first.
    pub fn for_apply(
        client: &Client,
        stack: &Stack,
        state: &State,
        target: &Target,
    ) -> Result<Self> {
        let mut steps = Vec::new();

        for declaration in &stack.resources {
            if !target.matches(declaration.kind.name(), &declaration.name) {
                continue;
            }
            let inputs = declaration
                .inputs()
                .with_context(|| format!("Invalid resource '{}'", declaration.name))?;

            let recorded = state.get(&declaration.name);
            let prior = match recorded {
                Some(r) if r.kind == declaration.kind => {
                    Some((r.inputs.clone(), r.output.clone()))
                }
                Some(r) => {
                    log::debug!(
                        "{} changed kind from {} to {}",
                        declaration.name,
                        r.kind,
                        declaration.kind
                    );
                    steps.push(Step::delete(r));
                    None
                }
                None => None,
            };

            let action = declaration
                .kind
                .plan(client, &inputs, prior.as_ref().map(|(i, o)| (i, o)))
                .with_context(|| format!("Could not plan {}", declaration.address()))?;
            let changed = match (&prior, action) {
                (Some((olds, _)), Action::Update | Action::Replace) => {
                    declaration.kind.changed_fields(&inputs, olds)?
                }
                _ => Vec::new(),
            };

            steps.push(Step {
                name: declaration.name.clone(),
                kind: declaration.kind,
                operation: Operation::Apply(action),
                inputs,
                prior,
                changed,
            });
        }

        for recorded in state.resources.iter().rev() {
            if stack.find(&recorded.name).is_none()
                && target.matches(recorded.kind.name(), &recorded.name)
            {
                steps.push(Step::delete(recorded));
            }
        }

        Ok(Self { steps })
    }

    /// Plan a destroy: every selected recorded resource, newest first
    pub fn for_destroy(state: &State, target: &Target) -> Self {
        let steps = state
            .resources
            .iter()
            .rev()
            .filter(|r| target.matches(r.kind.name(), &r.name))
            .map(Step::delete)
            .collect();
        Self { steps }
    }

    /// Steps that change something
    pub fn changes(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.operation.is_change())
    }

    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Number of steps with the given operation
    pub fn count(&self, operation: Operation) -> usize {
        self.steps.iter().filter(|s| s.operation == operation).count()
    }
}
