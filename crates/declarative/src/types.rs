//! Core types for declarative resource reconciliation

use serde::{Deserialize, Serialize};

/// What a diff between a declaration and its last-applied version requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Change can be applied in place
    Update,
    /// Change requires delete followed by create
    Replace,
}

/// Which declared fields a rule covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fields {
    /// No field
    None,
    /// Every declared field
    All,
    /// Exactly these fields
    Only(&'static [&'static str]),
}

impl Fields {
    /// Whether the rule covers no field at all
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None) || matches!(self, Self::Only(fields) if fields.is_empty())
    }
}

/// How a kind disappears from the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStrategy {
    /// Delete endpoint removes the object
    Hard,
    /// Update endpoint flips an archived flag
    Archive,
    /// The API cannot delete this kind; only local state forgets it
    Unsupported,
}

/// Per-kind reconciliation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindRules {
    /// Fields whose change forces a replace
    pub replace_on: Fields,
    /// Fields whose change can be applied by update
    pub update_on: Fields,
    /// What delete does for this kind
    pub delete: DeleteStrategy,
}

/// What reconciling a declaration against prior state would do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing applied yet
    Create,
    /// Update in place
    Update,
    /// Delete then create
    Replace,
    /// Declaration matches what was applied
    NoOp,
}

impl Action {
    /// Whether this action changes anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Plan symbol for the action
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::NoOp => " ",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::NoOp => "no-op",
        };
        write!(f, "{name}")
    }
}

/// Result of reconciling one declaration, carrying the new output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<O> {
    /// Created (or adopted) a remote object
    Created(O),
    /// Updated in place
    Updated(O),
    /// Deleted and recreated
    Replaced(O),
    /// No change needed
    Unchanged(O),
}

impl<O> Outcome<O> {
    /// The output to persist
    pub fn output(&self) -> &O {
        match self {
            Self::Created(o) | Self::Updated(o) | Self::Replaced(o) | Self::Unchanged(o) => o,
        }
    }

    /// Consume the outcome, returning the output
    pub fn into_output(self) -> O {
        match self {
            Self::Created(o) | Self::Updated(o) | Self::Replaced(o) | Self::Unchanged(o) => o,
        }
    }

    /// Convert the carried output, keeping the variant
    pub fn map<U>(self, f: impl FnOnce(O) -> U) -> Outcome<U> {
        match self {
            Self::Created(o) => Outcome::Created(f(o)),
            Self::Updated(o) => Outcome::Updated(f(o)),
            Self::Replaced(o) => Outcome::Replaced(f(o)),
            Self::Unchanged(o) => Outcome::Unchanged(f(o)),
        }
    }

    /// Summary result for this outcome
    pub fn result(&self) -> StepResult {
        match self {
            Self::Created(_) => StepResult::Created,
            Self::Updated(_) => StepResult::Updated,
            Self::Replaced(_) => StepResult::Replaced,
            Self::Unchanged(_) => StepResult::Unchanged,
        }
    }
}

/// Result of removing one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Remote object deleted or archived (or already gone)
    Deleted,
    /// Remote object left in place; only local state forgets it
    Forgotten,
}

/// Result of refreshing one resource against live state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift<O> {
    /// Still present with the same identity
    Current(O),
    /// Present, but stable fields differ: replaced out of band
    Replaced(O),
    /// No longer present remotely
    Gone,
}

impl<O> Drift<O> {
    /// Convert the carried output, keeping the variant
    pub fn map<U>(self, f: impl FnOnce(O) -> U) -> Drift<U> {
        match self {
            Self::Current(o) => Drift::Current(f(o)),
            Self::Replaced(o) => Drift::Replaced(f(o)),
            Self::Gone => Drift::Gone,
        }
    }
}

/// Result of one executed step, as reported to progress callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepResult {
    /// No changes needed
    Unchanged,
    /// Resource was created or adopted
    Created,
    /// Resource was updated in place
    Updated,
    /// Resource was deleted and recreated
    Replaced,
    /// Resource was deleted or archived
    Deleted,
    /// Resource was dropped from local state only
    Forgotten,
    /// Step failed
    Failed { error: String },
    /// Step was skipped
    Skipped { reason: String },
}

impl StepResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Replaced | Self::Deleted | Self::Forgotten
        )
    }
}

impl From<Removal> for StepResult {
    fn from(removal: Removal) -> Self {
        match removal {
            Removal::Deleted => Self::Deleted,
            Removal::Forgotten => Self::Forgotten,
        }
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub forgotten: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted + self.forgotten
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.unchanged + self.skipped + self.failed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.replaced += other.replaced;
        self.deleted += other.deleted;
        self.forgotten += other.forgotten;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &StepResult) {
        match result {
            StepResult::Unchanged => self.unchanged += 1,
            StepResult::Created => self.created += 1,
            StepResult::Updated => self.updated += 1,
            StepResult::Replaced => self.replaced += 1,
            StepResult::Deleted => self.deleted += 1,
            StepResult::Forgotten => self.forgotten += 1,
            StepResult::Failed { .. } => self.failed += 1,
            StepResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        for result in [
            StepResult::Created,
            StepResult::Updated,
            StepResult::Forgotten,
            StepResult::Unchanged,
            StepResult::Failed {
                error: "boom".into(),
            },
        ] {
            summary.add_result(&result);
        }

        assert_eq!(summary.total_changes(), 3);
        assert_eq!(summary.total(), 5);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ExecuteSummary {
            created: 1,
            ..Default::default()
        };
        let b = ExecuteSummary {
            created: 2,
            deleted: 1,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.created, 3);
        assert_eq!(a.deleted, 1);
    }

    #[test]
    fn test_fields_is_empty() {
        assert!(Fields::None.is_empty());
        assert!(Fields::Only(&[]).is_empty());
        assert!(!Fields::All.is_empty());
        assert!(!Fields::Only(&["title"]).is_empty());
    }

    #[test]
    fn test_outcome_result() {
        assert_eq!(Outcome::Replaced(1).result(), StepResult::Replaced);
        assert_eq!(Outcome::Unchanged(1).into_output(), 1);
    }
}
