//! # Declarative
//!
//! A framework for declarative management of remote resources.
//!
//! This crate provides the contract every resource kind implements, and the
//! small driver that turns a declaration plus its prior state into the
//! remote operations needed to converge.
//!
//! ## Core Concepts
//!
//! - **Provider**: one kind of remote object (read, create, update, delete)
//! - **KindRules**: the per-kind table of replacement triggers,
//!   update-eligible fields and delete strategy
//! - **Decision**: what a change between two declarations requires
//! - **Notifier**: side channel for human-readable audit notes
//!
//! ## Control flow
//!
//! ```ignore
//! use declarative::{reconcile, destroy, LogNotes, Outcome};
//!
//! // prior is the last-applied declaration and its output, if any
//! let outcome = reconcile(&provider, &news, prior, &mut LogNotes)?;
//! match outcome {
//!     Outcome::Created(out) | Outcome::Replaced(out) => persist(out),
//!     Outcome::Updated(out) => persist(out),
//!     Outcome::Unchanged(_) => {}
//! }
//!
//! // Later, when the declaration is removed
//! destroy(&provider, &olds, &output, &mut LogNotes)?;
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`Notifier`]: Receives audit notes
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or remote clients.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod provider;
pub mod types;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, LogNotes, NoNotes, NoProgress, NoteBuffer,
    Notifier, ProgressCallback,
};
pub use diff::{changed_fields, decide, stable_identity};
pub use executor::{destroy, reconcile, refresh};
pub use planner::{Target, can_replace, plan};
pub use provider::Provider;
pub use types::{
    Action, Decision, DeleteStrategy, Drift, ExecuteSummary, Fields, KindRules, Outcome, Removal,
    StepResult,
};
