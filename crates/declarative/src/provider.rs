//! Provider trait for declarative remote resources
//!
//! A Provider manages one kind of remote object. It is handed the desired
//! declaration (`news`), the last-applied declaration (`olds`) and the last
//! materialized remote state (`output`), and never keeps state of its own
//! between calls.

use crate::context::Notifier;
use crate::diff;
use crate::types::{Decision, KindRules};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Core trait for declarative resource kinds
///
/// Every kind implements this trait, which provides:
/// - Identity (kind name, stable output fields)
/// - A pure diff driven by the kind's [`KindRules`]
/// - Drift detection (read)
/// - Convergence (create, update, delete)
///
/// # Example
///
/// ```ignore
/// use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
///
/// struct TagProvider;
///
/// impl Provider for TagProvider {
///     type Inputs = TagInputs;
///     type Output = TagOutput;
///     type Error = std::io::Error;
///
///     const KIND: &'static str = "tag";
///     const STABLE_FIELDS: &'static [&'static str] = &["tag_id"];
///     const RULES: KindRules = KindRules {
///         replace_on: Fields::Only(&["name"]),
///         update_on: Fields::Only(&["color"]),
///         delete: DeleteStrategy::Hard,
///     };
///
///     fn read(&self, olds: Option<&TagInputs>, output: Option<&TagOutput>)
///         -> Result<Option<TagOutput>, Self::Error> { /* lookup */ }
///     fn create(&self, news: &TagInputs, notes: &mut dyn Notifier)
///         -> Result<TagOutput, Self::Error> { /* find or create */ }
///     fn update(&self, news: &TagInputs, output: &TagOutput, notes: &mut dyn Notifier)
///         -> Result<TagOutput, Self::Error> { /* patch color */ }
///     fn delete(&self, olds: &TagInputs, output: &TagOutput, notes: &mut dyn Notifier)
///         -> Result<(), Self::Error> { /* delete, not-found is fine */ }
/// }
/// ```
pub trait Provider {
    /// Declared properties
    type Inputs: Serialize + DeserializeOwned + Clone + Debug;
    /// Materialized remote state
    type Output: Serialize + DeserializeOwned + Clone + Debug;
    /// Failure type of remote operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Kind name, e.g. `attribute`
    const KIND: &'static str;

    /// Output fields that never change once the remote object exists
    const STABLE_FIELDS: &'static [&'static str];

    /// Replacement triggers, update-eligible fields and delete strategy
    const RULES: KindRules;

    /// Stable field names (see [`Provider::STABLE_FIELDS`])
    fn stable_fields(&self) -> &'static [&'static str] {
        Self::STABLE_FIELDS
    }

    /// Fill defaults that depend on the prior declaration
    ///
    /// Both sides of every comparison pass through here first, so a field
    /// left out of `news` can mean "keep what `olds` settled on". The
    /// default compares the declarations as written.
    fn resolve(news: &Self::Inputs, olds: &Self::Inputs) -> (Self::Inputs, Self::Inputs) {
        (news.clone(), olds.clone())
    }

    /// Whether two resolved declarations name the same remote object
    ///
    /// Consulted only for kinds whose delete is
    /// [`DeleteStrategy::Unsupported`](crate::types::DeleteStrategy): the
    /// old object stays, so a replacement has to live somewhere else.
    fn same_address(_news: &Self::Inputs, _olds: &Self::Inputs) -> bool {
        false
    }

    /// Decide what changing `olds` into `news` requires
    ///
    /// Pure: no I/O, deterministic on its arguments. The default evaluates
    /// [`Provider::RULES`] on the resolved declarations.
    fn diff(&self, news: &Self::Inputs, olds: &Self::Inputs) -> Option<Decision> {
        let (news, olds) = Self::resolve(news, olds);
        diff::decide(&Self::RULES, &news, &olds)
    }

    /// Refresh live state
    ///
    /// Returns `Ok(None)` when the object no longer exists.
    fn read(
        &self,
        olds: Option<&Self::Inputs>,
        output: Option<&Self::Output>,
    ) -> Result<Option<Self::Output>, Self::Error>;

    /// Create the object, or adopt an existing match
    ///
    /// Must be idempotent: a second call with the same declaration finds
    /// the object the first call made.
    fn create(
        &self,
        news: &Self::Inputs,
        notes: &mut dyn Notifier,
    ) -> Result<Self::Output, Self::Error>;

    /// Apply update-eligible changes in place
    fn update(
        &self,
        news: &Self::Inputs,
        output: &Self::Output,
        notes: &mut dyn Notifier,
    ) -> Result<Self::Output, Self::Error>;

    /// Remove the object; already-absent is success
    ///
    /// Only `olds` and `output` are available: the declaration may be gone.
    fn delete(
        &self,
        olds: &Self::Inputs,
        output: &Self::Output,
        notes: &mut dyn Notifier,
    ) -> Result<(), Self::Error>;
}
