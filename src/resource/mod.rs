//! Resource kinds for declarative CRM workspace configuration
//!
//! Every kind is a [`Provider`] over a shared [`Client`]. The engine only
//! sees JSON (stack properties, state outputs); [`Kind`] decodes those into
//! the provider's typed inputs and outputs and dispatches statically.

pub mod attribute;
pub mod entry;
pub mod error;
pub mod list;
pub mod note;
pub mod object;
pub mod record;
pub mod search;
pub mod select_option;
pub mod status;
pub mod task;
pub mod webhook;

use crmkit::Client;
use declarative::{Action, DeleteStrategy, Drift, KindRules, Notifier, Outcome, Provider, Removal};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub use error::{ProviderError, Result};

/// Resource kind, as written in stack files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Object,
    Attribute,
    SelectOption,
    Status,
    List,
    Record,
    Entry,
    Note,
    Task,
    Webhook,
}

/// Pick the provider type for a kind and evaluate `$body` with it bound to `$p`
macro_rules! dispatch {
    ($kind:expr, $p:ident => $body:expr) => {
        match $kind {
            Kind::Object => {
                type $p<'c> = object::ObjectProvider<'c>;
                $body
            }
            Kind::Attribute => {
                type $p<'c> = attribute::AttributeProvider<'c>;
                $body
            }
            Kind::SelectOption => {
                type $p<'c> = select_option::SelectOptionProvider<'c>;
                $body
            }
            Kind::Status => {
                type $p<'c> = status::StatusProvider<'c>;
                $body
            }
            Kind::List => {
                type $p<'c> = list::ListProvider<'c>;
                $body
            }
            Kind::Record => {
                type $p<'c> = record::RecordProvider<'c>;
                $body
            }
            Kind::Entry => {
                type $p<'c> = entry::EntryProvider<'c>;
                $body
            }
            Kind::Note => {
                type $p<'c> = note::NoteProvider<'c>;
                $body
            }
            Kind::Task => {
                type $p<'c> = task::TaskProvider<'c>;
                $body
            }
            Kind::Webhook => {
                type $p<'c> = webhook::WebhookProvider<'c>;
                $body
            }
        }
    };
}

impl Kind {
    /// Every kind, in dependency order
    pub const ALL: [Kind; 10] = [
        Kind::Object,
        Kind::Attribute,
        Kind::SelectOption,
        Kind::Status,
        Kind::List,
        Kind::Record,
        Kind::Entry,
        Kind::Note,
        Kind::Task,
        Kind::Webhook,
    ];

    /// Name used in stack files and targets
    pub fn name(self) -> &'static str {
        dispatch!(self, P => <P<'_> as Provider>::KIND)
    }

    /// One-line description for `crmform kinds`
    pub fn description(self) -> &'static str {
        match self {
            Kind::Object => "Custom object type",
            Kind::Attribute => "Field on an object or list",
            Kind::SelectOption => "Choice of a select attribute",
            Kind::Status => "Stage of a status attribute",
            Kind::List => "Pipeline of records of one object",
            Kind::Record => "Record upserted on a matching attribute",
            Kind::Entry => "Record's entry in a list",
            Kind::Note => "Note attached to a record",
            Kind::Task => "Task linked to records",
            Kind::Webhook => "Outbound event subscription",
        }
    }

    /// Replacement triggers, update-eligible fields and delete strategy
    pub fn rules(self) -> KindRules {
        dispatch!(self, P => <P<'_> as Provider>::RULES)
    }

    /// Output fields that identify the remote object
    pub fn stable_fields(self) -> &'static [&'static str] {
        dispatch!(self, P => <P<'_> as Provider>::STABLE_FIELDS)
    }

    pub fn delete_strategy(self) -> DeleteStrategy {
        self.rules().delete
    }

    /// Decode declared properties, returning them in normalized form
    ///
    /// Static defaults are filled in, so two spellings of the same
    /// declaration normalize to the same value. Defaults derived from the
    /// prior declaration (a missing `api_slug`) are resolved when planning.
    pub fn validate(self, properties: &Value) -> Result<Value> {
        dispatch!(self, P => normalize::<P<'_>>(properties))
    }

    /// Declared fields that differ between two declarations
    pub fn changed_fields(self, news: &Value, olds: &Value) -> Result<Vec<String>> {
        dispatch!(self, P => changed::<P<'_>>(news, olds))
    }

    /// Decide what applying `news` over `prior` would do
    pub fn plan(
        self,
        client: &Client,
        news: &Value,
        prior: Option<(&Value, &Value)>,
    ) -> Result<Action> {
        dispatch!(self, P => plan_as(&P::new(client), news, prior))
    }

    /// Converge one declaration, returning the new output
    pub fn reconcile(
        self,
        client: &Client,
        news: &Value,
        prior: Option<(&Value, &Value)>,
        notes: &mut dyn Notifier,
    ) -> Result<Outcome<Value>> {
        dispatch!(self, P => reconcile_as(&P::new(client), news, prior, notes))
    }

    /// Remove a previously applied resource
    pub fn destroy(
        self,
        client: &Client,
        olds: &Value,
        output: &Value,
        notes: &mut dyn Notifier,
    ) -> Result<Removal> {
        dispatch!(self, P => destroy_as(&P::new(client), olds, output, notes))
    }

    /// Read live state for a recorded resource
    pub fn refresh(self, client: &Client, olds: &Value, output: &Value) -> Result<Drift<Value>> {
        dispatch!(self, P => refresh_as(&P::new(client), olds, output))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unknown kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource kind '{0}' (run `crmform kinds` for the list)")]
pub struct UnknownKind(pub String);

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

// =============================================================================
// JSON boundary
// =============================================================================

fn inputs<P: Provider>(value: &Value) -> Result<P::Inputs> {
    decode(value).map_err(|message| ProviderError::declaration(P::KIND, message))
}

fn output<P: Provider>(value: &Value) -> Result<P::Output> {
    decode(value).map_err(|message| ProviderError::InvalidOutput {
        kind: P::KIND,
        message,
    })
}

fn decode<T: DeserializeOwned>(value: &Value) -> std::result::Result<T, String> {
    T::deserialize(value).map_err(|e| e.to_string())
}

fn encode<P: Provider, T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ProviderError::InvalidOutput {
        kind: P::KIND,
        message: e.to_string(),
    })
}

fn prior<P: Provider>(
    prior: Option<(&Value, &Value)>,
) -> Result<Option<(P::Inputs, P::Output)>> {
    prior
        .map(|(olds, out)| Ok((inputs::<P>(olds)?, output::<P>(out)?)))
        .transpose()
}

fn normalize<P: Provider>(properties: &Value) -> Result<Value> {
    encode::<P, _>(&inputs::<P>(properties)?)
}

fn changed<P: Provider>(news: &Value, olds: &Value) -> Result<Vec<String>> {
    let (news, olds) = P::resolve(&inputs::<P>(news)?, &inputs::<P>(olds)?);
    Ok(declarative::changed_fields(&news, &olds))
}

/// Plan, refusing a replace the kind cannot carry out
fn feasible<P>(
    provider: &P,
    news: &P::Inputs,
    prior_state: Option<&(P::Inputs, P::Output)>,
) -> Result<Action>
where
    P: Provider<Error = ProviderError>,
{
    let action = declarative::plan(provider, news, prior_state.map(|(o, out)| (o, out)));
    match prior_state {
        Some((olds, _))
            if action == Action::Replace && !declarative::can_replace::<P>(news, olds) =>
        {
            Err(ProviderError::Unsupported {
                kind: P::KIND,
                operation: "replace",
            })
        }
        _ => Ok(action),
    }
}

fn plan_as<P>(provider: &P, news: &Value, prior_state: Option<(&Value, &Value)>) -> Result<Action>
where
    P: Provider<Error = ProviderError>,
{
    let news = inputs::<P>(news)?;
    let prior_state = prior::<P>(prior_state)?;
    feasible(provider, &news, prior_state.as_ref())
}

fn reconcile_as<P>(
    provider: &P,
    news: &Value,
    prior_state: Option<(&Value, &Value)>,
    notes: &mut dyn Notifier,
) -> Result<Outcome<Value>>
where
    P: Provider<Error = ProviderError>,
{
    let news = inputs::<P>(news)?;
    let prior_state = prior::<P>(prior_state)?;
    feasible(provider, &news, prior_state.as_ref())?;
    let outcome = declarative::reconcile(
        provider,
        &news,
        prior_state.as_ref().map(|(o, out)| (o, out)),
        notes,
    )?;
    let value = encode::<P, _>(outcome.output())?;
    Ok(outcome.map(|_| value))
}

fn destroy_as<P>(
    provider: &P,
    olds: &Value,
    out: &Value,
    notes: &mut dyn Notifier,
) -> Result<Removal>
where
    P: Provider<Error = ProviderError>,
{
    let olds = inputs::<P>(olds)?;
    let out = output::<P>(out)?;
    declarative::destroy(provider, &olds, &out, notes)
}

fn refresh_as<P>(provider: &P, olds: &Value, out: &Value) -> Result<Drift<Value>>
where
    P: Provider<Error = ProviderError>,
{
    let olds = inputs::<P>(olds)?;
    let out = output::<P>(out)?;
    match declarative::refresh(provider, &olds, &out)? {
        Drift::Current(live) => Ok(Drift::Current(encode::<P, _>(&live)?)),
        Drift::Replaced(live) => Ok(Drift::Replaced(encode::<P, _>(&live)?)),
        Drift::Gone => Ok(Drift::Gone),
    }
}

// =============================================================================
// Helpers shared by providers
// =============================================================================

/// Map a not-found failure to `None`
pub(crate) fn found<T>(result: crmkit::Result<T>) -> crmkit::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Outcome of a delete-like call: `true` if the object existed
pub(crate) fn gone(result: crmkit::Result<()>) -> crmkit::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Refuse to adopt an existing object that disagrees on `field`
pub(crate) fn ensure_same(
    kind: &'static str,
    name: &str,
    field: &'static str,
    declared: &str,
    found: &str,
) -> Result<()> {
    if declared == found {
        return Ok(());
    }
    log::warn!("{kind} {name}: existing {field} is {found}, declared {declared}");
    Err(ProviderError::Mismatch {
        kind,
        name: name.to_string(),
        field,
        declared: declared.to_string(),
        found: found.to_string(),
    })
}

/// Derive an api slug from a display title: `Deal Stage` becomes `deal_stage`
pub(crate) fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Render a JSON value for notes without quoting plain strings
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
