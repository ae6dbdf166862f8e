//! Planner - decides what reconciling each declaration would do

use crate::provider::Provider;
use crate::types::{Action, Decision, DeleteStrategy};

/// Decide the action for one declaration
///
/// `prior` is the last-applied declaration and its output; `None` means the
/// declaration was never applied.
pub fn plan<P: Provider>(
    provider: &P,
    news: &P::Inputs,
    prior: Option<(&P::Inputs, &P::Output)>,
) -> Action {
    match prior {
        None => Action::Create,
        Some((olds, _)) => match provider.diff(news, olds) {
            Some(Decision::Replace) => Action::Replace,
            Some(Decision::Update) => Action::Update,
            None => Action::NoOp,
        },
    }
}

/// Whether replacing `olds` with `news` can converge
///
/// A kind that cannot delete leaves the old object in place, so `create`
/// would find it again unless `news` addresses a different object.
pub fn can_replace<P: Provider>(news: &P::Inputs, olds: &P::Inputs) -> bool {
    match P::RULES.delete {
        DeleteStrategy::Unsupported => {
            let (news, olds) = P::resolve(news, olds);
            !P::same_address(&news, &olds)
        }
        DeleteStrategy::Hard | DeleteStrategy::Archive => true,
    }
}

/// Selection of resources by kind and name
///
/// Target format: `kind` or `kind.name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// Kind to match
    pub kind: Option<String>,
    /// Resource name to match exactly
    pub name: Option<String>,
}

impl Target {
    /// Parse a target string like `kind.name` into a selection
    pub fn parse(target: &str) -> Self {
        match target.split_once('.') {
            Some((kind, name)) => Self {
                kind: non_empty(kind),
                name: non_empty(name),
            },
            None => Self {
                kind: non_empty(target),
                name: None,
            },
        }
    }

    /// Build from an optional target string; `None` selects everything
    pub fn from_option(target: Option<&str>) -> Self {
        target.map(Self::parse).unwrap_or_default()
    }

    /// Check if a resource matches the selection
    pub fn matches(&self, kind: &str, name: &str) -> bool {
        if let Some(k) = &self.kind
            && k != kind
        {
            return false;
        }

        if let Some(n) = &self.name
            && n != name
        {
            return false;
        }

        true
    }

    /// Whether the selection matches everything
    pub fn is_all(&self) -> bool {
        self.kind.is_none() && self.name.is_none()
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
