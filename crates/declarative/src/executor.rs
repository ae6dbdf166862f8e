//! Execution - drives a provider from a decision to the remote calls it needs

use crate::context::Notifier;
use crate::diff::stable_identity;
use crate::planner::plan;
use crate::provider::Provider;
use crate::types::{Action, DeleteStrategy, Drift, Outcome, Removal};

/// Reconcile one declaration against its prior state
///
/// Runs `diff`, then at most one of: `update`, `delete` followed by
/// `create`, or nothing. A never-applied declaration is created.
///
/// # Errors
///
/// Returns the provider's error from whichever operation failed. A failed
/// delete during a replace leaves the old object in place and skips create.
pub fn reconcile<P: Provider>(
    provider: &P,
    news: &P::Inputs,
    prior: Option<(&P::Inputs, &P::Output)>,
    notes: &mut dyn Notifier,
) -> Result<Outcome<P::Output>, P::Error> {
    let action = plan(provider, news, prior);
    log::debug!("{}: {action}", P::KIND);

    match (action, prior) {
        (Action::Update, Some((_, output))) => {
            provider.update(news, output, notes).map(Outcome::Updated)
        }
        (Action::Replace, Some((olds, output))) => {
            provider.delete(olds, output, notes)?;
            provider.create(news, notes).map(Outcome::Replaced)
        }
        (Action::NoOp, Some((_, output))) => Ok(Outcome::Unchanged(output.clone())),
        _ => provider.create(news, notes).map(Outcome::Created),
    }
}

/// Remove a previously applied resource
///
/// # Errors
///
/// Returns the provider's delete error; an already-absent object is not
/// an error.
pub fn destroy<P: Provider>(
    provider: &P,
    olds: &P::Inputs,
    output: &P::Output,
    notes: &mut dyn Notifier,
) -> Result<Removal, P::Error> {
    provider.delete(olds, output, notes)?;
    Ok(match P::RULES.delete {
        DeleteStrategy::Unsupported => Removal::Forgotten,
        DeleteStrategy::Hard | DeleteStrategy::Archive => Removal::Deleted,
    })
}

/// Read live state and compare its identity with the recorded output
///
/// # Errors
///
/// Returns the provider's read error. Not-found is reported as
/// [`Drift::Gone`].
pub fn refresh<P: Provider>(
    provider: &P,
    olds: &P::Inputs,
    output: &P::Output,
) -> Result<Drift<P::Output>, P::Error> {
    let Some(live) = provider.read(Some(olds), Some(output))? else {
        return Ok(Drift::Gone);
    };

    let fields = provider.stable_fields();
    if stable_identity(&live, fields) == stable_identity(output, fields) {
        Ok(Drift::Current(live))
    } else {
        Ok(Drift::Replaced(live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{NoNotes, NoteBuffer};
    use crate::types::{Fields, KindRules};
    use serde::{Deserialize, Serialize};
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    #[derive(Debug, thiserror::Error)]
    #[error("test provider failure: {0}")]
    struct TestError(String);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TagInputs {
        name: String,
        color: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TagOutput {
        tag_id: u32,
        name: String,
        color: String,
    }

    #[derive(Default)]
    struct TagProvider {
        remote: RefCell<BTreeMap<u32, TagOutput>>,
        next_id: RefCell<u32>,
        calls: RefCell<Vec<&'static str>>,
        fail_delete: bool,
    }

    impl Provider for TagProvider {
        type Inputs = TagInputs;
        type Output = TagOutput;
        type Error = TestError;

        const KIND: &'static str = "tag";
        const STABLE_FIELDS: &'static [&'static str] = &["tag_id"];
        const RULES: KindRules = KindRules {
            replace_on: Fields::Only(&["name"]),
            update_on: Fields::Only(&["color"]),
            delete: DeleteStrategy::Hard,
        };

        fn read(
            &self,
            _olds: Option<&TagInputs>,
            output: Option<&TagOutput>,
        ) -> Result<Option<TagOutput>, TestError> {
            self.calls.borrow_mut().push("read");
            Ok(output.and_then(|o| self.remote.borrow().get(&o.tag_id).cloned()))
        }

        fn create(&self, news: &TagInputs, notes: &mut dyn Notifier) -> Result<TagOutput, TestError> {
            self.calls.borrow_mut().push("create");
            if let Some(found) = self.remote.borrow().values().find(|t| t.name == news.name) {
                notes.note(&format!("Idempotent Tag: found existing {}", news.name));
                return Ok(found.clone());
            }
            let mut next_id = self.next_id.borrow_mut();
            *next_id += 1;
            let tag = TagOutput {
                tag_id: *next_id,
                name: news.name.clone(),
                color: news.color.clone(),
            };
            self.remote.borrow_mut().insert(tag.tag_id, tag.clone());
            notes.note(&format!("Created Tag: {}", news.name));
            Ok(tag)
        }

        fn update(
            &self,
            news: &TagInputs,
            output: &TagOutput,
            _notes: &mut dyn Notifier,
        ) -> Result<TagOutput, TestError> {
            self.calls.borrow_mut().push("update");
            let mut remote = self.remote.borrow_mut();
            let tag = remote
                .get_mut(&output.tag_id)
                .ok_or_else(|| TestError("gone".into()))?;
            tag.color.clone_from(&news.color);
            Ok(tag.clone())
        }

        fn delete(
            &self,
            _olds: &TagInputs,
            output: &TagOutput,
            _notes: &mut dyn Notifier,
        ) -> Result<(), TestError> {
            self.calls.borrow_mut().push("delete");
            if self.fail_delete {
                return Err(TestError("delete refused".into()));
            }
            self.remote.borrow_mut().remove(&output.tag_id);
            Ok(())
        }
    }

    fn tag(name: &str, color: &str) -> TagInputs {
        TagInputs {
            name: name.into(),
            color: color.into(),
        }
    }

    #[test]
    fn test_reconcile_creates_when_never_applied() {
        let provider = TagProvider::default();
        let mut notes = NoteBuffer::new();

        let outcome = reconcile(&provider, &tag("vip", "red"), None, &mut notes).unwrap();

        assert!(matches!(outcome, Outcome::Created(_)));
        assert!(notes.contains("Created Tag: vip"));
    }

    #[test]
    fn test_reconcile_noop_makes_no_calls() {
        let provider = TagProvider::default();
        let inputs = tag("vip", "red");
        let output = reconcile(&provider, &inputs, None, &mut NoNotes)
            .unwrap()
            .into_output();
        provider.calls.borrow_mut().clear();

        let outcome = reconcile(&provider, &inputs, Some((&inputs, &output)), &mut NoNotes).unwrap();

        assert_eq!(outcome, Outcome::Unchanged(output));
        assert!(provider.calls.borrow().is_empty());
    }

    #[test]
    fn test_reconcile_update_and_replace() {
        let provider = TagProvider::default();
        let olds = tag("vip", "red");
        let output = reconcile(&provider, &olds, None, &mut NoNotes)
            .unwrap()
            .into_output();

        let recolored = tag("vip", "blue");
        let outcome =
            reconcile(&provider, &recolored, Some((&olds, &output)), &mut NoNotes).unwrap();
        assert!(matches!(outcome, Outcome::Updated(ref o) if o.tag_id == output.tag_id));

        let renamed = tag("gold", "blue");
        let outcome = reconcile(&provider, &renamed, Some((&recolored, outcome.output())), &mut NoNotes)
            .unwrap();
        assert!(matches!(outcome, Outcome::Replaced(ref o) if o.tag_id != output.tag_id));
        assert_eq!(provider.remote.borrow().len(), 1);
    }

    #[test]
    fn test_replace_skips_create_when_delete_fails() {
        let provider = TagProvider {
            fail_delete: true,
            ..Default::default()
        };
        let olds = tag("vip", "red");
        let output = reconcile(&provider, &olds, None, &mut NoNotes)
            .unwrap()
            .into_output();
        provider.calls.borrow_mut().clear();

        let result = reconcile(&provider, &tag("gold", "red"), Some((&olds, &output)), &mut NoNotes);

        assert!(result.is_err());
        assert_eq!(*provider.calls.borrow(), vec!["delete"]);
    }

    #[test]
    fn test_destroy_reports_deleted() {
        let provider = TagProvider::default();
        let inputs = tag("vip", "red");
        let output = reconcile(&provider, &inputs, None, &mut NoNotes)
            .unwrap()
            .into_output();

        assert_eq!(
            destroy(&provider, &inputs, &output, &mut NoNotes).unwrap(),
            Removal::Deleted
        );
        assert!(provider.remote.borrow().is_empty());
    }

    #[test]
    fn test_refresh_detects_gone_and_replaced() {
        let provider = TagProvider::default();
        let inputs = tag("vip", "red");
        let output = reconcile(&provider, &inputs, None, &mut NoNotes)
            .unwrap()
            .into_output();

        assert!(matches!(
            refresh(&provider, &inputs, &output).unwrap(),
            Drift::Current(_)
        ));

        provider.remote.borrow_mut().clear();
        assert_eq!(refresh(&provider, &inputs, &output).unwrap(), Drift::Gone);
    }
}
