//! Select option resource - one choice of a select attribute

use crmkit::{AttributeTarget, Client, CreateSelectOption, SelectOption, UpdateSelectOption};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, Result};
use super::{found, gone};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectOptionInputs {
    pub target: AttributeTarget,
    pub identifier: String,
    /// Slug or id of the select attribute
    pub attribute: String,
    pub title: String,
}

impl SelectOptionInputs {
    fn display_name(&self) -> String {
        format!("{}.{}/{}", self.identifier, self.attribute, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOptionOutput {
    pub option_id: String,
    pub target: AttributeTarget,
    pub identifier: String,
    pub attribute: String,
    pub title: String,
}

impl SelectOptionOutput {
    fn from_remote(parent: &SelectOptionInputs, option: SelectOption) -> Self {
        Self {
            option_id: option.option_id,
            target: parent.target,
            identifier: parent.identifier.clone(),
            attribute: parent.attribute.clone(),
            title: option.title,
        }
    }

    /// The parent address, as a declaration
    fn parent(&self) -> SelectOptionInputs {
        SelectOptionInputs {
            target: self.target,
            identifier: self.identifier.clone(),
            attribute: self.attribute.clone(),
            title: self.title.clone(),
        }
    }

    fn key(&self) -> &str {
        if self.option_id.is_empty() {
            &self.title
        } else {
            &self.option_id
        }
    }
}

pub struct SelectOptionProvider<'a> {
    client: &'a Client,
}

impl<'a> SelectOptionProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Options of the parent attribute; `None` when the attribute is gone
    fn options(
        &self,
        parent: &SelectOptionInputs,
        show_archived: bool,
    ) -> Result<Option<Vec<SelectOption>>> {
        let options = self.client.call("list_select_options", |api| {
            api.list_select_options(
                parent.target,
                &parent.identifier,
                &parent.attribute,
                show_archived,
            )
        });
        Ok(found(options)?)
    }

    fn set(
        &self,
        parent: &SelectOptionInputs,
        option: &str,
        request: &UpdateSelectOption,
    ) -> crmkit::Result<SelectOption> {
        self.client.call("update_select_option", |api| {
            api.update_select_option(
                parent.target,
                &parent.identifier,
                &parent.attribute,
                option,
                request,
            )
        })
    }
}

impl Provider for SelectOptionProvider<'_> {
    type Inputs = SelectOptionInputs;
    type Output = SelectOptionOutput;
    type Error = ProviderError;

    const KIND: &'static str = "select_option";
    const STABLE_FIELDS: &'static [&'static str] =
        &["option_id", "target", "identifier", "attribute"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["target", "identifier", "attribute"]),
        update_on: Fields::Only(&["title"]),
        delete: DeleteStrategy::Archive,
    };

    fn read(
        &self,
        olds: Option<&SelectOptionInputs>,
        output: Option<&SelectOptionOutput>,
    ) -> Result<Option<SelectOptionOutput>> {
        let parent = match (output, olds) {
            (Some(out), _) => out.parent(),
            (None, Some(olds)) => olds.clone(),
            (None, None) => return Ok(None),
        };
        let Some(options) = self.options(&parent, false)? else {
            return Ok(None);
        };
        let hit = match output.filter(|o| !o.option_id.is_empty()) {
            Some(out) => options.into_iter().find(|o| o.option_id == out.option_id),
            None => options.into_iter().find(|o| o.title == parent.title),
        };
        Ok(hit.map(|o| SelectOptionOutput::from_remote(&parent, o)))
    }

    fn create(
        &self,
        news: &SelectOptionInputs,
        notes: &mut dyn Notifier,
    ) -> Result<SelectOptionOutput> {
        let name = news.display_name();
        let existing = self
            .options(news, true)?
            .and_then(|options| options.into_iter().find(|o| o.title == news.title));

        if let Some(existing) = existing {
            let existing = if existing.is_archived {
                let request = UpdateSelectOption {
                    is_archived: Some(false),
                    ..Default::default()
                };
                let restored = self.set(news, &existing.option_id, &request)?;
                notes.note(&format!("Unarchived SelectOption: {name}"));
                restored
            } else {
                existing
            };
            notes.note(&format!("Idempotent SelectOption: found existing {name}"));
            return Ok(SelectOptionOutput::from_remote(news, existing));
        }

        let request = CreateSelectOption {
            title: news.title.clone(),
        };
        let created = self.client.call("create_select_option", |api| {
            api.create_select_option(news.target, &news.identifier, &news.attribute, &request)
        })?;
        notes.note(&format!("Created SelectOption: {name}"));
        Ok(SelectOptionOutput::from_remote(news, created))
    }

    fn update(
        &self,
        news: &SelectOptionInputs,
        output: &SelectOptionOutput,
        notes: &mut dyn Notifier,
    ) -> Result<SelectOptionOutput> {
        if output.key().is_empty() {
            return Ok(output.clone());
        }
        let request = UpdateSelectOption {
            title: Some(news.title.clone()),
            is_archived: None,
        };
        let updated = self.set(&output.parent(), output.key(), &request)?;
        notes.note(&format!(
            "Updated SelectOption: {} -> {}",
            output.title, updated.title
        ));
        Ok(SelectOptionOutput::from_remote(&output.parent(), updated))
    }

    fn delete(
        &self,
        olds: &SelectOptionInputs,
        output: &SelectOptionOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        let name = olds.display_name();
        let request = UpdateSelectOption {
            is_archived: Some(true),
            ..Default::default()
        };
        let existed = gone(self.set(&output.parent(), output.key(), &request).map(|_| ()))?;
        if existed {
            notes.note(&format!("Archived SelectOption: {name}"));
        } else {
            notes.note(&format!("Already absent SelectOption: {name}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{client, seed_attribute};
    use declarative::{Decision, NoteBuffer};

    fn option(title: &str) -> SelectOptionInputs {
        SelectOptionInputs {
            target: AttributeTarget::Objects,
            identifier: "companies".into(),
            attribute: "tier".into(),
            title: title.into(),
        }
    }

    #[test]
    fn test_diff() {
        let (client, _) = client();
        let provider = SelectOptionProvider::new(&client);
        assert_eq!(provider.diff(&option("Gold"), &option("Silver")), Some(Decision::Update));

        let mut moved = option("Gold");
        moved.attribute = "segment".into();
        assert_eq!(provider.diff(&moved, &option("Gold")), Some(Decision::Replace));
    }

    #[test]
    fn test_create_is_idempotent() {
        let (client, mock) = client();
        seed_attribute(&mock, "tier", "select");
        let provider = SelectOptionProvider::new(&client);
        let mut notes = NoteBuffer::new();

        let first = provider.create(&option("Gold"), &mut notes).unwrap();
        let second = provider.create(&option("Gold"), &mut notes).unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls("create_select_option"), 1);
        assert!(notes.contains("Created SelectOption: companies.tier/Gold"));
        assert!(notes.contains("Idempotent SelectOption"));
    }

    #[test]
    fn test_delete_archives_and_create_restores() {
        let (client, mock) = client();
        seed_attribute(&mock, "tier", "select");
        let provider = SelectOptionProvider::new(&client);
        let output = provider.create(&option("Gold"), &mut NoteBuffer::new()).unwrap();

        let mut notes = NoteBuffer::new();
        provider.delete(&option("Gold"), &output, &mut notes).unwrap();
        assert!(notes.contains("Archived SelectOption"));
        assert_eq!(provider.read(None, Some(&output)).unwrap(), None);

        let restored = provider.create(&option("Gold"), &mut notes).unwrap();
        assert_eq!(restored.option_id, output.option_id);
        assert!(notes.contains("Unarchived SelectOption"));
        assert_eq!(mock.calls("create_select_option"), 1);
    }

    #[test]
    fn test_update_renames_by_id() {
        let (client, mock) = client();
        seed_attribute(&mock, "tier", "select");
        let provider = SelectOptionProvider::new(&client);
        let output = provider.create(&option("Gold"), &mut NoteBuffer::new()).unwrap();

        let updated = provider
            .update(&option("Platinum"), &output, &mut NoteBuffer::new())
            .unwrap();

        assert_eq!(updated.option_id, output.option_id);
        assert_eq!(updated.title, "Platinum");
        assert_eq!(provider.read(None, Some(&updated)).unwrap(), Some(updated));
    }

    #[test]
    fn test_wrong_attribute_type_is_validation() {
        let (client, mock) = client();
        seed_attribute(&mock, "tier", "text");
        let provider = SelectOptionProvider::new(&client);

        let err = provider.create(&option("Gold"), &mut NoteBuffer::new()).unwrap_err();

        assert_eq!(err.tag(), "validation");
    }

    #[test]
    fn test_delete_missing_attribute_is_absent() {
        let (client, _) = client();
        let provider = SelectOptionProvider::new(&client);
        let output = SelectOptionOutput {
            option_id: "gone".into(),
            target: AttributeTarget::Objects,
            identifier: "companies".into(),
            attribute: "tier".into(),
            title: "Gold".into(),
        };

        let mut notes = NoteBuffer::new();
        provider.delete(&option("Gold"), &output, &mut notes).unwrap();

        assert!(notes.contains("Already absent SelectOption"));
    }
}
