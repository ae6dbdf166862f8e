//! Object resource - a custom object type (e.g. `deals`)

use crmkit::{Client, CreateObject, Object, UpdateObject};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, Result};
use super::found;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectInputs {
    pub api_slug: String,
    pub singular_noun: String,
    pub plural_noun: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectOutput {
    pub object_id: String,
    pub api_slug: String,
    pub singular_noun: String,
    pub plural_noun: String,
}

impl From<Object> for ObjectOutput {
    fn from(object: Object) -> Self {
        Self {
            object_id: object.object_id,
            api_slug: object.api_slug,
            singular_noun: object.singular_noun,
            plural_noun: object.plural_noun,
        }
    }
}

/// Objects cannot be deleted through the API.
pub struct ObjectProvider<'a> {
    client: &'a Client,
}

impl<'a> ObjectProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn lookup(&self, object: &str) -> Result<Option<Object>> {
        Ok(found(self.client.call("get_object", |api| api.get_object(object)))?)
    }
}

impl Provider for ObjectProvider<'_> {
    type Inputs = ObjectInputs;
    type Output = ObjectOutput;
    type Error = ProviderError;

    const KIND: &'static str = "object";
    const STABLE_FIELDS: &'static [&'static str] = &["object_id", "api_slug"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["api_slug"]),
        update_on: Fields::Only(&["singular_noun", "plural_noun"]),
        delete: DeleteStrategy::Unsupported,
    };

    fn read(
        &self,
        olds: Option<&ObjectInputs>,
        output: Option<&ObjectOutput>,
    ) -> Result<Option<ObjectOutput>> {
        let key = match (output, olds) {
            (Some(out), _) if !out.object_id.is_empty() => out.object_id.as_str(),
            (_, Some(olds)) => olds.api_slug.as_str(),
            _ => return Ok(None),
        };
        Ok(self.lookup(key)?.map(ObjectOutput::from))
    }

    fn create(&self, news: &ObjectInputs, notes: &mut dyn Notifier) -> Result<ObjectOutput> {
        if news.api_slug.is_empty() {
            return Err(ProviderError::declaration(Self::KIND, "api_slug must not be empty"));
        }

        if let Some(existing) = self.lookup(&news.api_slug)? {
            notes.note(&format!("Idempotent Object: found existing {}", news.api_slug));
            let output = ObjectOutput::from(existing);
            if output.singular_noun != news.singular_noun || output.plural_noun != news.plural_noun
            {
                return self.update(news, &output, notes);
            }
            return Ok(output);
        }

        let request = CreateObject {
            api_slug: news.api_slug.clone(),
            singular_noun: news.singular_noun.clone(),
            plural_noun: news.plural_noun.clone(),
        };
        let created = self.client.call("create_object", |api| api.create_object(&request))?;
        notes.note(&format!("Created Object: {}", created.api_slug));
        Ok(created.into())
    }

    fn update(
        &self,
        news: &ObjectInputs,
        output: &ObjectOutput,
        notes: &mut dyn Notifier,
    ) -> Result<ObjectOutput> {
        let key = if output.object_id.is_empty() {
            output.api_slug.as_str()
        } else {
            output.object_id.as_str()
        };
        if key.is_empty() {
            return Ok(output.clone());
        }

        let request = UpdateObject {
            singular_noun: Some(news.singular_noun.clone()),
            plural_noun: Some(news.plural_noun.clone()),
        };
        let updated = self
            .client
            .call("update_object", |api| api.update_object(key, &request))?;
        notes.note(&format!("Updated Object: {}", updated.api_slug));
        Ok(updated.into())
    }

    fn delete(
        &self,
        _olds: &ObjectInputs,
        output: &ObjectOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        notes.note(&format!(
            "Object {} cannot be deleted through the API; it remains in the workspace",
            output.api_slug
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::client;
    use declarative::{Decision, NoteBuffer};

    fn deals() -> ObjectInputs {
        ObjectInputs {
            api_slug: "deals".into(),
            singular_noun: "Deal".into(),
            plural_noun: "Deals".into(),
        }
    }

    #[test]
    fn test_diff() {
        let (client, _) = client();
        let provider = ObjectProvider::new(&client);
        let mut news = deals();
        news.plural_noun = "Opportunities".into();
        assert_eq!(provider.diff(&news, &deals()), Some(Decision::Update));

        news.api_slug = "opportunities".into();
        assert_eq!(provider.diff(&news, &deals()), Some(Decision::Replace));
    }

    #[test]
    fn test_create_is_idempotent() {
        let (client, mock) = client();
        let provider = ObjectProvider::new(&client);
        let mut notes = NoteBuffer::new();

        let first = provider.create(&deals(), &mut notes).unwrap();
        let second = provider.create(&deals(), &mut notes).unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls("create_object"), 1);
        assert_eq!(mock.calls("update_object"), 0);
        assert!(notes.contains("Idempotent Object: found existing deals"));
    }

    #[test]
    fn test_adopting_standard_object_converges_nouns() {
        let (client, mock) = client();
        let provider = ObjectProvider::new(&client);
        let news = ObjectInputs {
            api_slug: "companies".into(),
            singular_noun: "Account".into(),
            plural_noun: "Accounts".into(),
        };

        let output = provider.create(&news, &mut NoteBuffer::new()).unwrap();

        assert_eq!(output.singular_noun, "Account");
        assert_eq!(mock.calls("create_object"), 0);
        assert_eq!(mock.calls("update_object"), 1);
    }

    #[test]
    fn test_read_by_id_and_slug() {
        let (client, _) = client();
        let provider = ObjectProvider::new(&client);
        let output = provider.create(&deals(), &mut NoteBuffer::new()).unwrap();

        assert_eq!(provider.read(None, Some(&output)).unwrap(), Some(output.clone()));
        assert_eq!(provider.read(Some(&deals()), None).unwrap(), Some(output));

        let mut missing = deals();
        missing.api_slug = "unicorns".into();
        assert_eq!(provider.read(Some(&missing), None).unwrap(), None);
        assert_eq!(provider.read(None, None).unwrap(), None);
    }

    #[test]
    fn test_delete_makes_no_calls_and_notes() {
        let (client, mock) = client();
        let provider = ObjectProvider::new(&client);
        let output = provider.create(&deals(), &mut NoteBuffer::new()).unwrap();
        mock.reset_calls();

        let mut notes = NoteBuffer::new();
        provider.delete(&deals(), &output, &mut notes).unwrap();
        provider.delete(&deals(), &output, &mut notes).unwrap();

        assert_eq!(mock.total_calls(), 0);
        assert_eq!(notes.notes().len(), 2);
        assert!(notes.contains("Object deals cannot be deleted"));
    }
}
