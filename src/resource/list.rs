//! List resource - a pipeline of records of one parent object

use crmkit::{Client, CreateList, List, UpdateList};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, Result};
use super::{ensure_same, found, slugify};

const DEFAULT_WORKSPACE_ACCESS: &str = "full-access";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListInputs {
    pub name: String,
    /// Defaults to the name, slugified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_slug: Option<String>,
    pub parent_object: String,
    /// Sent on create only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_access: Option<String>,
}

impl ListInputs {
    pub fn slug(&self) -> String {
        self.api_slug
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOutput {
    pub list_id: String,
    pub api_slug: String,
    pub name: String,
    pub parent_object: String,
}

impl From<List> for ListOutput {
    fn from(list: List) -> Self {
        Self {
            list_id: list.list_id,
            api_slug: list.api_slug,
            name: list.name,
            parent_object: list.parent_object,
        }
    }
}

pub struct ListProvider<'a> {
    client: &'a Client,
}

impl<'a> ListProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Lists have no slug lookup that tolerates a renamed list, so search
    /// the full listing by slug first, then by name.
    fn search(&self, news: &ListInputs) -> Result<Option<List>> {
        let slug = news.slug();
        let lists = self.client.call("list_lists", |api| api.list_lists())?;
        let by_slug = lists.iter().position(|l| l.api_slug == slug);
        let index = by_slug.or_else(|| lists.iter().position(|l| l.name == news.name));
        Ok(index.map(|i| lists[i].clone()))
    }
}

impl Provider for ListProvider<'_> {
    type Inputs = ListInputs;
    type Output = ListOutput;
    type Error = ProviderError;

    const KIND: &'static str = "list";
    const STABLE_FIELDS: &'static [&'static str] = &["list_id", "api_slug", "parent_object"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["parent_object", "api_slug"]),
        update_on: Fields::Only(&["name"]),
        delete: DeleteStrategy::Unsupported,
    };

    /// A missing `api_slug` keeps the slug the list already has
    fn resolve(news: &ListInputs, olds: &ListInputs) -> (ListInputs, ListInputs) {
        let mut olds = olds.clone();
        olds.api_slug = Some(olds.slug());
        let mut news = news.clone();
        if news.api_slug.as_deref().is_none_or(str::is_empty) {
            news.api_slug.clone_from(&olds.api_slug);
        }
        (news, olds)
    }

    fn same_address(news: &ListInputs, olds: &ListInputs) -> bool {
        news.slug() == olds.slug()
    }

    fn read(
        &self,
        olds: Option<&ListInputs>,
        output: Option<&ListOutput>,
    ) -> Result<Option<ListOutput>> {
        let key = match (output, olds) {
            (Some(out), _) if !out.list_id.is_empty() => out.list_id.clone(),
            (Some(out), _) if !out.api_slug.is_empty() => out.api_slug.clone(),
            (_, Some(olds)) => return Ok(self.search(olds)?.map(ListOutput::from)),
            _ => return Ok(None),
        };
        let list = found(self.client.call("get_list", |api| api.get_list(&key)))?;
        Ok(list.map(ListOutput::from))
    }

    fn create(&self, news: &ListInputs, notes: &mut dyn Notifier) -> Result<ListOutput> {
        let slug = news.slug();
        if slug.is_empty() {
            return Err(ProviderError::declaration(
                Self::KIND,
                "api_slug or a name with letters or digits is required",
            ));
        }

        if let Some(existing) = self.search(news)? {
            ensure_same(
                Self::KIND,
                &slug,
                "parent_object",
                &news.parent_object,
                &existing.parent_object,
            )?;
            if news.api_slug.is_some() {
                ensure_same(Self::KIND, &slug, "api_slug", &slug, &existing.api_slug)?;
            }
            notes.note(&format!("Idempotent List: found existing {}", existing.api_slug));
            let output = ListOutput::from(existing);
            if output.name != news.name {
                return self.update(news, &output, notes);
            }
            return Ok(output);
        }

        let request = CreateList {
            name: news.name.clone(),
            api_slug: slug,
            parent_object: news.parent_object.clone(),
            workspace_access: news
                .workspace_access
                .clone()
                .unwrap_or_else(|| DEFAULT_WORKSPACE_ACCESS.to_string()),
            workspace_member_access: Vec::new(),
        };
        let created = self.client.call("create_list", |api| api.create_list(&request))?;
        notes.note(&format!("Created List: {}", created.api_slug));
        Ok(created.into())
    }

    fn update(
        &self,
        news: &ListInputs,
        output: &ListOutput,
        notes: &mut dyn Notifier,
    ) -> Result<ListOutput> {
        let key = if output.list_id.is_empty() {
            output.api_slug.as_str()
        } else {
            output.list_id.as_str()
        };
        if key.is_empty() {
            return Ok(output.clone());
        }

        let request = UpdateList {
            name: Some(news.name.clone()),
        };
        let updated = self.client.call("update_list", |api| api.update_list(key, &request))?;
        notes.note(&format!("Updated List: {}", updated.api_slug));
        Ok(updated.into())
    }

    fn delete(
        &self,
        _olds: &ListInputs,
        output: &ListOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        notes.note(&format!(
            "List {} cannot be deleted through the API; it remains in the workspace",
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

    fn pipeline() -> ListInputs {
        ListInputs {
            name: "Sales Pipeline".into(),
            api_slug: None,
            parent_object: "companies".into(),
            workspace_access: None,
        }
    }

    #[test]
    fn test_workspace_access_is_ignored_by_diff() {
        let (client, _) = client();
        let provider = ListProvider::new(&client);
        let mut news = pipeline();
        news.workspace_access = Some("read-only".into());

        assert_eq!(provider.diff(&news, &pipeline()), None);

        news.parent_object = "people".into();
        assert_eq!(provider.diff(&news, &pipeline()), Some(Decision::Replace));
    }

    #[test]
    fn test_explicit_derived_slug_is_no_change() {
        let (client, _) = client();
        let provider = ListProvider::new(&client);
        let mut explicit = pipeline();
        explicit.api_slug = Some("sales_pipeline".into());

        assert_eq!(provider.diff(&explicit, &pipeline()), None);
        assert_eq!(provider.diff(&pipeline(), &explicit), None);

        let mut renamed = pipeline();
        renamed.name = "Deals".into();
        assert_eq!(provider.diff(&renamed, &pipeline()), Some(Decision::Update));
    }

    #[test]
    fn test_parent_change_in_place_cannot_be_replaced() {
        let mut moved = pipeline();
        moved.parent_object = "people".into();
        assert!(!declarative::can_replace::<ListProvider<'_>>(&moved, &pipeline()));

        moved.api_slug = Some("people_pipeline".into());
        assert!(declarative::can_replace::<ListProvider<'_>>(&moved, &pipeline()));
    }

    #[test]
    fn test_create_derives_slug_and_is_idempotent() {
        let (client, mock) = client();
        let provider = ListProvider::new(&client);
        let mut notes = NoteBuffer::new();

        let first = provider.create(&pipeline(), &mut notes).unwrap();
        let second = provider.create(&pipeline(), &mut notes).unwrap();

        assert_eq!(first.api_slug, "sales_pipeline");
        assert_eq!(first, second);
        assert_eq!(mock.calls("create_list"), 1);
        assert!(notes.contains("Created List: sales_pipeline"));
        assert!(notes.contains("Idempotent List: found existing sales_pipeline"));
    }

    #[test]
    fn test_create_finds_by_name() {
        let (client, mock) = client();
        let provider = ListProvider::new(&client);
        let mut explicit = pipeline();
        explicit.api_slug = Some("deal_flow".into());
        let first = provider.create(&explicit, &mut NoteBuffer::new()).unwrap();

        let second = provider.create(&pipeline(), &mut NoteBuffer::new()).unwrap();

        assert_eq!(first.list_id, second.list_id);
        assert_eq!(second.api_slug, "deal_flow");
        assert_eq!(mock.calls("create_list"), 1);
    }

    #[test]
    fn test_create_rejects_parent_mismatch() {
        let (client, mock) = client();
        let provider = ListProvider::new(&client);
        provider.create(&pipeline(), &mut NoteBuffer::new()).unwrap();

        let mut news = pipeline();
        news.parent_object = "people".into();
        let err = provider.create(&news, &mut NoteBuffer::new()).unwrap_err();

        assert!(matches!(err, ProviderError::Mismatch { field: "parent_object", .. }));
        assert_eq!(mock.calls("create_list"), 1);
    }

    #[test]
    fn test_update_renames() {
        let (client, _) = client();
        let provider = ListProvider::new(&client);
        let output = provider.create(&pipeline(), &mut NoteBuffer::new()).unwrap();

        let mut news = pipeline();
        news.name = "Enterprise Pipeline".into();
        let updated = provider.update(&news, &output, &mut NoteBuffer::new()).unwrap();

        assert_eq!(updated.name, "Enterprise Pipeline");
        assert_eq!(updated.api_slug, "sales_pipeline");
        assert_eq!(provider.read(Some(&news), None).unwrap(), Some(updated));
    }

    #[test]
    fn test_delete_is_local_only() {
        let (client, mock) = client();
        let provider = ListProvider::new(&client);
        let output = provider.create(&pipeline(), &mut NoteBuffer::new()).unwrap();
        mock.reset_calls();

        let mut notes = NoteBuffer::new();
        provider.delete(&pipeline(), &output, &mut notes).unwrap();

        assert_eq!(mock.total_calls(), 0);
        assert!(notes.contains("cannot be deleted"));
        assert!(provider.read(None, Some(&output)).unwrap().is_some());
    }
}
