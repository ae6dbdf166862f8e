//! Status resource - one stage of a status attribute

use crmkit::{AttributeTarget, Client, CreateStatus, Status, UpdateStatus};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, Result};
use super::{found, gone};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusInputs {
    pub target: AttributeTarget,
    pub identifier: String,
    /// Slug or id of the status attribute
    pub attribute: String,
    pub title: String,
    #[serde(default)]
    pub celebration_enabled: bool,
    /// ISO 8601 duration, e.g. `P0Y0M14DT0H0M0S`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time_in_status: Option<String>,
}

impl StatusInputs {
    fn display_name(&self) -> String {
        format!("{}.{}/{}", self.identifier, self.attribute, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOutput {
    pub status_id: String,
    pub target: AttributeTarget,
    pub identifier: String,
    pub attribute: String,
    pub title: String,
    pub celebration_enabled: bool,
    pub target_time_in_status: Option<String>,
}

/// Where a status lives
struct Parent<'p> {
    target: AttributeTarget,
    identifier: &'p str,
    attribute: &'p str,
}

impl StatusOutput {
    fn from_remote(parent: &Parent<'_>, status: Status) -> Self {
        Self {
            status_id: status.status_id,
            target: parent.target,
            identifier: parent.identifier.to_string(),
            attribute: parent.attribute.to_string(),
            title: status.title,
            celebration_enabled: status.celebration_enabled,
            target_time_in_status: status.target_time_in_status,
        }
    }

    fn parent(&self) -> Parent<'_> {
        Parent {
            target: self.target,
            identifier: &self.identifier,
            attribute: &self.attribute,
        }
    }

    fn key(&self) -> &str {
        if self.status_id.is_empty() {
            &self.title
        } else {
            &self.status_id
        }
    }

    fn differs_from(&self, news: &StatusInputs) -> bool {
        self.title != news.title
            || self.celebration_enabled != news.celebration_enabled
            || (news.target_time_in_status.is_some()
                && self.target_time_in_status != news.target_time_in_status)
    }
}

impl StatusInputs {
    fn parent(&self) -> Parent<'_> {
        Parent {
            target: self.target,
            identifier: &self.identifier,
            attribute: &self.attribute,
        }
    }
}

pub struct StatusProvider<'a> {
    client: &'a Client,
}

impl<'a> StatusProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn statuses(&self, parent: &Parent<'_>, show_archived: bool) -> Result<Option<Vec<Status>>> {
        let statuses = self.client.call("list_statuses", |api| {
            api.list_statuses(parent.target, parent.identifier, parent.attribute, show_archived)
        });
        Ok(found(statuses)?)
    }

    fn set(
        &self,
        parent: &Parent<'_>,
        status: &str,
        request: &UpdateStatus,
    ) -> crmkit::Result<Status> {
        self.client.call("update_status", |api| {
            api.update_status(parent.target, parent.identifier, parent.attribute, status, request)
        })
    }
}

impl Provider for StatusProvider<'_> {
    type Inputs = StatusInputs;
    type Output = StatusOutput;
    type Error = ProviderError;

    const KIND: &'static str = "status";
    const STABLE_FIELDS: &'static [&'static str] =
        &["status_id", "target", "identifier", "attribute"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["target", "identifier", "attribute"]),
        update_on: Fields::Only(&["title", "celebration_enabled", "target_time_in_status"]),
        delete: DeleteStrategy::Archive,
    };

    fn read(
        &self,
        olds: Option<&StatusInputs>,
        output: Option<&StatusOutput>,
    ) -> Result<Option<StatusOutput>> {
        let (parent, title) = match (output, olds) {
            (Some(out), _) => (out.parent(), out.title.as_str()),
            (None, Some(olds)) => (olds.parent(), olds.title.as_str()),
            (None, None) => return Ok(None),
        };
        let Some(statuses) = self.statuses(&parent, false)? else {
            return Ok(None);
        };
        let hit = match output.filter(|o| !o.status_id.is_empty()) {
            Some(out) => statuses.into_iter().find(|s| s.status_id == out.status_id),
            None => statuses.into_iter().find(|s| s.title == title),
        };
        Ok(hit.map(|s| StatusOutput::from_remote(&parent, s)))
    }

    fn create(&self, news: &StatusInputs, notes: &mut dyn Notifier) -> Result<StatusOutput> {
        let name = news.display_name();
        let parent = news.parent();
        let existing = self
            .statuses(&parent, true)?
            .and_then(|statuses| statuses.into_iter().find(|s| s.title == news.title));

        if let Some(existing) = existing {
            let existing = if existing.is_archived {
                let request = UpdateStatus {
                    is_archived: Some(false),
                    ..Default::default()
                };
                let restored = self.set(&parent, &existing.status_id, &request)?;
                notes.note(&format!("Unarchived Status: {name}"));
                restored
            } else {
                existing
            };
            notes.note(&format!("Idempotent Status: found existing {name}"));
            let output = StatusOutput::from_remote(&parent, existing);
            if output.differs_from(news) {
                return self.update(news, &output, notes);
            }
            return Ok(output);
        }

        let request = CreateStatus {
            title: news.title.clone(),
            celebration_enabled: news.celebration_enabled,
            target_time_in_status: news.target_time_in_status.clone(),
        };
        let created = self.client.call("create_status", |api| {
            api.create_status(news.target, &news.identifier, &news.attribute, &request)
        })?;
        notes.note(&format!("Created Status: {name}"));
        Ok(StatusOutput::from_remote(&parent, created))
    }

    fn update(
        &self,
        news: &StatusInputs,
        output: &StatusOutput,
        notes: &mut dyn Notifier,
    ) -> Result<StatusOutput> {
        if output.key().is_empty() {
            return Ok(output.clone());
        }
        let request = UpdateStatus {
            title: Some(news.title.clone()),
            celebration_enabled: Some(news.celebration_enabled),
            target_time_in_status: Some(news.target_time_in_status.clone()),
            is_archived: None,
        };
        let parent = output.parent();
        let updated = self.set(&parent, output.key(), &request)?;
        notes.note(&format!("Updated Status: {}", news.display_name()));
        Ok(StatusOutput::from_remote(&parent, updated))
    }

    fn delete(
        &self,
        olds: &StatusInputs,
        output: &StatusOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        let name = olds.display_name();
        let request = UpdateStatus {
            is_archived: Some(true),
            ..Default::default()
        };
        let existed = gone(self.set(&output.parent(), output.key(), &request).map(|_| ()))?;
        if existed {
            notes.note(&format!("Archived Status: {name}"));
        } else {
            notes.note(&format!("Already absent Status: {name}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{client, seed_attribute};
    use declarative::{Decision, NoteBuffer};

    fn stage(title: &str) -> StatusInputs {
        StatusInputs {
            target: AttributeTarget::Objects,
            identifier: "companies".into(),
            attribute: "stage".into(),
            title: title.into(),
            celebration_enabled: false,
            target_time_in_status: None,
        }
    }

    #[test]
    fn test_diff() {
        let (client, _) = client();
        let provider = StatusProvider::new(&client);
        let mut won = stage("Won");
        won.celebration_enabled = true;

        assert_eq!(provider.diff(&won, &stage("Won")), Some(Decision::Update));
        won.identifier = "deals".into();
        assert_eq!(provider.diff(&won, &stage("Won")), Some(Decision::Replace));
    }

    #[test]
    fn test_create_adopts_and_converges() {
        let (client, mock) = client();
        seed_attribute(&mock, "stage", "status");
        let provider = StatusProvider::new(&client);
        provider.create(&stage("Won"), &mut NoteBuffer::new()).unwrap();

        let mut won = stage("Won");
        won.celebration_enabled = true;
        let mut notes = NoteBuffer::new();
        let output = provider.create(&won, &mut notes).unwrap();

        assert!(output.celebration_enabled);
        assert_eq!(mock.calls("create_status"), 1);
        assert!(notes.contains("Idempotent Status: found existing companies.stage/Won"));
        assert!(notes.contains("Updated Status"));
    }

    #[test]
    fn test_archive_roundtrip() {
        let (client, mock) = client();
        seed_attribute(&mock, "stage", "status");
        let provider = StatusProvider::new(&client);
        let output = provider.create(&stage("Lost"), &mut NoteBuffer::new()).unwrap();

        let mut notes = NoteBuffer::new();
        provider.delete(&stage("Lost"), &output, &mut notes).unwrap();
        assert!(notes.contains("Archived Status"));
        assert_eq!(provider.read(Some(&stage("Lost")), Some(&output)).unwrap(), None);

        let restored = provider.create(&stage("Lost"), &mut notes).unwrap();
        assert_eq!(restored.status_id, output.status_id);
        assert!(notes.contains("Unarchived Status"));
    }

    #[test]
    fn test_update_clears_removed_target_time() {
        let (client, mock) = client();
        seed_attribute(&mock, "stage", "status");
        let provider = StatusProvider::new(&client);
        let mut timed = stage("Lead");
        timed.target_time_in_status = Some("P1D".into());
        let output = provider.create(&timed, &mut NoteBuffer::new()).unwrap();
        assert_eq!(output.target_time_in_status.as_deref(), Some("P1D"));

        assert_eq!(provider.diff(&stage("Lead"), &timed), Some(Decision::Update));
        let updated = provider.update(&stage("Lead"), &output, &mut NoteBuffer::new()).unwrap();

        assert_eq!(updated.target_time_in_status, None);
        let live = provider.read(Some(&stage("Lead")), Some(&updated)).unwrap().unwrap();
        assert_eq!(live.target_time_in_status, None);
    }

    #[test]
    fn test_read_by_title_without_output() {
        let (client, mock) = client();
        seed_attribute(&mock, "stage", "status");
        let provider = StatusProvider::new(&client);
        let output = provider.create(&stage("Lead"), &mut NoteBuffer::new()).unwrap();

        assert_eq!(provider.read(Some(&stage("Lead")), None).unwrap(), Some(output));
        assert_eq!(provider.read(Some(&stage("Nope")), None).unwrap(), None);
    }
}
