//! Note resource - an immutable note attached to a record
//!
//! Notes cannot be edited through the API, so every declared change is a
//! replace. There is no lookup by content either: finding an existing note
//! means scanning the parent record's notes page by page.

use crmkit::{Client, CreateNote, Note, NoteQuery, is_uuid};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, Result};
use super::search::find_first;
use super::{found, gone};

fn default_format() -> String {
    "plaintext".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteInputs {
    pub parent_object: String,
    pub parent_record_id: String,
    pub title: String,
    /// `plaintext` or `markdown`
    #[serde(default = "default_format")]
    pub format: String,
    pub content: String,
}

impl NoteInputs {
    fn display_name(&self) -> String {
        format!("{} on {}/{}", self.title, self.parent_object, self.parent_record_id)
    }

    fn matches(&self, note: &Note) -> bool {
        note.title == self.title && note.content_as(&self.format) == self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteOutput {
    pub note_id: String,
    pub parent_object: String,
    pub parent_record_id: String,
    pub title: String,
    pub format: String,
    pub content: String,
}

impl NoteOutput {
    fn from_remote(note: Note, format: &str) -> Self {
        Self {
            content: note.content_as(format).to_string(),
            format: format.to_string(),
            note_id: note.note_id,
            parent_object: note.parent_object,
            parent_record_id: note.parent_record_id,
            title: note.title,
        }
    }
}

pub struct NoteProvider<'a> {
    client: &'a Client,
}

impl<'a> NoteProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Find a note with the same title and content under the same parent
    fn search(&self, inputs: &NoteInputs) -> Result<Option<Note>> {
        if !is_uuid(&inputs.parent_record_id) {
            log::debug!(
                "note scan skipped: parent record id {} is not a valid id",
                inputs.parent_record_id
            );
            return Ok(None);
        }

        let query = NoteQuery {
            parent_object: Some(inputs.parent_object.clone()),
            parent_record_id: Some(inputs.parent_record_id.clone()),
        };
        let result = find_first(
            self.client,
            "list_notes",
            |api, page| api.list_notes(&query, page),
            |note| inputs.matches(note),
        );
        match result {
            Ok(note) => Ok(note),
            Err(crmkit::Error::Validation { message }) => {
                log::debug!("note scan rejected, treating as no match: {message}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Provider for NoteProvider<'_> {
    type Inputs = NoteInputs;
    type Output = NoteOutput;
    type Error = ProviderError;

    const KIND: &'static str = "note";
    const STABLE_FIELDS: &'static [&'static str] =
        &["note_id", "parent_object", "parent_record_id", "title", "content"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::All,
        update_on: Fields::None,
        delete: DeleteStrategy::Hard,
    };

    fn read(
        &self,
        olds: Option<&NoteInputs>,
        output: Option<&NoteOutput>,
    ) -> Result<Option<NoteOutput>> {
        if let Some(out) = output.filter(|o| is_uuid(&o.note_id)) {
            let note = found(self.client.call("get_note", |api| api.get_note(&out.note_id)))?;
            return Ok(note.map(|n| NoteOutput::from_remote(n, &out.format)));
        }
        match olds {
            Some(olds) => Ok(self
                .search(olds)?
                .map(|n| NoteOutput::from_remote(n, &olds.format))),
            None => Ok(None),
        }
    }

    fn create(&self, news: &NoteInputs, notes: &mut dyn Notifier) -> Result<NoteOutput> {
        if news.format != "plaintext" && news.format != "markdown" {
            return Err(ProviderError::declaration(
                Self::KIND,
                format!("format must be plaintext or markdown, not {}", news.format),
            ));
        }
        let name = news.display_name();

        if let Some(existing) = self.search(news)? {
            notes.note(&format!("Idempotent Note: found existing {name}"));
            return Ok(NoteOutput::from_remote(existing, &news.format));
        }

        let request = CreateNote {
            parent_object: news.parent_object.clone(),
            parent_record_id: news.parent_record_id.clone(),
            title: news.title.clone(),
            format: news.format.clone(),
            content: news.content.clone(),
        };
        let created = self.client.call("create_note", |api| api.create_note(&request))?;
        notes.note(&format!("Created Note: {name}"));
        Ok(NoteOutput::from_remote(created, &news.format))
    }

    fn update(
        &self,
        _news: &NoteInputs,
        _output: &NoteOutput,
        _notes: &mut dyn Notifier,
    ) -> Result<NoteOutput> {
        Err(ProviderError::Unsupported {
            kind: Self::KIND,
            operation: "update",
        })
    }

    fn delete(
        &self,
        olds: &NoteInputs,
        output: &NoteOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        let name = olds.display_name();
        let existed = if is_uuid(&output.note_id) {
            gone(self.client.call("delete_note", |api| api.delete_note(&output.note_id)))?
        } else {
            false
        };
        if existed {
            notes.note(&format!("Deleted Note: {name}"));
        } else {
            notes.note(&format!("Already absent Note: {name}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{client, seed_record};
    use declarative::{Decision, NoteBuffer};

    fn note(record_id: &str, content: &str) -> NoteInputs {
        NoteInputs {
            parent_object: "companies".into(),
            parent_record_id: record_id.into(),
            title: "Kickoff".into(),
            format: default_format(),
            content: content.into(),
        }
    }

    #[test]
    fn test_any_change_is_replace() {
        let (client, _) = client();
        let provider = NoteProvider::new(&client);
        let olds = note("r1", "hello");

        assert_eq!(provider.diff(&note("r1", "hello!"), &olds), Some(Decision::Replace));
        let mut retitled = olds.clone();
        retitled.title = "Follow-up".into();
        assert_eq!(provider.diff(&retitled, &olds), Some(Decision::Replace));
        assert_eq!(provider.diff(&olds, &olds), None);
    }

    #[test]
    fn test_update_is_unsupported() {
        let (client, mock) = client();
        let provider = NoteProvider::new(&client);
        let output = NoteOutput {
            note_id: String::new(),
            parent_object: "companies".into(),
            parent_record_id: "r1".into(),
            title: "Kickoff".into(),
            format: default_format(),
            content: "hello".into(),
        };

        let err = provider
            .update(&note("r1", "hello"), &output, &mut NoteBuffer::new())
            .unwrap_err();

        assert_eq!(err.tag(), "unsupported");
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn test_create_is_idempotent() {
        let (client, mock) = client();
        let record_id = seed_record(&mock, "acme.com");
        let provider = NoteProvider::new(&client);
        let mut notes = NoteBuffer::new();

        let first = provider.create(&note(&record_id, "hello"), &mut notes).unwrap();
        let second = provider.create(&note(&record_id, "hello"), &mut notes).unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls("create_note"), 1);
        assert!(notes.contains("Idempotent Note: found existing Kickoff"));
    }

    #[test]
    fn test_different_content_creates_new_note() {
        let (client, mock) = client();
        let record_id = seed_record(&mock, "acme.com");
        let provider = NoteProvider::new(&client);

        let first = provider.create(&note(&record_id, "hello"), &mut NoteBuffer::new()).unwrap();
        let second = provider.create(&note(&record_id, "bye"), &mut NoteBuffer::new()).unwrap();

        assert_ne!(first.note_id, second.note_id);
        assert_eq!(mock.calls("create_note"), 2);
    }

    #[test]
    fn test_read_with_malformed_parent_makes_no_calls() {
        let (client, mock) = client();
        let provider = NoteProvider::new(&client);

        let read = provider.read(Some(&note("rec_123", "hello")), None).unwrap();

        assert!(read.is_none());
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn test_scan_validation_error_means_no_match() {
        let (client, mock) = client();
        let record_id = seed_record(&mock, "acme.com");
        let provider = NoteProvider::new(&client);
        mock.fail_next(
            "list_notes",
            crmkit::Error::Validation {
                message: "bad filter".into(),
            },
        );

        let read = provider.read(Some(&note(&record_id, "hello")), None).unwrap();

        assert!(read.is_none());
        assert_eq!(mock.calls("list_notes"), 1);
    }

    #[test]
    fn test_read_by_id_and_delete() {
        let (client, mock) = client();
        let record_id = seed_record(&mock, "acme.com");
        let provider = NoteProvider::new(&client);
        let olds = note(&record_id, "hello");
        let output = provider.create(&olds, &mut NoteBuffer::new()).unwrap();

        assert_eq!(provider.read(None, Some(&output)).unwrap(), Some(output.clone()));

        let mut notes = NoteBuffer::new();
        provider.delete(&olds, &output, &mut notes).unwrap();
        provider.delete(&olds, &output, &mut notes).unwrap();

        assert!(notes.contains("Deleted Note"));
        assert!(notes.contains("Already absent Note"));
        assert_eq!(provider.read(Some(&olds), Some(&output)).unwrap(), None);
    }

    #[test]
    fn test_rejects_unknown_format() {
        let (client, mock) = client();
        let provider = NoteProvider::new(&client);
        let mut news = note("r1", "hello");
        news.format = "html".into();

        let err = provider.create(&news, &mut NoteBuffer::new()).unwrap_err();

        assert_eq!(err.tag(), "invalid_declaration");
        assert_eq!(mock.total_calls(), 0);
    }
}
