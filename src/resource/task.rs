//! Task resource

use crmkit::{Assignee, Client, CreateTask, LinkedRecord, Task, UpdateTask};
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
pub struct TaskInputs {
    pub content: String,
    #[serde(default = "default_format")]
    pub format: String,
    /// ISO 8601 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_at: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub linked_records: Vec<LinkedRecord>,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task_id: String,
    pub content: String,
    pub format: String,
    pub deadline_at: Option<String>,
    pub is_completed: bool,
    pub linked_records: Vec<LinkedRecord>,
    pub assignees: Vec<Assignee>,
}

impl TaskOutput {
    fn from_remote(task: Task, format: &str) -> Self {
        Self {
            task_id: task.task_id,
            content: task.content,
            format: format.to_string(),
            deadline_at: task.deadline_at,
            is_completed: task.is_completed,
            linked_records: task.linked_records,
            assignees: task.assignees,
        }
    }

    fn differs_from(&self, news: &TaskInputs) -> bool {
        self.deadline_at != news.deadline_at
            || self.is_completed != news.is_completed
            || self.linked_records != news.linked_records
            || self.assignees != news.assignees
    }
}

pub struct TaskProvider<'a> {
    client: &'a Client,
}

impl<'a> TaskProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn search(&self, content: &str) -> Result<Option<Task>> {
        Ok(find_first(
            self.client,
            "list_tasks",
            |api, page| api.list_tasks(page),
            |task| task.content == content,
        )?)
    }
}

fn short(content: &str) -> String {
    const MAX: usize = 40;
    if content.chars().count() <= MAX {
        content.to_string()
    } else {
        let cut: String = content.chars().take(MAX).collect();
        format!("{cut}...")
    }
}

impl Provider for TaskProvider<'_> {
    type Inputs = TaskInputs;
    type Output = TaskOutput;
    type Error = ProviderError;

    const KIND: &'static str = "task";
    const STABLE_FIELDS: &'static [&'static str] = &["task_id", "content"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["content", "format"]),
        update_on: Fields::Only(&["deadline_at", "is_completed", "linked_records", "assignees"]),
        delete: DeleteStrategy::Hard,
    };

    fn read(
        &self,
        olds: Option<&TaskInputs>,
        output: Option<&TaskOutput>,
    ) -> Result<Option<TaskOutput>> {
        if let Some(out) = output.filter(|o| !o.task_id.is_empty()) {
            let task = found(self.client.call("get_task", |api| api.get_task(&out.task_id)))?;
            return Ok(task.map(|t| TaskOutput::from_remote(t, &out.format)));
        }
        match olds {
            Some(olds) => Ok(self
                .search(&olds.content)?
                .map(|t| TaskOutput::from_remote(t, &olds.format))),
            None => Ok(None),
        }
    }

    fn create(&self, news: &TaskInputs, notes: &mut dyn Notifier) -> Result<TaskOutput> {
        if news.content.is_empty() {
            return Err(ProviderError::declaration(Self::KIND, "content must not be empty"));
        }
        let name = short(&news.content);

        if let Some(existing) = self.search(&news.content)? {
            notes.note(&format!("Idempotent Task: found existing {name}"));
            let output = TaskOutput::from_remote(existing, &news.format);
            if output.differs_from(news) {
                return self.update(news, &output, notes);
            }
            return Ok(output);
        }

        let request = CreateTask {
            content: news.content.clone(),
            format: news.format.clone(),
            deadline_at: news.deadline_at.clone(),
            is_completed: news.is_completed,
            linked_records: news.linked_records.clone(),
            assignees: news.assignees.clone(),
        };
        let created = self.client.call("create_task", |api| api.create_task(&request))?;
        notes.note(&format!("Created Task: {name}"));
        Ok(TaskOutput::from_remote(created, &news.format))
    }

    fn update(
        &self,
        news: &TaskInputs,
        output: &TaskOutput,
        notes: &mut dyn Notifier,
    ) -> Result<TaskOutput> {
        if output.task_id.is_empty() {
            return Ok(output.clone());
        }
        let request = UpdateTask {
            deadline_at: news.deadline_at.clone(),
            is_completed: news.is_completed,
            linked_records: news.linked_records.clone(),
            assignees: news.assignees.clone(),
        };
        let updated = self
            .client
            .call("update_task", |api| api.update_task(&output.task_id, &request))?;
        notes.note(&format!("Updated Task: {}", short(&updated.content)));
        Ok(TaskOutput::from_remote(updated, &output.format))
    }

    fn delete(
        &self,
        olds: &TaskInputs,
        output: &TaskOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        let name = short(&olds.content);
        let existed = !output.task_id.is_empty()
            && gone(
                self.client
                    .call("delete_task", |api| api.delete_task(&output.task_id)),
            )?;
        if existed {
            notes.note(&format!("Deleted Task: {name}"));
        } else {
            notes.note(&format!("Already absent Task: {name}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::client;
    use declarative::{Decision, NoteBuffer};

    fn call_acme() -> TaskInputs {
        TaskInputs {
            content: "Call Acme about renewal".into(),
            format: default_format(),
            deadline_at: None,
            is_completed: false,
            linked_records: vec![],
            assignees: vec![],
        }
    }

    #[test]
    fn test_content_change_is_replace() {
        let (client, _) = client();
        let provider = TaskProvider::new(&client);
        let mut news = call_acme();
        news.is_completed = true;
        assert_eq!(provider.diff(&news, &call_acme()), Some(Decision::Update));

        news.content = "Email Acme".into();
        assert_eq!(provider.diff(&news, &call_acme()), Some(Decision::Replace));
    }

    #[test]
    fn test_create_is_idempotent() {
        let (client, mock) = client();
        let provider = TaskProvider::new(&client);
        let mut notes = NoteBuffer::new();

        let first = provider.create(&call_acme(), &mut notes).unwrap();
        let second = provider.create(&call_acme(), &mut notes).unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls("create_task"), 1);
        assert!(notes.contains("Idempotent Task: found existing Call Acme about renewal"));
    }

    #[test]
    fn test_adopt_converges_completion() {
        let (client, mock) = client();
        let provider = TaskProvider::new(&client);
        provider.create(&call_acme(), &mut NoteBuffer::new()).unwrap();

        let mut news = call_acme();
        news.is_completed = true;
        news.deadline_at = Some("2026-11-01T09:00:00Z".into());
        let output = provider.create(&news, &mut NoteBuffer::new()).unwrap();

        assert!(output.is_completed);
        assert_eq!(mock.calls("create_task"), 1);
        assert_eq!(mock.calls("update_task"), 1);
    }

    #[test]
    fn test_update_sends_every_mutable_field() {
        let (client, _) = client();
        let provider = TaskProvider::new(&client);
        let mut olds = call_acme();
        olds.deadline_at = Some("2026-11-01T09:00:00Z".into());
        let output = provider.create(&olds, &mut NoteBuffer::new()).unwrap();

        // Clearing the deadline must reach the server as an explicit null
        let updated = provider.update(&call_acme(), &output, &mut NoteBuffer::new()).unwrap();

        assert_eq!(updated.deadline_at, None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (client, mock) = client();
        let provider = TaskProvider::new(&client);
        let output = provider.create(&call_acme(), &mut NoteBuffer::new()).unwrap();

        let mut notes = NoteBuffer::new();
        provider.delete(&call_acme(), &output, &mut notes).unwrap();
        provider.delete(&call_acme(), &output, &mut notes).unwrap();

        assert_eq!(mock.calls("delete_task"), 2);
        assert!(notes.contains("Already absent Task"));
        assert_eq!(provider.read(Some(&call_acme()), None).unwrap(), None);
    }

    #[test]
    fn test_delete_without_id_makes_no_call() {
        let (client, mock) = client();
        let provider = TaskProvider::new(&client);
        let mut output = provider.create(&call_acme(), &mut NoteBuffer::new()).unwrap();
        output.task_id.clear();
        mock.reset_calls();

        let mut notes = NoteBuffer::new();
        provider.delete(&call_acme(), &output, &mut notes).unwrap();

        assert_eq!(mock.total_calls(), 0);
        assert!(notes.contains("Already absent Task"));
    }

    #[test]
    fn test_short_names() {
        assert_eq!(short("hi"), "hi");
        assert_eq!(short(&"x".repeat(50)), format!("{}...", "x".repeat(40)));
    }
}
