//! HTTP backend.
//!
//! This module provides the [`HttpBackend`] implementation talking to the
//! workspace REST API with a blocking `ureq` agent. Every payload is wrapped
//! in a `{"data": ...}` envelope in both directions.
//!
//! # Errors
//!
//! Non-2xx responses are decoded into [`Error`] by status code, keeping the
//! server's `message` and, for 429 responses, the `Retry-After` header.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    AssertEntry, AssertRecord, Assignee, Attribute, AttributeTarget, CreateAttribute, CreateList,
    CreateNote, CreateObject, CreateSelectOption, CreateStatus, CreateTask, CreateWebhook, Entry,
    LinkedRecord, List, Note, NoteQuery, Object, Page, Record, SelectOption, Status, Subscription,
    Task, UpdateAttribute, UpdateEntry, UpdateList, UpdateObject, UpdateRecord,
    UpdateSelectOption, UpdateStatus, UpdateTask, UpdateWebhook, Webhook,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use ureq::Body;
use ureq::http::Response;

/// Public API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.attio.com/v2";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP backend for the workspace REST API.
///
/// # Example
///
/// ```no_run
/// use crmkit::backend::Backend;
/// use crmkit::backend::http::HttpBackend;
///
/// let backend = HttpBackend::new("secret-token");
/// let objects = backend.list_objects().unwrap();
/// println!("Found {} objects", objects.len());
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL, without trailing slash.
    api_base: String,
    /// Bearer token.
    token: String,
}

impl HttpBackend {
    /// Create a backend for the public API.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, token)
    }

    /// Create a backend with a custom API base (for testing or proxies).
    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .user_agent(concat!("crmkit/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent: config.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        log::debug!("GET {path}");
        let mut request = self
            .agent
            .get(&self.url(path))
            .header("Authorization", self.auth())
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, value);
        }
        decode(request.call()?, path)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        log::debug!("POST {path}");
        let response = self
            .agent
            .post(&self.url(path))
            .header("Authorization", self.auth())
            .send_json(body)?;
        decode(response, path)
    }

    fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T> {
        log::debug!("PUT {path}");
        let mut request = self
            .agent
            .put(&self.url(path))
            .header("Authorization", self.auth());
        for (key, value) in query {
            request = request.query(*key, value);
        }
        decode(request.send_json(body)?, path)
    }

    fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        log::debug!("PATCH {path}");
        let response = self
            .agent
            .patch(&self.url(path))
            .header("Authorization", self.auth())
            .send_json(body)?;
        decode(response, path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        log::debug!("DELETE {path}");
        let mut response = self
            .agent
            .delete(&self.url(path))
            .header("Authorization", self.auth())
            .call()?;
        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(());
        }
        let retry_after = retry_after(&response);
        let body = response.body_mut().read_to_string().unwrap_or_default();
        Err(error_from_body(status, &body, path, retry_after))
    }
}

/// Wrap a request payload in the `data` envelope.
fn envelope<T: Serialize>(data: &T) -> Value {
    json!({ "data": data })
}

fn page_query(page: Page) -> Vec<(&'static str, String)> {
    vec![
        ("limit", page.limit.to_string()),
        ("offset", page.offset.to_string()),
    ]
}

/// Join path segments, percent-encoding each one
fn path(segments: &[&str]) -> String {
    segments.iter().fold(String::new(), |mut path, segment| {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
        path
    })
}

fn attribute_path(target: AttributeTarget, identifier: &str, rest: &[&str]) -> String {
    let mut segments = vec![target.as_str(), identifier, "attributes"];
    segments.extend_from_slice(rest);
    path(&segments)
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn retry_after(response: &Response<Body>) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn decode<T: DeserializeOwned>(mut response: Response<Body>, path: &str) -> Result<T> {
    let status = response.status().as_u16();
    let retry_after = retry_after(&response);
    let body = response.body_mut().read_to_string()?;

    if (200..300).contains(&status) {
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        return Ok(envelope.data);
    }

    Err(error_from_body(status, &body, path, retry_after))
}

fn error_from_body(status: u16, body: &str, path: &str, retry_after: Option<Duration>) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.trim().to_string()
            }
        });

    if status == 404 {
        return Error::not_found(format!("{path} ({message})"));
    }
    Error::from_status(status, message, retry_after)
}

impl Backend for HttpBackend {
    fn get_object(&self, object: &str) -> Result<Object> {
        let wire: WireObject = self.get(&path(&["objects", object]), &[])?;
        Ok(wire.into())
    }

    fn list_objects(&self) -> Result<Vec<Object>> {
        let wire: Vec<WireObject> = self.get("/objects", &[])?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    fn create_object(&self, request: &CreateObject) -> Result<Object> {
        let wire: WireObject = self.post("/objects", &envelope(request))?;
        Ok(wire.into())
    }

    fn update_object(&self, object: &str, request: &UpdateObject) -> Result<Object> {
        let wire: WireObject = self.patch(&path(&["objects", object]), &envelope(request))?;
        Ok(wire.into())
    }

    fn get_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
    ) -> Result<Attribute> {
        let path = attribute_path(target, identifier, &[attribute]);
        let wire: WireAttribute = self.get(&path, &[])?;
        Ok(wire.into())
    }

    fn list_attributes(
        &self,
        target: AttributeTarget,
        identifier: &str,
        page: Page,
        show_archived: bool,
    ) -> Result<Vec<Attribute>> {
        let mut query = page_query(page);
        query.push(("show_archived", show_archived.to_string()));
        let wire: Vec<WireAttribute> =
            self.get(&attribute_path(target, identifier, &[]), &query)?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    fn create_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        request: &CreateAttribute,
    ) -> Result<Attribute> {
        let wire: WireAttribute =
            self.post(&attribute_path(target, identifier, &[]), &envelope(request))?;
        Ok(wire.into())
    }

    fn update_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &UpdateAttribute,
    ) -> Result<Attribute> {
        let path = attribute_path(target, identifier, &[attribute]);
        let wire: WireAttribute = self.patch(&path, &envelope(request))?;
        Ok(wire.into())
    }

    fn list_select_options(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        show_archived: bool,
    ) -> Result<Vec<SelectOption>> {
        let path = attribute_path(target, identifier, &[attribute, "options"]);
        let wire: Vec<WireSelectOption> =
            self.get(&path, &[("show_archived", show_archived.to_string())])?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    fn create_select_option(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &CreateSelectOption,
    ) -> Result<SelectOption> {
        let path = attribute_path(target, identifier, &[attribute, "options"]);
        let wire: WireSelectOption = self.post(&path, &envelope(request))?;
        Ok(wire.into())
    }

    fn update_select_option(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        option: &str,
        request: &UpdateSelectOption,
    ) -> Result<SelectOption> {
        let path = attribute_path(target, identifier, &[attribute, "options", option]);
        let wire: WireSelectOption = self.patch(&path, &envelope(request))?;
        Ok(wire.into())
    }

    fn list_statuses(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        show_archived: bool,
    ) -> Result<Vec<Status>> {
        let path = attribute_path(target, identifier, &[attribute, "statuses"]);
        let wire: Vec<WireStatus> =
            self.get(&path, &[("show_archived", show_archived.to_string())])?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    fn create_status(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &CreateStatus,
    ) -> Result<Status> {
        let path = attribute_path(target, identifier, &[attribute, "statuses"]);
        let wire: WireStatus = self.post(&path, &envelope(request))?;
        Ok(wire.into())
    }

    fn update_status(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        status: &str,
        request: &UpdateStatus,
    ) -> Result<Status> {
        let path = attribute_path(target, identifier, &[attribute, "statuses", status]);
        let wire: WireStatus = self.patch(&path, &envelope(request))?;
        Ok(wire.into())
    }

    fn get_list(&self, list: &str) -> Result<List> {
        let wire: WireList = self.get(&path(&["lists", list]), &[])?;
        Ok(wire.into())
    }

    fn list_lists(&self) -> Result<Vec<List>> {
        let wire: Vec<WireList> = self.get("/lists", &[])?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    fn create_list(&self, request: &CreateList) -> Result<List> {
        let wire: WireList = self.post("/lists", &envelope(request))?;
        Ok(wire.into())
    }

    fn update_list(&self, list: &str, request: &UpdateList) -> Result<List> {
        let wire: WireList = self.patch(&path(&["lists", list]), &envelope(request))?;
        Ok(wire.into())
    }

    fn get_record(&self, object: &str, record_id: &str) -> Result<Record> {
        let wire: WireRecord =
            self.get(&path(&["objects", object, "records", record_id]), &[])?;
        Ok(wire.into_record(object))
    }

    fn query_records(&self, object: &str, filter: &Value, page: Page) -> Result<Vec<Record>> {
        let body = json!({ "filter": filter, "limit": page.limit, "offset": page.offset });
        let wire: Vec<WireRecord> =
            self.post(&path(&["objects", object, "records", "query"]), &body)?;
        Ok(wire.into_iter().map(|r| r.into_record(object)).collect())
    }

    fn assert_record(
        &self,
        object: &str,
        matching_attribute: &str,
        request: &AssertRecord,
    ) -> Result<Record> {
        let wire: WireRecord = self.put(
            &path(&["objects", object, "records"]),
            &[("matching_attribute", matching_attribute.to_string())],
            &envelope(request),
        )?;
        Ok(wire.into_record(object))
    }

    fn update_record(
        &self,
        object: &str,
        record_id: &str,
        request: &UpdateRecord,
    ) -> Result<Record> {
        let wire: WireRecord = self.patch(
            &path(&["objects", object, "records", record_id]),
            &envelope(request),
        )?;
        Ok(wire.into_record(object))
    }

    fn delete_record(&self, object: &str, record_id: &str) -> Result<()> {
        self.delete(&path(&["objects", object, "records", record_id]))
    }

    fn get_entry(&self, list: &str, entry_id: &str) -> Result<Entry> {
        let wire: WireEntry = self.get(&path(&["lists", list, "entries", entry_id]), &[])?;
        Ok(wire.into_entry(list))
    }

    fn query_entries(&self, list: &str, filter: &Value, page: Page) -> Result<Vec<Entry>> {
        let body = json!({ "filter": filter, "limit": page.limit, "offset": page.offset });
        let wire: Vec<WireEntry> =
            self.post(&path(&["lists", list, "entries", "query"]), &body)?;
        Ok(wire.into_iter().map(|e| e.into_entry(list)).collect())
    }

    fn assert_entry(&self, list: &str, request: &AssertEntry) -> Result<Entry> {
        let wire: WireEntry =
            self.put(&path(&["lists", list, "entries"]), &[], &envelope(request))?;
        Ok(wire.into_entry(list))
    }

    fn update_entry(&self, list: &str, entry_id: &str, request: &UpdateEntry) -> Result<Entry> {
        let wire: WireEntry = self.patch(
            &path(&["lists", list, "entries", entry_id]),
            &envelope(request),
        )?;
        Ok(wire.into_entry(list))
    }

    fn delete_entry(&self, list: &str, entry_id: &str) -> Result<()> {
        self.delete(&path(&["lists", list, "entries", entry_id]))
    }

    fn get_note(&self, note_id: &str) -> Result<Note> {
        let wire: WireNote = self.get(&path(&["notes", note_id]), &[])?;
        Ok(wire.into())
    }

    fn list_notes(&self, query: &NoteQuery, page: Page) -> Result<Vec<Note>> {
        let mut params = page_query(page);
        if let Some(parent_object) = &query.parent_object {
            params.push(("parent_object", parent_object.clone()));
        }
        if let Some(parent_record_id) = &query.parent_record_id {
            params.push(("parent_record_id", parent_record_id.clone()));
        }
        let wire: Vec<WireNote> = self.get("/notes", &params)?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    fn create_note(&self, request: &CreateNote) -> Result<Note> {
        let wire: WireNote = self.post("/notes", &envelope(request))?;
        Ok(wire.into())
    }

    fn delete_note(&self, note_id: &str) -> Result<()> {
        self.delete(&path(&["notes", note_id]))
    }

    fn get_task(&self, task_id: &str) -> Result<Task> {
        let wire: WireTask = self.get(&path(&["tasks", task_id]), &[])?;
        Ok(wire.into())
    }

    fn list_tasks(&self, page: Page) -> Result<Vec<Task>> {
        let mut query = page_query(page);
        query.push(("sort", "created_at:asc".to_string()));
        let wire: Vec<WireTask> = self.get("/tasks", &query)?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    fn create_task(&self, request: &CreateTask) -> Result<Task> {
        let wire: WireTask = self.post("/tasks", &envelope(request))?;
        Ok(wire.into())
    }

    fn update_task(&self, task_id: &str, request: &UpdateTask) -> Result<Task> {
        let wire: WireTask = self.patch(&path(&["tasks", task_id]), &envelope(request))?;
        Ok(wire.into())
    }

    fn delete_task(&self, task_id: &str) -> Result<()> {
        self.delete(&path(&["tasks", task_id]))
    }

    fn get_webhook(&self, webhook_id: &str) -> Result<Webhook> {
        let wire: WireWebhook = self.get(&path(&["webhooks", webhook_id]), &[])?;
        Ok(wire.into())
    }

    fn list_webhooks(&self, page: Page) -> Result<Vec<Webhook>> {
        let wire: Vec<WireWebhook> = self.get("/webhooks", &page_query(page))?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    fn create_webhook(&self, request: &CreateWebhook) -> Result<Webhook> {
        let wire: WireWebhook = self.post("/webhooks", &envelope(request))?;
        Ok(wire.into())
    }

    fn update_webhook(&self, webhook_id: &str, request: &UpdateWebhook) -> Result<Webhook> {
        let wire: WireWebhook =
            self.patch(&path(&["webhooks", webhook_id]), &envelope(request))?;
        Ok(wire.into())
    }

    fn delete_webhook(&self, webhook_id: &str) -> Result<()> {
        self.delete(&path(&["webhooks", webhook_id]))
    }
}

// =============================================================================
// API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ObjectId {
    object_id: String,
}

#[derive(Debug, Deserialize)]
struct WireObject {
    id: ObjectId,
    api_slug: Option<String>,
    singular_noun: Option<String>,
    plural_noun: Option<String>,
}

impl From<WireObject> for Object {
    fn from(o: WireObject) -> Self {
        Self {
            api_slug: o.api_slug.unwrap_or_else(|| o.id.object_id.clone()),
            object_id: o.id.object_id,
            singular_noun: o.singular_noun.unwrap_or_default(),
            plural_noun: o.plural_noun.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AttributeId {
    attribute_id: String,
}

#[derive(Debug, Deserialize)]
struct WireAttribute {
    id: AttributeId,
    api_slug: String,
    title: String,
    description: Option<String>,
    #[serde(rename = "type")]
    attribute_type: String,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    is_unique: bool,
    #[serde(default)]
    is_multiselect: bool,
    #[serde(default)]
    is_archived: bool,
}

impl From<WireAttribute> for Attribute {
    fn from(a: WireAttribute) -> Self {
        Self {
            attribute_id: a.id.attribute_id,
            api_slug: a.api_slug,
            title: a.title,
            description: a.description.filter(|d| !d.is_empty()),
            attribute_type: a.attribute_type,
            is_required: a.is_required,
            is_unique: a.is_unique,
            is_multiselect: a.is_multiselect,
            is_archived: a.is_archived,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OptionId {
    option_id: String,
}

#[derive(Debug, Deserialize)]
struct WireSelectOption {
    id: OptionId,
    title: String,
    #[serde(default)]
    is_archived: bool,
}

impl From<WireSelectOption> for SelectOption {
    fn from(o: WireSelectOption) -> Self {
        Self {
            option_id: o.id.option_id,
            title: o.title,
            is_archived: o.is_archived,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusId {
    status_id: String,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    id: StatusId,
    title: String,
    #[serde(default)]
    is_archived: bool,
    #[serde(default)]
    celebration_enabled: bool,
    target_time_in_status: Option<String>,
}

impl From<WireStatus> for Status {
    fn from(s: WireStatus) -> Self {
        Self {
            status_id: s.id.status_id,
            title: s.title,
            is_archived: s.is_archived,
            celebration_enabled: s.celebration_enabled,
            target_time_in_status: s.target_time_in_status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListId {
    list_id: String,
}

#[derive(Debug, Deserialize)]
struct WireList {
    id: ListId,
    api_slug: String,
    name: String,
    #[serde(default)]
    parent_object: Vec<String>,
    workspace_access: Option<String>,
}

impl From<WireList> for List {
    fn from(l: WireList) -> Self {
        Self {
            list_id: l.id.list_id,
            api_slug: l.api_slug,
            name: l.name,
            parent_object: l.parent_object.into_iter().next().unwrap_or_default(),
            workspace_access: l.workspace_access,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecordId {
    record_id: String,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    id: RecordId,
    #[serde(default)]
    values: Value,
    web_url: Option<String>,
}

impl WireRecord {
    fn into_record(self, object: &str) -> Record {
        Record {
            record_id: self.id.record_id,
            object: object.to_string(),
            values: self.values,
            web_url: self.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntryId {
    entry_id: String,
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    id: EntryId,
    parent_record_id: String,
    parent_object: String,
    #[serde(default)]
    entry_values: Value,
}

impl WireEntry {
    fn into_entry(self, list: &str) -> Entry {
        Entry {
            entry_id: self.id.entry_id,
            list: list.to_string(),
            parent_record_id: self.parent_record_id,
            parent_object: self.parent_object,
            entry_values: self.entry_values,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NoteId {
    note_id: String,
}

#[derive(Debug, Deserialize)]
struct WireNote {
    id: NoteId,
    parent_object: String,
    parent_record_id: String,
    title: String,
    #[serde(default)]
    content_plaintext: String,
    content_markdown: Option<String>,
}

impl From<WireNote> for Note {
    fn from(n: WireNote) -> Self {
        Self {
            note_id: n.id.note_id,
            parent_object: n.parent_object,
            parent_record_id: n.parent_record_id,
            title: n.title,
            content_markdown: n
                .content_markdown
                .unwrap_or_else(|| n.content_plaintext.clone()),
            content_plaintext: n.content_plaintext,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskId {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct WireLinkedRecord {
    target_object_id: String,
    target_record_id: String,
}

#[derive(Debug, Deserialize)]
struct WireTask {
    id: TaskId,
    #[serde(default)]
    content_plaintext: String,
    deadline_at: Option<String>,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    linked_records: Vec<WireLinkedRecord>,
    #[serde(default)]
    assignees: Vec<Assignee>,
}

impl From<WireTask> for Task {
    fn from(t: WireTask) -> Self {
        Self {
            task_id: t.id.task_id,
            content: t.content_plaintext,
            deadline_at: t.deadline_at,
            is_completed: t.is_completed,
            linked_records: t
                .linked_records
                .into_iter()
                .map(|r| LinkedRecord {
                    target_object: r.target_object_id,
                    target_record_id: r.target_record_id,
                })
                .collect(),
            assignees: t.assignees,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookId {
    webhook_id: String,
}

#[derive(Debug, Deserialize)]
struct WireWebhook {
    id: WebhookId,
    target_url: String,
    #[serde(default)]
    subscriptions: Vec<Subscription>,
    #[serde(default)]
    status: String,
    secret: Option<String>,
}

impl From<WireWebhook> for Webhook {
    fn from(w: WireWebhook) -> Self {
        Self {
            webhook_id: w.id.webhook_id,
            target_url: w.target_url,
            subscriptions: w.subscriptions,
            status: w.status,
            secret: w.secret,
        }
    }
}
