//! In-memory backend for testing without network access.
//!
//! [`MockBackend`] keeps a small workspace model behind an `Arc<Mutex<_>>`,
//! so a clone handed to a [`Client`](crate::Client) shares state with the
//! clone a test keeps for inspection. Every operation is counted, and faults
//! can be scripted per operation to exercise retry and error paths.

use super::Backend;
use crate::error::{Error, Result};
use crate::ids::is_uuid;
use crate::types::{
    AssertEntry, AssertRecord, Attribute, AttributeTarget, CreateAttribute, CreateList,
    CreateNote, CreateObject, CreateSelectOption, CreateStatus, CreateTask, CreateWebhook, Entry,
    List, Note, NoteQuery, Object, Page, Record, SelectOption, Status, Task, UpdateAttribute,
    UpdateEntry, UpdateList, UpdateObject, UpdateRecord, UpdateSelectOption, UpdateStatus,
    UpdateTask, UpdateWebhook, Webhook,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct ScopedAttribute {
    target: AttributeTarget,
    parent_id: String,
    attribute: Attribute,
}

#[derive(Debug, Default)]
struct Workspace {
    next_id: u64,
    objects: Vec<Object>,
    attributes: Vec<ScopedAttribute>,
    options: Vec<(String, SelectOption)>,
    statuses: Vec<(String, Status)>,
    lists: Vec<List>,
    records: Vec<Record>,
    entries: Vec<Entry>,
    notes: Vec<Note>,
    tasks: Vec<Task>,
    webhooks: Vec<Webhook>,
}

impl Workspace {
    fn new_id(&mut self) -> String {
        self.next_id += 1;
        format!("00000000-0000-4000-8000-{:012x}", self.next_id)
    }

    fn object(&self, object: &str) -> Result<&Object> {
        self.objects
            .iter()
            .find(|o| o.api_slug == object || o.object_id == object)
            .ok_or_else(|| Error::not_found(format!("object {object}")))
    }

    fn list(&self, list: &str) -> Result<&List> {
        self.lists
            .iter()
            .find(|l| l.api_slug == list || l.list_id == list)
            .ok_or_else(|| Error::not_found(format!("list {list}")))
    }

    fn parent_id(&self, target: AttributeTarget, identifier: &str) -> Result<String> {
        match target {
            AttributeTarget::Objects => Ok(self.object(identifier)?.object_id.clone()),
            AttributeTarget::Lists => Ok(self.list(identifier)?.list_id.clone()),
        }
    }

    fn attribute_index(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
    ) -> Result<usize> {
        let parent_id = self.parent_id(target, identifier)?;
        self.attributes
            .iter()
            .position(|a| {
                a.target == target
                    && a.parent_id == parent_id
                    && (a.attribute.api_slug == attribute || a.attribute.attribute_id == attribute)
            })
            .ok_or_else(|| Error::not_found(format!("attribute {identifier}.{attribute}")))
    }

    /// Resolve an attribute that must be of `expected_type`, returning its id.
    fn typed_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        expected_type: &str,
    ) -> Result<String> {
        let index = self.attribute_index(target, identifier, attribute)?;
        let found = &self.attributes[index].attribute;
        if found.attribute_type != expected_type {
            return Err(validation(format!(
                "attribute {attribute} has type {}, expected {expected_type}",
                found.attribute_type
            )));
        }
        Ok(found.attribute_id.clone())
    }
}

fn validation(message: impl Into<String>) -> Error {
    Error::Validation {
        message: message.into(),
    }
}

fn conflict(message: impl Into<String>) -> Error {
    Error::Conflict {
        message: message.into(),
    }
}

fn paginate<'a, T: Clone + 'a>(items: impl Iterator<Item = &'a T>, page: Page) -> Vec<T> {
    items
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

/// Whether every key of `filter` equals the same key in `values`.
fn matches_filter(values: &Value, filter: &Value) -> bool {
    match filter.as_object() {
        Some(filter) => filter
            .iter()
            .all(|(key, expected)| values.get(key).unwrap_or(&Value::Null) == expected),
        None => true,
    }
}

/// Shallow-merge `update` into `target`, both JSON objects.
fn merge_values(target: &mut Value, update: &Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let (Some(target), Some(update)) = (target.as_object_mut(), update.as_object()) {
        for (key, value) in update {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Mock backend for testing without network access.
///
/// Semantics follow the live API closely enough for reconciliation tests:
/// slugs and option titles are unique, parents must exist, archived items
/// are hidden unless asked for, and assert endpoints upsert on their key.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    workspace: Arc<Mutex<Workspace>>,
    calls: Arc<Mutex<Vec<String>>>,
    faults: Arc<Mutex<HashMap<String, VecDeque<Error>>>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock backend with the standard `people` and `companies` objects.
    #[must_use]
    pub fn with_standard_objects() -> Self {
        let mock = Self::new();
        {
            let mut ws = mock.workspace();
            for (slug, singular, plural) in
                [("people", "Person", "People"), ("companies", "Company", "Companies")]
            {
                let object_id = ws.new_id();
                ws.objects.push(Object {
                    object_id,
                    api_slug: slug.to_string(),
                    singular_noun: singular.to_string(),
                    plural_noun: plural.to_string(),
                });
            }
        }
        mock
    }

    /// Make the next call to `operation` fail with `error`.
    ///
    /// Faults queue up: calling this twice fails the next two calls.
    pub fn fail_next(&self, operation: &str, error: Error) {
        self.fail_times(operation, error, 1);
    }

    /// Make the next `times` calls to `operation` fail with `error`.
    pub fn fail_times(&self, operation: &str, error: Error, times: usize) {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = faults.entry(operation.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(error.clone());
        }
    }

    /// Number of calls made to `operation`, including failed ones.
    pub fn calls(&self, operation: &str) -> usize {
        self.call_log().iter().filter(|op| *op == operation).count()
    }

    /// Total number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.call_log().len()
    }

    /// Operation names in call order.
    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forget all recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn workspace(&self) -> MutexGuard<'_, Workspace> {
        self.workspace.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and return a scripted fault if one is queued.
    fn enter(&self, operation: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation.to_string());
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        match faults.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Backend for MockBackend {
    // =========================================================================
    // Objects
    // =========================================================================

    fn get_object(&self, object: &str) -> Result<Object> {
        self.enter("get_object")?;
        self.workspace().object(object).cloned()
    }

    fn list_objects(&self) -> Result<Vec<Object>> {
        self.enter("list_objects")?;
        Ok(self.workspace().objects.clone())
    }

    fn create_object(&self, request: &CreateObject) -> Result<Object> {
        self.enter("create_object")?;
        let mut ws = self.workspace();
        if request.api_slug.is_empty() {
            return Err(validation("api_slug must not be empty"));
        }
        if ws.object(&request.api_slug).is_ok() {
            return Err(conflict(format!("object slug {} is taken", request.api_slug)));
        }
        let object = Object {
            object_id: ws.new_id(),
            api_slug: request.api_slug.clone(),
            singular_noun: request.singular_noun.clone(),
            plural_noun: request.plural_noun.clone(),
        };
        ws.objects.push(object.clone());
        Ok(object)
    }

    fn update_object(&self, object: &str, request: &UpdateObject) -> Result<Object> {
        self.enter("update_object")?;
        let mut ws = self.workspace();
        let found = ws
            .objects
            .iter_mut()
            .find(|o| o.api_slug == object || o.object_id == object)
            .ok_or_else(|| Error::not_found(format!("object {object}")))?;
        if let Some(singular) = &request.singular_noun {
            found.singular_noun.clone_from(singular);
        }
        if let Some(plural) = &request.plural_noun {
            found.plural_noun.clone_from(plural);
        }
        Ok(found.clone())
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn get_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
    ) -> Result<Attribute> {
        self.enter("get_attribute")?;
        let ws = self.workspace();
        let index = ws.attribute_index(target, identifier, attribute)?;
        Ok(ws.attributes[index].attribute.clone())
    }

    fn list_attributes(
        &self,
        target: AttributeTarget,
        identifier: &str,
        page: Page,
        show_archived: bool,
    ) -> Result<Vec<Attribute>> {
        self.enter("list_attributes")?;
        let ws = self.workspace();
        let parent_id = ws.parent_id(target, identifier)?;
        let visible = ws
            .attributes
            .iter()
            .filter(|a| a.target == target && a.parent_id == parent_id)
            .map(|a| &a.attribute)
            .filter(|a| show_archived || !a.is_archived);
        Ok(paginate(visible, page))
    }

    fn create_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        request: &CreateAttribute,
    ) -> Result<Attribute> {
        self.enter("create_attribute")?;
        let mut ws = self.workspace();
        let parent_id = ws.parent_id(target, identifier)?;
        if request.api_slug.is_empty() || request.title.is_empty() {
            return Err(validation("attribute api_slug and title are required"));
        }
        if ws.attribute_index(target, identifier, &request.api_slug).is_ok() {
            return Err(conflict(format!(
                "attribute slug {} is taken on {identifier}",
                request.api_slug
            )));
        }
        let attribute = Attribute {
            attribute_id: ws.new_id(),
            api_slug: request.api_slug.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            attribute_type: request.attribute_type.clone(),
            is_required: request.is_required,
            is_unique: request.is_unique,
            is_multiselect: request.is_multiselect,
            is_archived: false,
        };
        ws.attributes.push(ScopedAttribute {
            target,
            parent_id,
            attribute: attribute.clone(),
        });
        Ok(attribute)
    }

    fn update_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &UpdateAttribute,
    ) -> Result<Attribute> {
        self.enter("update_attribute")?;
        let mut ws = self.workspace();
        let index = ws.attribute_index(target, identifier, attribute)?;
        let found = &mut ws.attributes[index].attribute;
        if let Some(title) = &request.title {
            found.title.clone_from(title);
        }
        if let Some(description) = &request.description {
            found.description.clone_from(description);
        }
        if let Some(is_required) = request.is_required {
            found.is_required = is_required;
        }
        if let Some(is_unique) = request.is_unique {
            found.is_unique = is_unique;
        }
        if let Some(is_archived) = request.is_archived {
            found.is_archived = is_archived;
        }
        Ok(found.clone())
    }

    // =========================================================================
    // Select options
    // =========================================================================

    fn list_select_options(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        show_archived: bool,
    ) -> Result<Vec<SelectOption>> {
        self.enter("list_select_options")?;
        let ws = self.workspace();
        let attribute_id = ws.typed_attribute(target, identifier, attribute, "select")?;
        Ok(ws
            .options
            .iter()
            .filter(|(owner, o)| *owner == attribute_id && (show_archived || !o.is_archived))
            .map(|(_, o)| o.clone())
            .collect())
    }

    fn create_select_option(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &CreateSelectOption,
    ) -> Result<SelectOption> {
        self.enter("create_select_option")?;
        let mut ws = self.workspace();
        let attribute_id = ws.typed_attribute(target, identifier, attribute, "select")?;
        if ws
            .options
            .iter()
            .any(|(owner, o)| *owner == attribute_id && o.title == request.title)
        {
            return Err(conflict(format!("option {} already exists", request.title)));
        }
        let option = SelectOption {
            option_id: ws.new_id(),
            title: request.title.clone(),
            is_archived: false,
        };
        ws.options.push((attribute_id, option.clone()));
        Ok(option)
    }

    fn update_select_option(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        option: &str,
        request: &UpdateSelectOption,
    ) -> Result<SelectOption> {
        self.enter("update_select_option")?;
        let mut ws = self.workspace();
        let attribute_id = ws.typed_attribute(target, identifier, attribute, "select")?;
        if let Some(title) = &request.title
            && ws.options.iter().any(|(owner, o)| {
                *owner == attribute_id && o.title == *title && o.option_id != option
            })
        {
            return Err(conflict(format!("option {title} already exists")));
        }
        let (_, found) = ws
            .options
            .iter_mut()
            .find(|(owner, o)| {
                *owner == attribute_id && (o.option_id == option || o.title == option)
            })
            .ok_or_else(|| Error::not_found(format!("select option {option}")))?;
        if let Some(title) = &request.title {
            found.title.clone_from(title);
        }
        if let Some(is_archived) = request.is_archived {
            found.is_archived = is_archived;
        }
        Ok(found.clone())
    }

    // =========================================================================
    // Statuses
    // =========================================================================

    fn list_statuses(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        show_archived: bool,
    ) -> Result<Vec<Status>> {
        self.enter("list_statuses")?;
        let ws = self.workspace();
        let attribute_id = ws.typed_attribute(target, identifier, attribute, "status")?;
        Ok(ws
            .statuses
            .iter()
            .filter(|(owner, s)| *owner == attribute_id && (show_archived || !s.is_archived))
            .map(|(_, s)| s.clone())
            .collect())
    }

    fn create_status(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &CreateStatus,
    ) -> Result<Status> {
        self.enter("create_status")?;
        let mut ws = self.workspace();
        let attribute_id = ws.typed_attribute(target, identifier, attribute, "status")?;
        if ws
            .statuses
            .iter()
            .any(|(owner, s)| *owner == attribute_id && s.title == request.title)
        {
            return Err(conflict(format!("status {} already exists", request.title)));
        }
        let status = Status {
            status_id: ws.new_id(),
            title: request.title.clone(),
            is_archived: false,
            celebration_enabled: request.celebration_enabled,
            target_time_in_status: request.target_time_in_status.clone(),
        };
        ws.statuses.push((attribute_id, status.clone()));
        Ok(status)
    }

    fn update_status(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        status: &str,
        request: &UpdateStatus,
    ) -> Result<Status> {
        self.enter("update_status")?;
        let mut ws = self.workspace();
        let attribute_id = ws.typed_attribute(target, identifier, attribute, "status")?;
        if let Some(title) = &request.title
            && ws.statuses.iter().any(|(owner, s)| {
                *owner == attribute_id && s.title == *title && s.status_id != status
            })
        {
            return Err(conflict(format!("status {title} already exists")));
        }
        let (_, found) = ws
            .statuses
            .iter_mut()
            .find(|(owner, s)| {
                *owner == attribute_id && (s.status_id == status || s.title == status)
            })
            .ok_or_else(|| Error::not_found(format!("status {status}")))?;
        if let Some(title) = &request.title {
            found.title.clone_from(title);
        }
        if let Some(celebration_enabled) = request.celebration_enabled {
            found.celebration_enabled = celebration_enabled;
        }
        if let Some(target_time) = &request.target_time_in_status {
            found.target_time_in_status.clone_from(target_time);
        }
        if let Some(is_archived) = request.is_archived {
            found.is_archived = is_archived;
        }
        Ok(found.clone())
    }

    // =========================================================================
    // Lists
    // =========================================================================

    fn get_list(&self, list: &str) -> Result<List> {
        self.enter("get_list")?;
        self.workspace().list(list).cloned()
    }

    fn list_lists(&self) -> Result<Vec<List>> {
        self.enter("list_lists")?;
        Ok(self.workspace().lists.clone())
    }

    fn create_list(&self, request: &CreateList) -> Result<List> {
        self.enter("create_list")?;
        let mut ws = self.workspace();
        let parent_object = ws.object(&request.parent_object)?.api_slug.clone();
        if request.api_slug.is_empty() {
            return Err(validation("api_slug must not be empty"));
        }
        if ws.list(&request.api_slug).is_ok() {
            return Err(conflict(format!("list slug {} is taken", request.api_slug)));
        }
        let list = List {
            list_id: ws.new_id(),
            api_slug: request.api_slug.clone(),
            name: request.name.clone(),
            parent_object,
            workspace_access: Some(request.workspace_access.clone()),
        };
        ws.lists.push(list.clone());
        Ok(list)
    }

    fn update_list(&self, list: &str, request: &UpdateList) -> Result<List> {
        self.enter("update_list")?;
        let mut ws = self.workspace();
        let found = ws
            .lists
            .iter_mut()
            .find(|l| l.api_slug == list || l.list_id == list)
            .ok_or_else(|| Error::not_found(format!("list {list}")))?;
        if let Some(name) = &request.name {
            found.name.clone_from(name);
        }
        Ok(found.clone())
    }

    // =========================================================================
    // Records
    // =========================================================================

    fn get_record(&self, object: &str, record_id: &str) -> Result<Record> {
        self.enter("get_record")?;
        let ws = self.workspace();
        let slug = &ws.object(object)?.api_slug;
        ws.records
            .iter()
            .find(|r| r.object == *slug && r.record_id == record_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("record {object}/{record_id}")))
    }

    fn query_records(&self, object: &str, filter: &Value, page: Page) -> Result<Vec<Record>> {
        self.enter("query_records")?;
        let ws = self.workspace();
        let slug = ws.object(object)?.api_slug.clone();
        let matching = ws
            .records
            .iter()
            .filter(|r| r.object == slug && matches_filter(&r.values, filter));
        Ok(paginate(matching, page))
    }

    fn assert_record(
        &self,
        object: &str,
        matching_attribute: &str,
        request: &AssertRecord,
    ) -> Result<Record> {
        self.enter("assert_record")?;
        let mut ws = self.workspace();
        let slug = ws.object(object)?.api_slug.clone();
        let key = request
            .values
            .get(matching_attribute)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| {
                validation(format!("values must include matching attribute {matching_attribute}"))
            })?;

        let matches: Vec<usize> = ws
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.object == slug && r.values.get(matching_attribute) == Some(&key)
            })
            .map(|(i, _)| i)
            .collect();

        match matches.as_slice() {
            [] => {
                let record_id = ws.new_id();
                let record = Record {
                    web_url: Some(format!("https://app.example.com/{slug}/{record_id}")),
                    record_id,
                    object: slug,
                    values: request.values.clone(),
                };
                ws.records.push(record.clone());
                Ok(record)
            }
            [index] => {
                let record = &mut ws.records[*index];
                merge_values(&mut record.values, &request.values);
                Ok(record.clone())
            }
            _ => Err(conflict(format!(
                "multiple {slug} records match {matching_attribute}"
            ))),
        }
    }

    fn update_record(
        &self,
        object: &str,
        record_id: &str,
        request: &UpdateRecord,
    ) -> Result<Record> {
        self.enter("update_record")?;
        let mut ws = self.workspace();
        let slug = ws.object(object)?.api_slug.clone();
        let record = ws
            .records
            .iter_mut()
            .find(|r| r.object == slug && r.record_id == record_id)
            .ok_or_else(|| Error::not_found(format!("record {object}/{record_id}")))?;
        merge_values(&mut record.values, &request.values);
        Ok(record.clone())
    }

    fn delete_record(&self, object: &str, record_id: &str) -> Result<()> {
        self.enter("delete_record")?;
        let mut ws = self.workspace();
        let slug = ws.object(object)?.api_slug.clone();
        let index = ws
            .records
            .iter()
            .position(|r| r.object == slug && r.record_id == record_id)
            .ok_or_else(|| Error::not_found(format!("record {object}/{record_id}")))?;
        ws.records.remove(index);
        Ok(())
    }

    // =========================================================================
    // Entries
    // =========================================================================

    fn get_entry(&self, list: &str, entry_id: &str) -> Result<Entry> {
        self.enter("get_entry")?;
        let ws = self.workspace();
        let slug = &ws.list(list)?.api_slug;
        ws.entries
            .iter()
            .find(|e| e.list == *slug && e.entry_id == entry_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("entry {list}/{entry_id}")))
    }

    fn query_entries(&self, list: &str, filter: &Value, page: Page) -> Result<Vec<Entry>> {
        self.enter("query_entries")?;
        let ws = self.workspace();
        let slug = ws.list(list)?.api_slug.clone();
        let matching = ws.entries.iter().filter(|e| {
            let mut view = e.entry_values.clone();
            merge_values(
                &mut view,
                &serde_json::json!({
                    "parent_record_id": e.parent_record_id,
                    "parent_object": e.parent_object,
                }),
            );
            e.list == slug && matches_filter(&view, filter)
        });
        Ok(paginate(matching, page))
    }

    fn assert_entry(&self, list: &str, request: &AssertEntry) -> Result<Entry> {
        self.enter("assert_entry")?;
        let mut ws = self.workspace();
        let found = ws.list(list)?;
        let slug = found.api_slug.clone();
        if found.parent_object != request.parent_object {
            return Err(validation(format!(
                "list {slug} holds {} records, not {}",
                found.parent_object, request.parent_object
            )));
        }
        if !is_uuid(&request.parent_record_id) {
            return Err(validation(format!(
                "parent_record_id {} is not a valid id",
                request.parent_record_id
            )));
        }

        let matches: Vec<usize> = ws
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.list == slug && e.parent_record_id == request.parent_record_id)
            .map(|(i, _)| i)
            .collect();

        match matches.as_slice() {
            [] => {
                let entry = Entry {
                    entry_id: ws.new_id(),
                    list: slug,
                    parent_record_id: request.parent_record_id.clone(),
                    parent_object: request.parent_object.clone(),
                    entry_values: request.entry_values.clone(),
                };
                ws.entries.push(entry.clone());
                Ok(entry)
            }
            [index] => {
                let entry = &mut ws.entries[*index];
                merge_values(&mut entry.entry_values, &request.entry_values);
                Ok(entry.clone())
            }
            _ => Err(conflict(format!(
                "record {} has multiple entries in {slug}",
                request.parent_record_id
            ))),
        }
    }

    fn update_entry(&self, list: &str, entry_id: &str, request: &UpdateEntry) -> Result<Entry> {
        self.enter("update_entry")?;
        let mut ws = self.workspace();
        let slug = ws.list(list)?.api_slug.clone();
        let entry = ws
            .entries
            .iter_mut()
            .find(|e| e.list == slug && e.entry_id == entry_id)
            .ok_or_else(|| Error::not_found(format!("entry {list}/{entry_id}")))?;
        merge_values(&mut entry.entry_values, &request.entry_values);
        Ok(entry.clone())
    }

    fn delete_entry(&self, list: &str, entry_id: &str) -> Result<()> {
        self.enter("delete_entry")?;
        let mut ws = self.workspace();
        let slug = ws.list(list)?.api_slug.clone();
        let index = ws
            .entries
            .iter()
            .position(|e| e.list == slug && e.entry_id == entry_id)
            .ok_or_else(|| Error::not_found(format!("entry {list}/{entry_id}")))?;
        ws.entries.remove(index);
        Ok(())
    }

    // =========================================================================
    // Notes
    // =========================================================================

    fn get_note(&self, note_id: &str) -> Result<Note> {
        self.enter("get_note")?;
        if !is_uuid(note_id) {
            return Err(validation(format!("note_id {note_id} is not a valid id")));
        }
        self.workspace()
            .notes
            .iter()
            .find(|n| n.note_id == note_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("note {note_id}")))
    }

    fn list_notes(&self, query: &NoteQuery, page: Page) -> Result<Vec<Note>> {
        self.enter("list_notes")?;
        if let Some(parent_record_id) = &query.parent_record_id
            && !is_uuid(parent_record_id)
        {
            return Err(validation(format!(
                "parent_record_id {parent_record_id} is not a valid id"
            )));
        }
        let ws = self.workspace();
        let matching = ws.notes.iter().filter(|n| {
            query
                .parent_object
                .as_ref()
                .is_none_or(|object| n.parent_object == *object)
                && query
                    .parent_record_id
                    .as_ref()
                    .is_none_or(|record| n.parent_record_id == *record)
        });
        Ok(paginate(matching, page))
    }

    fn create_note(&self, request: &CreateNote) -> Result<Note> {
        self.enter("create_note")?;
        if !is_uuid(&request.parent_record_id) {
            return Err(validation(format!(
                "parent_record_id {} is not a valid id",
                request.parent_record_id
            )));
        }
        let mut ws = self.workspace();
        let parent_object = ws.object(&request.parent_object)?.api_slug.clone();
        let note = Note {
            note_id: ws.new_id(),
            parent_object,
            parent_record_id: request.parent_record_id.clone(),
            title: request.title.clone(),
            content_plaintext: request.content.clone(),
            content_markdown: request.content.clone(),
        };
        ws.notes.push(note.clone());
        Ok(note)
    }

    fn delete_note(&self, note_id: &str) -> Result<()> {
        self.enter("delete_note")?;
        let mut ws = self.workspace();
        let index = ws
            .notes
            .iter()
            .position(|n| n.note_id == note_id)
            .ok_or_else(|| Error::not_found(format!("note {note_id}")))?;
        ws.notes.remove(index);
        Ok(())
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    fn get_task(&self, task_id: &str) -> Result<Task> {
        self.enter("get_task")?;
        self.workspace()
            .tasks
            .iter()
            .find(|t| t.task_id == task_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("task {task_id}")))
    }

    fn list_tasks(&self, page: Page) -> Result<Vec<Task>> {
        self.enter("list_tasks")?;
        Ok(paginate(self.workspace().tasks.iter(), page))
    }

    fn create_task(&self, request: &CreateTask) -> Result<Task> {
        self.enter("create_task")?;
        if request.content.is_empty() {
            return Err(validation("task content must not be empty"));
        }
        let mut ws = self.workspace();
        let task = Task {
            task_id: ws.new_id(),
            content: request.content.clone(),
            deadline_at: request.deadline_at.clone(),
            is_completed: request.is_completed,
            linked_records: request.linked_records.clone(),
            assignees: request.assignees.clone(),
        };
        ws.tasks.push(task.clone());
        Ok(task)
    }

    fn update_task(&self, task_id: &str, request: &UpdateTask) -> Result<Task> {
        self.enter("update_task")?;
        let mut ws = self.workspace();
        let task = ws
            .tasks
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or_else(|| Error::not_found(format!("task {task_id}")))?;
        task.deadline_at.clone_from(&request.deadline_at);
        task.is_completed = request.is_completed;
        task.linked_records.clone_from(&request.linked_records);
        task.assignees.clone_from(&request.assignees);
        Ok(task.clone())
    }

    fn delete_task(&self, task_id: &str) -> Result<()> {
        self.enter("delete_task")?;
        let mut ws = self.workspace();
        let index = ws
            .tasks
            .iter()
            .position(|t| t.task_id == task_id)
            .ok_or_else(|| Error::not_found(format!("task {task_id}")))?;
        ws.tasks.remove(index);
        Ok(())
    }

    // =========================================================================
    // Webhooks
    // =========================================================================

    fn get_webhook(&self, webhook_id: &str) -> Result<Webhook> {
        self.enter("get_webhook")?;
        self.workspace()
            .webhooks
            .iter()
            .find(|w| w.webhook_id == webhook_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("webhook {webhook_id}")))
    }

    fn list_webhooks(&self, page: Page) -> Result<Vec<Webhook>> {
        self.enter("list_webhooks")?;
        Ok(paginate(self.workspace().webhooks.iter(), page))
    }

    fn create_webhook(&self, request: &CreateWebhook) -> Result<Webhook> {
        self.enter("create_webhook")?;
        if !request.target_url.starts_with("https://") {
            return Err(validation("target_url must be an https URL"));
        }
        let mut ws = self.workspace();
        let webhook = Webhook {
            webhook_id: ws.new_id(),
            target_url: request.target_url.clone(),
            subscriptions: request.subscriptions.clone(),
            status: "active".to_string(),
            secret: None,
        };
        ws.webhooks.push(webhook.clone());
        Ok(Webhook {
            secret: Some(format!("whsec_{}", webhook.webhook_id.replace('-', ""))),
            ..webhook
        })
    }

    fn update_webhook(&self, webhook_id: &str, request: &UpdateWebhook) -> Result<Webhook> {
        self.enter("update_webhook")?;
        let mut ws = self.workspace();
        let webhook = ws
            .webhooks
            .iter_mut()
            .find(|w| w.webhook_id == webhook_id)
            .ok_or_else(|| Error::not_found(format!("webhook {webhook_id}")))?;
        if let Some(target_url) = &request.target_url {
            webhook.target_url.clone_from(target_url);
        }
        if let Some(subscriptions) = &request.subscriptions {
            webhook.subscriptions.clone_from(subscriptions);
        }
        Ok(webhook.clone())
    }

    fn delete_webhook(&self, webhook_id: &str) -> Result<()> {
        self.enter("delete_webhook")?;
        let mut ws = self.workspace();
        let index = ws
            .webhooks
            .iter()
            .position(|w| w.webhook_id == webhook_id)
            .ok_or_else(|| Error::not_found(format!("webhook {webhook_id}")))?;
        ws.webhooks.remove(index);
        Ok(())
    }
}
