//! Backend abstraction for remote API operations.
//!
//! The [`Backend`] trait has one method per remote operation, allowing for
//! different implementations (real HTTP, in-memory mock for testing).
//! Implementations perform a single attempt; retrying is the caller's job.

pub mod http;
pub mod mock;

use crate::error::Result;
use crate::types::{
    AssertEntry, AssertRecord, Attribute, AttributeTarget, CreateAttribute, CreateList,
    CreateNote, CreateObject, CreateSelectOption, CreateStatus, CreateTask, CreateWebhook, Entry,
    List, Note, NoteQuery, Object, Page, Record, SelectOption, Status, Task, UpdateAttribute,
    UpdateEntry, UpdateList, UpdateObject, UpdateRecord, UpdateSelectOption, UpdateStatus,
    UpdateTask, UpdateWebhook, Webhook,
};
use serde_json::Value;

/// Backend trait for the CRM workspace API.
///
/// Objects, lists and attributes are addressed by api slug or id; select
/// options and statuses by id or title.
pub trait Backend: Send + Sync {
    // Objects
    fn get_object(&self, object: &str) -> Result<Object>;
    fn list_objects(&self) -> Result<Vec<Object>>;
    fn create_object(&self, request: &CreateObject) -> Result<Object>;
    fn update_object(&self, object: &str, request: &UpdateObject) -> Result<Object>;

    // Attributes
    fn get_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
    ) -> Result<Attribute>;
    fn list_attributes(
        &self,
        target: AttributeTarget,
        identifier: &str,
        page: Page,
        show_archived: bool,
    ) -> Result<Vec<Attribute>>;
    fn create_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        request: &CreateAttribute,
    ) -> Result<Attribute>;
    fn update_attribute(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &UpdateAttribute,
    ) -> Result<Attribute>;

    // Select options
    fn list_select_options(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        show_archived: bool,
    ) -> Result<Vec<SelectOption>>;
    fn create_select_option(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &CreateSelectOption,
    ) -> Result<SelectOption>;
    fn update_select_option(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        option: &str,
        request: &UpdateSelectOption,
    ) -> Result<SelectOption>;

    // Statuses
    fn list_statuses(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        show_archived: bool,
    ) -> Result<Vec<Status>>;
    fn create_status(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        request: &CreateStatus,
    ) -> Result<Status>;
    fn update_status(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
        status: &str,
        request: &UpdateStatus,
    ) -> Result<Status>;

    // Lists
    fn get_list(&self, list: &str) -> Result<List>;
    fn list_lists(&self) -> Result<Vec<List>>;
    fn create_list(&self, request: &CreateList) -> Result<List>;
    fn update_list(&self, list: &str, request: &UpdateList) -> Result<List>;

    // Records
    fn get_record(&self, object: &str, record_id: &str) -> Result<Record>;
    /// Records whose values equal every key of `filter`.
    fn query_records(&self, object: &str, filter: &Value, page: Page) -> Result<Vec<Record>>;
    /// Find-or-create keyed by `matching_attribute`.
    fn assert_record(
        &self,
        object: &str,
        matching_attribute: &str,
        request: &AssertRecord,
    ) -> Result<Record>;
    fn update_record(&self, object: &str, record_id: &str, request: &UpdateRecord)
    -> Result<Record>;
    fn delete_record(&self, object: &str, record_id: &str) -> Result<()>;

    // Entries
    fn get_entry(&self, list: &str, entry_id: &str) -> Result<Entry>;
    fn query_entries(&self, list: &str, filter: &Value, page: Page) -> Result<Vec<Entry>>;
    /// Find-or-create keyed by the parent record.
    fn assert_entry(&self, list: &str, request: &AssertEntry) -> Result<Entry>;
    fn update_entry(&self, list: &str, entry_id: &str, request: &UpdateEntry) -> Result<Entry>;
    fn delete_entry(&self, list: &str, entry_id: &str) -> Result<()>;

    // Notes
    fn get_note(&self, note_id: &str) -> Result<Note>;
    fn list_notes(&self, query: &NoteQuery, page: Page) -> Result<Vec<Note>>;
    fn create_note(&self, request: &CreateNote) -> Result<Note>;
    fn delete_note(&self, note_id: &str) -> Result<()>;

    // Tasks
    fn get_task(&self, task_id: &str) -> Result<Task>;
    fn list_tasks(&self, page: Page) -> Result<Vec<Task>>;
    fn create_task(&self, request: &CreateTask) -> Result<Task>;
    fn update_task(&self, task_id: &str, request: &UpdateTask) -> Result<Task>;
    fn delete_task(&self, task_id: &str) -> Result<()>;

    // Webhooks
    fn get_webhook(&self, webhook_id: &str) -> Result<Webhook>;
    fn list_webhooks(&self, page: Page) -> Result<Vec<Webhook>>;
    fn create_webhook(&self, request: &CreateWebhook) -> Result<Webhook>;
    fn update_webhook(&self, webhook_id: &str, request: &UpdateWebhook) -> Result<Webhook>;
    fn delete_webhook(&self, webhook_id: &str) -> Result<()>;
}
