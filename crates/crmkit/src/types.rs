//! Core types for the CRM workspace API.
//!
//! Response types are flattened views of the API payloads: nested id
//! objects are reduced to the single identifier callers address the object
//! by. Request types serialize directly into the `data` envelope the API
//! expects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Default number of items requested per page by paginated scans.
pub const PAGE_SIZE: u32 = 50;

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of items to return
    pub limit: u32,
    /// Number of items to skip
    pub offset: u32,
}

impl Page {
    /// First page of the given size.
    pub fn first(limit: u32) -> Self {
        Self { limit, offset: 0 }
    }

    /// The page immediately after this one.
    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first(PAGE_SIZE)
    }
}

/// Where an attribute lives: on an object or on a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeTarget {
    /// Attribute of an object (e.g. `deals`)
    Objects,
    /// Attribute of a list entry
    Lists,
}

impl AttributeTarget {
    /// Path segment used by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeTarget::Objects => "objects",
            AttributeTarget::Lists => "lists",
        }
    }
}

impl std::fmt::Display for AttributeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Objects
// =============================================================================

/// A workspace object (e.g. `companies`, `deals`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub object_id: String,
    pub api_slug: String,
    pub singular_noun: String,
    pub plural_noun: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateObject {
    pub api_slug: String,
    pub singular_noun: String,
    pub plural_noun: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub singular_noun: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural_noun: Option<String>,
}

// =============================================================================
// Attributes, select options, statuses
// =============================================================================

/// An attribute on an object or list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_id: String,
    pub api_slug: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub is_required: bool,
    pub is_unique: bool,
    pub is_multiselect: bool,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAttribute {
    pub title: String,
    pub description: Option<String>,
    pub api_slug: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub is_required: bool,
    pub is_unique: bool,
    pub is_multiselect: bool,
    pub config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAttribute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `Some(None)` clears the description (sent as `null`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

/// An option of a select attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub option_id: String,
    pub title: String,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSelectOption {
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSelectOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

/// A status of a status attribute (e.g. a deal stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status_id: String,
    pub title: String,
    pub is_archived: bool,
    pub celebration_enabled: bool,
    /// ISO 8601 duration, e.g. `P0Y0M14DT0H0M0S`
    pub target_time_in_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStatus {
    pub title: String,
    pub celebration_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time_in_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celebration_enabled: Option<bool>,
    /// `Some(None)` clears the target time (sent as `null`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time_in_status: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

// =============================================================================
// Lists and entries
// =============================================================================

/// A list (pipeline) of records of one parent object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub list_id: String,
    pub api_slug: String,
    pub name: String,
    pub parent_object: String,
    pub workspace_access: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateList {
    pub name: String,
    pub api_slug: String,
    pub parent_object: String,
    pub workspace_access: String,
    pub workspace_member_access: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A record's membership in a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub entry_id: String,
    pub list: String,
    pub parent_record_id: String,
    pub parent_object: String,
    pub entry_values: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertEntry {
    pub parent_record_id: String,
    pub parent_object: String,
    pub entry_values: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEntry {
    pub entry_values: Value,
}

// =============================================================================
// Records
// =============================================================================

/// A record of an object (a company, a deal, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: String,
    pub object: String,
    pub values: Value,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertRecord {
    pub values: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub values: Value,
}

// =============================================================================
// Notes
// =============================================================================

/// A note attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note_id: String,
    pub parent_object: String,
    pub parent_record_id: String,
    pub title: String,
    pub content_plaintext: String,
    pub content_markdown: String,
}

impl Note {
    /// Content in the given format (`markdown` or anything else for plaintext).
    pub fn content_as(&self, format: &str) -> &str {
        if format == "markdown" {
            &self.content_markdown
        } else {
            &self.content_plaintext
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNote {
    pub parent_object: String,
    pub parent_record_id: String,
    pub title: String,
    /// `plaintext` or `markdown`
    pub format: String,
    pub content: String,
}

/// Filter for listing notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteQuery {
    pub parent_object: Option<String>,
    pub parent_record_id: Option<String>,
}

// =============================================================================
// Tasks
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkedRecord {
    pub target_object: String,
    pub target_record_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignee {
    pub referenced_actor_type: String,
    pub referenced_actor_id: String,
}

/// A task, optionally linked to records and assigned to members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub content: String,
    pub deadline_at: Option<String>,
    pub is_completed: bool,
    pub linked_records: Vec<LinkedRecord>,
    pub assignees: Vec<Assignee>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTask {
    pub content: String,
    pub format: String,
    pub deadline_at: Option<String>,
    pub is_completed: bool,
    pub linked_records: Vec<LinkedRecord>,
    pub assignees: Vec<Assignee>,
}

/// Every field the task update endpoint accepts; content is not among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTask {
    pub deadline_at: Option<String>,
    pub is_completed: bool,
    pub linked_records: Vec<LinkedRecord>,
    pub assignees: Vec<Assignee>,
}

// =============================================================================
// Webhooks
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub event_type: String,
    #[serde(default)]
    pub filter: Option<Value>,
}

/// An outbound webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub webhook_id: String,
    pub target_url: String,
    pub subscriptions: Vec<Subscription>,
    pub status: String,
    /// Signing secret, only returned when the webhook is created
    pub secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWebhook {
    pub target_url: String,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateWebhook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Vec<Subscription>>,
}

// =============================================================================
// Retry
// =============================================================================

/// Configuration for retry logic.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_delay() {
        let config = RetryConfig::default();

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(800));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(1600));
    }

    #[test]
    fn test_retry_config_max_delay() {
        let config = RetryConfig {
            max_delay: Duration::from_millis(500),
            ..RetryConfig::default()
        };

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(9), Duration::from_millis(500));
    }

    #[test]
    fn test_page_next() {
        let page = Page::first(50);
        assert_eq!(page.offset, 0);
        assert_eq!(page.next().offset, 50);
        assert_eq!(page.next().next().offset, 100);
        assert_eq!(page.next().limit, 50);
    }

    #[test]
    fn test_update_requests_skip_unset_fields() {
        let update = UpdateAttribute {
            title: Some("Stage".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "Stage" }));
    }

    #[test]
    fn test_update_requests_send_null_to_clear() {
        let update = UpdateAttribute {
            description: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "description": null }));

        let update = UpdateStatus {
            target_time_in_status: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "target_time_in_status": null }));
    }

    #[test]
    fn test_update_task_always_sends_all_fields() {
        let update = UpdateTask {
            deadline_at: None,
            is_completed: true,
            linked_records: vec![],
            assignees: vec![],
        };
        let json = serde_json::to_value(&update).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["assignees", "deadline_at", "is_completed", "linked_records"]
        );
    }
}
