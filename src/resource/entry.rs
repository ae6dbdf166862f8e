//! Entry resource - a record's membership in a list

use crmkit::{AssertEntry, Client, Entry, Page, UpdateEntry};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::error::{ProviderError, Result};
use super::{found, gone};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryInputs {
    /// List slug or id
    pub list: String,
    pub parent_object: String,
    pub parent_record_id: String,
    #[serde(default)]
    pub entry_values: Map<String, Value>,
}

impl EntryInputs {
    fn display_name(&self) -> String {
        format!("{}/{}", self.list, self.parent_record_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryOutput {
    pub entry_id: String,
    pub list: String,
    pub parent_object: String,
    pub parent_record_id: String,
    pub entry_values: Value,
}

impl From<Entry> for EntryOutput {
    fn from(entry: Entry) -> Self {
        Self {
            entry_id: entry.entry_id,
            list: entry.list,
            parent_object: entry.parent_object,
            parent_record_id: entry.parent_record_id,
            entry_values: entry.entry_values,
        }
    }
}

pub struct EntryProvider<'a> {
    client: &'a Client,
}

impl<'a> EntryProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn query_first(&self, inputs: &EntryInputs) -> Result<Option<Entry>> {
        let filter = json!({ "parent_record_id": inputs.parent_record_id });
        let entries = self.client.call("query_entries", |api| {
            api.query_entries(&inputs.list, &filter, Page::first(1))
        });
        Ok(found(entries)?.and_then(|entries| entries.into_iter().next()))
    }
}

impl Provider for EntryProvider<'_> {
    type Inputs = EntryInputs;
    type Output = EntryOutput;
    type Error = ProviderError;

    const KIND: &'static str = "entry";
    const STABLE_FIELDS: &'static [&'static str] =
        &["entry_id", "list", "parent_object", "parent_record_id"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["list", "parent_object", "parent_record_id"]),
        update_on: Fields::Only(&["entry_values"]),
        delete: DeleteStrategy::Hard,
    };

    fn read(
        &self,
        olds: Option<&EntryInputs>,
        output: Option<&EntryOutput>,
    ) -> Result<Option<EntryOutput>> {
        if let Some(out) = output.filter(|o| !o.entry_id.is_empty()) {
            let entry = self
                .client
                .call("get_entry", |api| api.get_entry(&out.list, &out.entry_id));
            return Ok(found(entry)?.map(EntryOutput::from));
        }
        match olds {
            Some(olds) => Ok(self.query_first(olds)?.map(EntryOutput::from)),
            None => Ok(None),
        }
    }

    fn create(&self, news: &EntryInputs, notes: &mut dyn Notifier) -> Result<EntryOutput> {
        let name = news.display_name();
        let existed = self.query_first(news)?.is_some();

        let request = AssertEntry {
            parent_record_id: news.parent_record_id.clone(),
            parent_object: news.parent_object.clone(),
            entry_values: Value::Object(news.entry_values.clone()),
        };
        let entry = self
            .client
            .call("assert_entry", |api| api.assert_entry(&news.list, &request))?;

        if existed {
            notes.note(&format!("Idempotent Entry: found existing {name}"));
        } else {
            notes.note(&format!("Created Entry: {name}"));
        }
        Ok(entry.into())
    }

    fn update(
        &self,
        news: &EntryInputs,
        output: &EntryOutput,
        notes: &mut dyn Notifier,
    ) -> Result<EntryOutput> {
        if output.entry_id.is_empty() {
            return Ok(output.clone());
        }
        let request = UpdateEntry {
            entry_values: Value::Object(news.entry_values.clone()),
        };
        let entry = self.client.call("update_entry", |api| {
            api.update_entry(&output.list, &output.entry_id, &request)
        })?;
        notes.note(&format!("Updated Entry: {}", news.display_name()));
        Ok(entry.into())
    }

    fn delete(
        &self,
        olds: &EntryInputs,
        output: &EntryOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        let name = olds.display_name();
        let existed = !output.list.is_empty()
            && !output.entry_id.is_empty()
            && gone(self.client.call("delete_entry", |api| {
                api.delete_entry(&output.list, &output.entry_id)
            }))?;
        if existed {
            notes.note(&format!("Deleted Entry: {name}"));
        } else {
            notes.note(&format!("Already absent Entry: {name}"));
        }
        Ok(())
    }
}
