//! Record resource - one record of an object, upserted on a matching attribute

use crmkit::{AssertRecord, Client, Page, Record, UpdateRecord};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ProviderError, Result};
use super::{display_value, found, gone};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordInputs {
    /// Object slug or id
    pub object: String,
    /// Attribute slug the record is asserted on; must appear in `values`
    pub matching_attribute: String,
    pub values: Map<String, Value>,
}

impl RecordInputs {
    fn matching_value(&self) -> Result<&Value> {
        self.values
            .get(&self.matching_attribute)
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                ProviderError::declaration(
                    "record",
                    format!("values must include {}", self.matching_attribute),
                )
            })
    }

    fn display_name(&self) -> String {
        let value = self.values.get(&self.matching_attribute).unwrap_or(&Value::Null);
        format!("{}/{}={}", self.object, self.matching_attribute, display_value(value))
    }

    fn filter(&self) -> Result<Value> {
        let mut filter = Map::new();
        filter.insert(self.matching_attribute.clone(), self.matching_value()?.clone());
        Ok(Value::Object(filter))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutput {
    pub record_id: String,
    pub object: String,
    pub values: Value,
    #[serde(default)]
    pub web_url: Option<String>,
}

impl From<Record> for RecordOutput {
    fn from(record: Record) -> Self {
        Self {
            record_id: record.record_id,
            object: record.object,
            values: record.values,
            web_url: record.web_url,
        }
    }
}

pub struct RecordProvider<'a> {
    client: &'a Client,
}

impl<'a> RecordProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn query_first(&self, inputs: &RecordInputs) -> Result<Option<Record>> {
        let filter = inputs.filter()?;
        let records = self.client.call("query_records", |api| {
            api.query_records(&inputs.object, &filter, Page::first(1))
        });
        Ok(found(records)?.and_then(|records| records.into_iter().next()))
    }
}

impl Provider for RecordProvider<'_> {
    type Inputs = RecordInputs;
    type Output = RecordOutput;
    type Error = ProviderError;

    const KIND: &'static str = "record";
    const STABLE_FIELDS: &'static [&'static str] = &["record_id", "object"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["object", "matching_attribute"]),
        update_on: Fields::Only(&["values"]),
        delete: DeleteStrategy::Hard,
    };

    fn read(
        &self,
        olds: Option<&RecordInputs>,
        output: Option<&RecordOutput>,
    ) -> Result<Option<RecordOutput>> {
        if let Some(out) = output.filter(|o| !o.record_id.is_empty()) {
            let record = self.client.call("get_record", |api| {
                api.get_record(&out.object, &out.record_id)
            });
            return Ok(found(record)?.map(RecordOutput::from));
        }
        match olds {
            Some(olds) => Ok(self.query_first(olds)?.map(RecordOutput::from)),
            None => Ok(None),
        }
    }

    fn create(&self, news: &RecordInputs, notes: &mut dyn Notifier) -> Result<RecordOutput> {
        let name = news.display_name();
        let existed = self.query_first(news)?.is_some();

        let request = AssertRecord {
            values: Value::Object(news.values.clone()),
        };
        let record = self.client.call("assert_record", |api| {
            api.assert_record(&news.object, &news.matching_attribute, &request)
        })?;

        if existed {
            notes.note(&format!("Idempotent Record: found existing {name}"));
        } else {
            notes.note(&format!("Created Record: {name}"));
        }
        Ok(record.into())
    }

    fn update(
        &self,
        news: &RecordInputs,
        output: &RecordOutput,
        notes: &mut dyn Notifier,
    ) -> Result<RecordOutput> {
        if output.record_id.is_empty() {
            return Ok(output.clone());
        }
        let request = UpdateRecord {
            values: Value::Object(news.values.clone()),
        };
        let record = self.client.call("update_record", |api| {
            api.update_record(&output.object, &output.record_id, &request)
        })?;
        notes.note(&format!("Updated Record: {}", news.display_name()));
        Ok(record.into())
    }

    fn delete(
        &self,
        olds: &RecordInputs,
        output: &RecordOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        let name = olds.display_name();
        let existed = !output.object.is_empty()
            && !output.record_id.is_empty()
            && gone(self.client.call("delete_record", |api| {
                api.delete_record(&output.object, &output.record_id)
            }))?;
        if existed {
            notes.note(&format!("Deleted Record: {name}"));
        } else {
            notes.note(&format!("Already absent Record: {name}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::client;
    use declarative::{Decision, NoteBuffer};
    use serde_json::json;

    fn acme(values: Value) -> RecordInputs {
        serde_json::from_value(json!({
            "object": "companies",
            "matching_attribute": "domains",
            "values": values,
        }))
        .unwrap()
    }

    #[test]
    fn test_values_change_is_update() {
        let (client, _) = client();
        let provider = RecordProvider::new(&client);
        let olds = acme(json!({"domains": "acme.com", "name": "Acme"}));
        let news = acme(json!({"domains": "acme.com", "name": "Acme Inc"}));
        assert_eq!(provider.diff(&news, &olds), Some(Decision::Update));

        let mut moved = news.clone();
        moved.object = "people".into();
        assert_eq!(provider.diff(&moved, &olds), Some(Decision::Replace));
    }

    #[test]
    fn test_nested_values_are_deep_compared() {
        let (client, _) = client();
        let provider = RecordProvider::new(&client);
        let a = acme(json!({"domains": "acme.com", "address": {"city": "Berlin"}}));
        let b = acme(json!({"domains": "acme.com", "address": {"city": "Berlin"}}));
        assert_eq!(provider.diff(&a, &b), None);
    }

    #[test]
    fn test_create_is_idempotent() {
        let (client, mock) = client();
        let provider = RecordProvider::new(&client);
        let news = acme(json!({"domains": "acme.com", "name": "Acme"}));
        let mut notes = NoteBuffer::new();

        let first = provider.create(&news, &mut notes).unwrap();
        let second = provider.create(&news, &mut notes).unwrap();

        assert_eq!(first.record_id, second.record_id);
        assert_eq!(mock.calls("assert_record"), 2);
        assert!(notes.contains("Created Record: companies/domains=acme.com"));
        assert!(notes.contains("Idempotent Record: found existing companies/domains=acme.com"));
    }

    #[test]
    fn test_create_requires_matching_value() {
        let (client, mock) = client();
        let provider = RecordProvider::new(&client);
        let news = acme(json!({"name": "Acme"}));

        let err = provider.create(&news, &mut NoteBuffer::new()).unwrap_err();

        assert_eq!(err.tag(), "invalid_declaration");
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn test_assert_conflict_is_fatal() {
        let (client, mock) = client();
        let provider = RecordProvider::new(&client);
        let news = acme(json!({"domains": "acme.com"}));
        mock.fail_next(
            "assert_record",
            crmkit::Error::Conflict {
                message: "duplicate".into(),
            },
        );

        let err = provider.create(&news, &mut NoteBuffer::new()).unwrap_err();

        assert_eq!(err.tag(), "conflict");
        assert_eq!(mock.calls("assert_record"), 1);
    }

    #[test]
    fn test_read_and_delete() {
        let (client, mock) = client();
        let provider = RecordProvider::new(&client);
        let news = acme(json!({"domains": "acme.com"}));
        let output = provider.create(&news, &mut NoteBuffer::new()).unwrap();

        assert_eq!(provider.read(Some(&news), None).unwrap(), Some(output.clone()));

        let mut notes = NoteBuffer::new();
        provider.delete(&news, &output, &mut notes).unwrap();
        provider.delete(&news, &output, &mut notes).unwrap();

        assert!(notes.contains("Deleted Record"));
        assert!(notes.contains("Already absent Record"));
        assert_eq!(mock.calls("delete_record"), 2);
        assert_eq!(provider.read(Some(&news), Some(&output)).unwrap(), None);
    }

    #[test]
    fn test_delete_without_id_makes_no_call() {
        let (client, mock) = client();
        let provider = RecordProvider::new(&client);
        let news = acme(json!({"domains": "acme.com"}));
        let mut output = provider.create(&news, &mut NoteBuffer::new()).unwrap();
        output.record_id.clear();
        mock.reset_calls();

        let mut notes = NoteBuffer::new();
        provider.delete(&news, &output, &mut notes).unwrap();

        assert_eq!(mock.total_calls(), 0);
        assert!(notes.contains("Already absent Record"));
    }

    #[test]
    fn test_update_merges_values() {
        let (client, _) = client();
        let provider = RecordProvider::new(&client);
        let olds = acme(json!({"domains": "acme.com", "name": "Acme"}));
        let output = provider.create(&olds, &mut NoteBuffer::new()).unwrap();

        let news = acme(json!({"domains": "acme.com", "name": "Acme Inc"}));
        let updated = provider.update(&news, &output, &mut NoteBuffer::new()).unwrap();

        assert_eq!(updated.record_id, output.record_id);
        assert_eq!(updated.values["name"], "Acme Inc");
    }
}
