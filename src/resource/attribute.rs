//! Attribute resource - a field on an object or list

use crmkit::{Attribute, AttributeTarget, Client, CreateAttribute, UpdateAttribute};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ProviderError, Result};
use super::{ensure_same, found, slugify};

/// Declared attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeInputs {
    /// `objects` or `lists`
    pub target: AttributeTarget,
    /// Slug or id of the parent object or list
    pub identifier: String,
    /// Defaults to the title, slugified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_slug: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub attribute_type: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_multiselect: bool,
    /// Type-specific configuration, sent on create only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl AttributeInputs {
    /// The slug this declaration addresses
    pub fn slug(&self) -> String {
        self.api_slug
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&self.title))
    }

    fn display_name(&self) -> String {
        format!("{}.{}", self.identifier, self.slug())
    }
}

/// Materialized attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeOutput {
    pub attribute_id: String,
    pub target: AttributeTarget,
    pub identifier: String,
    pub api_slug: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub is_required: bool,
    pub is_unique: bool,
    pub is_multiselect: bool,
}

impl AttributeOutput {
    fn from_remote(target: AttributeTarget, identifier: &str, attribute: Attribute) -> Self {
        Self {
            attribute_id: attribute.attribute_id,
            target,
            identifier: identifier.to_string(),
            api_slug: attribute.api_slug,
            title: attribute.title,
            description: attribute.description,
            attribute_type: attribute.attribute_type,
            is_required: attribute.is_required,
            is_unique: attribute.is_unique,
            is_multiselect: attribute.is_multiselect,
        }
    }

    fn differs_from(&self, news: &AttributeInputs) -> bool {
        self.title != news.title
            || (news.description.is_some() && self.description != news.description)
            || self.is_required != news.is_required
            || self.is_unique != news.is_unique
    }
}

/// Attributes cannot be deleted through the API, only archived in the UI.
pub struct AttributeProvider<'a> {
    client: &'a Client,
}

impl<'a> AttributeProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn lookup(
        &self,
        target: AttributeTarget,
        identifier: &str,
        attribute: &str,
    ) -> Result<Option<Attribute>> {
        let result = self.client.call("get_attribute", |api| {
            api.get_attribute(target, identifier, attribute)
        });
        Ok(found(result)?)
    }
}

impl Provider for AttributeProvider<'_> {
    type Inputs = AttributeInputs;
    type Output = AttributeOutput;
    type Error = ProviderError;

    const KIND: &'static str = "attribute";
    const STABLE_FIELDS: &'static [&'static str] =
        &["attribute_id", "target", "identifier", "api_slug", "type"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["target", "identifier", "type", "api_slug", "is_multiselect"]),
        update_on: Fields::Only(&["title", "description", "is_required", "is_unique"]),
        delete: DeleteStrategy::Unsupported,
    };

    /// A missing `api_slug` keeps the slug the attribute already has
    fn resolve(
        news: &AttributeInputs,
        olds: &AttributeInputs,
    ) -> (AttributeInputs, AttributeInputs) {
        let mut olds = olds.clone();
        olds.api_slug = Some(olds.slug());
        let mut news = news.clone();
        if news.api_slug.as_deref().is_none_or(str::is_empty) {
            news.api_slug.clone_from(&olds.api_slug);
        }
        (news, olds)
    }

    fn same_address(news: &AttributeInputs, olds: &AttributeInputs) -> bool {
        news.target == olds.target
            && news.identifier == olds.identifier
            && news.slug() == olds.slug()
    }

    fn read(
        &self,
        olds: Option<&AttributeInputs>,
        output: Option<&AttributeOutput>,
    ) -> Result<Option<AttributeOutput>> {
        let (target, identifier, key) = match (output, olds) {
            (Some(out), _) if !out.attribute_id.is_empty() => {
                (out.target, out.identifier.clone(), out.attribute_id.clone())
            }
            (Some(out), _) if !out.api_slug.is_empty() => {
                (out.target, out.identifier.clone(), out.api_slug.clone())
            }
            (_, Some(olds)) => (olds.target, olds.identifier.clone(), olds.slug()),
            _ => return Ok(None),
        };

        Ok(self
            .lookup(target, &identifier, &key)?
            .filter(|a| !a.is_archived)
            .map(|a| AttributeOutput::from_remote(target, &identifier, a)))
    }

    fn create(&self, news: &AttributeInputs, notes: &mut dyn Notifier) -> Result<AttributeOutput> {
        let slug = news.slug();
        if slug.is_empty() {
            return Err(ProviderError::declaration(
                Self::KIND,
                "api_slug or a title with letters or digits is required",
            ));
        }
        let name = news.display_name();

        if let Some(existing) = self.lookup(news.target, &news.identifier, &slug)? {
            ensure_same(Self::KIND, &name, "type", &news.attribute_type, &existing.attribute_type)?;
            ensure_same(
                Self::KIND,
                &name,
                "is_multiselect",
                &news.is_multiselect.to_string(),
                &existing.is_multiselect.to_string(),
            )?;

            let existing = if existing.is_archived {
                let restored = self.client.call("update_attribute", |api| {
                    api.update_attribute(
                        news.target,
                        &news.identifier,
                        &slug,
                        &UpdateAttribute {
                            is_archived: Some(false),
                            ..Default::default()
                        },
                    )
                })?;
                notes.note(&format!("Unarchived Attribute: {name}"));
                restored
            } else {
                existing
            };

            notes.note(&format!("Idempotent Attribute: found existing {name}"));
            let output = AttributeOutput::from_remote(news.target, &news.identifier, existing);
            if output.differs_from(news) {
                return self.update(news, &output, notes);
            }
            return Ok(output);
        }

        let request = CreateAttribute {
            title: news.title.clone(),
            description: news.description.clone(),
            api_slug: slug,
            attribute_type: news.attribute_type.clone(),
            is_required: news.is_required,
            is_unique: news.is_unique,
            is_multiselect: news.is_multiselect,
            config: news.config.clone().unwrap_or_else(|| Value::Object(Default::default())),
            default_value: news.default_value.clone(),
        };
        let created = self.client.call("create_attribute", |api| {
            api.create_attribute(news.target, &news.identifier, &request)
        })?;
        notes.note(&format!("Created Attribute: {name}"));
        Ok(AttributeOutput::from_remote(news.target, &news.identifier, created))
    }

    fn update(
        &self,
        news: &AttributeInputs,
        output: &AttributeOutput,
        notes: &mut dyn Notifier,
    ) -> Result<AttributeOutput> {
        let slug = if output.api_slug.is_empty() {
            news.api_slug.clone().unwrap_or_default()
        } else {
            output.api_slug.clone()
        };
        if slug.is_empty() {
            log::debug!("attribute {}: no slug to address, keeping output", news.title);
            return Ok(output.clone());
        }

        let request = UpdateAttribute {
            title: Some(news.title.clone()),
            description: Some(news.description.clone()),
            is_required: Some(news.is_required),
            is_unique: Some(news.is_unique),
            is_archived: None,
        };
        let updated = self.client.call("update_attribute", |api| {
            api.update_attribute(output.target, &output.identifier, &slug, &request)
        })?;
        notes.note(&format!("Updated Attribute: {}.{slug}", output.identifier));
        Ok(AttributeOutput::from_remote(output.target, &output.identifier, updated))
    }

    fn delete(
        &self,
        _olds: &AttributeInputs,
        output: &AttributeOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        notes.note(&format!(
            "Attribute {}.{} cannot be deleted through the API; it remains in the workspace",
            output.identifier, output.api_slug
        ));
        Ok(())
    }
}
