//! Stack file: the declared resources
//!
//! ```toml
//! [[resources]]
//! name = "deal-stage"
//! kind = "attribute"
//! properties = { target = "objects", identifier = "deals", type = "status", title = "Stage" }
//! ```
//!
//! Values are literal. References between resources are not resolved, so
//! ids of records created elsewhere must be written out.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::resource::Kind;

// ============================================================================
// Stack Schema
// ============================================================================

/// All declarations of one stack file, in apply order
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Stack {
    #[serde(default)]
    pub resources: Vec<Declaration>,
}

/// One declared resource
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Declaration {
    /// Unique name, used as the state key
    pub name: String,

    pub kind: Kind,

    /// Kind-specific properties
    #[serde(default = "empty_properties")]
    pub properties: Value,
}

fn empty_properties() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Stack {
    /// Load and validate a stack file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read stack file: {}", path.display()))?;
        let stack = Self::parse(&content)
            .with_context(|| format!("Invalid stack file: {}", path.display()))?;
        log::debug!(
            "Loaded {} declarations from {}",
            stack.resources.len(),
            path.display()
        );
        Ok(stack)
    }

    /// Parse and validate stack TOML
    pub fn parse(content: &str) -> Result<Self> {
        let stack: Stack = toml::from_str(content).context("Invalid TOML format")?;
        stack.validate()?;
        Ok(stack)
    }

    /// Check names and decode every declaration's properties
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for declaration in &self.resources {
            if declaration.name.trim().is_empty() {
                bail!("A {} resource has an empty name", declaration.kind);
            }
            if !seen.insert(declaration.name.as_str()) {
                bail!("Resource name '{}' is declared more than once", declaration.name);
            }
            declaration
                .inputs()
                .with_context(|| format!("Invalid resource '{}'", declaration.name))?;
        }
        Ok(())
    }

    /// Find a declaration by name
    pub fn find(&self, name: &str) -> Option<&Declaration> {
        self.resources.iter().find(|d| d.name == name)
    }
}

impl Declaration {
    /// Properties decoded for the kind and re-encoded with defaults filled in
    pub fn inputs(&self) -> Result<Value> {
        Ok(self.kind.validate(&self.properties)?)
    }

    /// `kind.name`, as accepted by `--target`
    pub fn address(&self) -> String {
        format!("{}.{}", self.kind, self.name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STACK: &str = r#"
[[resources]]
name = "deals"
kind = "object"
properties = { api_slug = "deals", singular_noun = "Deal", plural_noun = "Deals" }

[[resources]]
name = "deal-stage"
kind = "attribute"

[resources.properties]
target = "objects"
identifier = "deals"
type = "status"
title = "Stage"

[[resources]]
name = "won"
kind = "status"
properties = { target = "objects", identifier = "deals", attribute = "stage", title = "Won", celebration_enabled = true }
"#;

    #[test]
    fn test_parse_stack() {
        let stack = Stack::parse(STACK).unwrap();

        assert_eq!(stack.resources.len(), 3);
        assert_eq!(stack.resources[1].kind, Kind::Attribute);
        assert_eq!(stack.resources[1].properties["type"], "status");
        assert_eq!(stack.find("won").unwrap().address(), "status.won");
    }

    #[test]
    fn test_inputs_are_normalized() {
        let stack = Stack::parse(STACK).unwrap();
        let inputs = stack.find("deal-stage").unwrap().inputs().unwrap();

        assert_eq!(inputs["is_required"], false);
        assert_eq!(inputs["is_multiselect"], false);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let content = r#"
[[resources]]
name = "deals"
kind = "object"
properties = { api_slug = "deals", singular_noun = "Deal", plural_noun = "Deals" }

[[resources]]
name = "deals"
kind = "object"
properties = { api_slug = "deals2", singular_noun = "Deal", plural_noun = "Deals" }
"#;
        let err = Stack::parse(content).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let content = r#"
[[resources]]
name = "w"
kind = "widget"
"#;
        assert!(Stack::parse(content).is_err());
    }

    #[test]
    fn test_bad_properties_name_the_resource() {
        let content = r#"
[[resources]]
name = "broken"
kind = "task"
properties = { deadline_at = "2026-11-01T09:00:00Z" }
"#;
        let err = Stack::parse(content).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid resource 'broken'"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let content = r#"
[[resources]]
name = " "
kind = "task"
properties = { content = "x" }
"#;
        assert!(Stack::parse(content).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crmform.toml");
        std::fs::write(&path, STACK).unwrap();

        let stack = Stack::load(&path).unwrap();
        assert_eq!(stack.resources.len(), 3);

        assert!(Stack::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_empty_stack() {
        let stack = Stack::parse("").unwrap();
        assert!(stack.resources.is_empty());
    }
}
