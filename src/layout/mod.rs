//! Layout registry.
//!
//! The set of layouts is closed: every layout is a [`LayoutKind`] variant, and [`Registry`] is
//! built from those variants once at startup and only read afterwards.

mod onion;
mod simple;
pub(crate) mod text;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::enrich::{EnrichedConfig, RecordOverride};
use crate::error::{PipelineError, RenderError};
use crate::ir::Scene;
use crate::schema::{FieldKind, Property, Schema};
use crate::theme::Theme;

/// Canvas and styling shared by every layout render.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub theme: &'a Theme,
    pub width: f32,
    pub height: f32,
}

pub type RenderFn = fn(&EnrichedConfig, &RenderContext<'_>) -> Result<Scene, RenderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayoutKind {
    Onion,
    Simple,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 2] = [LayoutKind::Onion, LayoutKind::Simple];

    pub fn definition(self) -> LayoutDefinition {
        match self {
            LayoutKind::Onion => onion::definition(),
            LayoutKind::Simple => simple::definition(),
        }
    }
}

#[derive(Clone, Copy)]
pub struct LayoutDefinition {
    pub kind: LayoutKind,
    pub name: &'static str,
    pub schema: Schema,
    pub properties: &'static [Property],
    /// Record fields that replace configuration fields when a record is bound.
    pub overrides: &'static [RecordOverride],
    render: RenderFn,
}

impl LayoutDefinition {
    pub fn render(
        &self,
        config: &EnrichedConfig,
        ctx: &RenderContext<'_>,
    ) -> Result<Scene, RenderError> {
        (self.render)(config, ctx)
    }

    pub fn describe(&self) -> LayoutSummary {
        let properties = self
            .schema
            .fields
            .iter()
            .map(|field| {
                let (kind, options) = match field.kind {
                    FieldKind::Text => ("text", Vec::new()),
                    FieldKind::Url => ("url", Vec::new()),
                    FieldKind::OneOf(options) => ("select", options.to_vec()),
                    FieldKind::Pattern(_) => ("color", Vec::new()),
                };
                PropertySummary {
                    name: field.name,
                    kind,
                    nullable: field.nullable,
                    default: self
                        .properties
                        .iter()
                        .find(|property| property.name == field.name)
                        .map(|property| property.default),
                    options,
                }
            })
            .collect();
        LayoutSummary {
            name: self.name,
            properties,
        }
    }
}

impl fmt::Debug for LayoutDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutDefinition")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("properties", &self.properties)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSummary {
    pub name: &'static str,
    pub properties: Vec<PropertySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySummary {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub nullable: bool,
    pub default: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    layouts: BTreeMap<&'static str, LayoutDefinition>,
}

impl Registry {
    pub fn builtin() -> Self {
        Self::from_kinds(&LayoutKind::ALL)
    }

    fn from_kinds(kinds: &[LayoutKind]) -> Self {
        let mut layouts = BTreeMap::new();
        for kind in kinds {
            let definition = kind.definition();
            debug_assert_eq!(definition.name, definition.name.to_lowercase());
            let previous = layouts.insert(definition.name, definition);
            debug_assert!(previous.is_none(), "duplicate layout `{}`", definition.name);
        }
        Self { layouts }
    }

    /// Case-insensitive lookup by layout name.
    pub fn lookup(&self, name: &str) -> Result<&LayoutDefinition, PipelineError> {
        let key = name.to_lowercase();
        self.layouts
            .get(key.as_str())
            .ok_or_else(|| PipelineError::NotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutDefinition> {
        self.layouts.values()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.layouts.keys().copied().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = Registry::builtin();
        assert_eq!(registry.lookup("ONION").unwrap().kind, LayoutKind::Onion);
        assert_eq!(registry.lookup("Simple").unwrap().kind, LayoutKind::Simple);
    }

    #[test]
    fn lookup_unknown_layout_is_not_found() {
        let registry = Registry::builtin();
        let err = registry.lookup("doesNotExist").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(ref name) if name == "doesNotExist"));
    }

    #[test]
    fn every_kind_is_registered_once() {
        let registry = Registry::builtin();
        assert_eq!(registry.names().len(), LayoutKind::ALL.len());
        for kind in LayoutKind::ALL {
            let definition = kind.definition();
            assert_eq!(registry.lookup(definition.name).unwrap().kind, kind);
        }
    }

    #[test]
    fn declared_properties_belong_to_the_schema() {
        for definition in Registry::builtin().iter() {
            for property in definition.properties {
                assert!(
                    definition.schema.field(property.name).is_some(),
                    "{}: property {} missing from schema",
                    definition.name,
                    property.name
                );
            }
            for entry in definition.overrides {
                assert!(definition.schema.field(entry.config_field).is_some());
            }
        }
    }

    #[test]
    fn describe_lists_defaults_and_options() {
        let registry = Registry::builtin();
        let summary = registry.lookup("simple").unwrap().describe();
        let theme = summary
            .properties
            .iter()
            .find(|property| property.name == "Theme")
            .unwrap();
        assert_eq!(theme.kind, "select");
        assert_eq!(theme.options, vec!["light", "dark"]);
        assert_eq!(theme.default, Some("dark"));
    }
}
