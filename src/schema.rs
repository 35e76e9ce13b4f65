//! Layout configuration schemas and the resolver that merges request parameters with defaults.
//!
//! Resolution is two independent steps: [`apply_defaults`] builds the candidate values and
//! [`validate`] checks them against the schema. [`resolve`] runs both and never hands out a
//! partially valid configuration.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Constraint, ValidationError};
use crate::layout::LayoutDefinition;

/// Query-style request parameters. Unknown keys are ignored.
pub type RawParams = HashMap<String, String>;

pub static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Url,
    OneOf(&'static [&'static str]),
    Pattern(&'static Lazy<Regex>),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldSpec {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            nullable: false,
        }
    }

    pub const fn url(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Url,
            nullable: false,
        }
    }

    pub const fn one_of(name: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::OneOf(options),
            nullable: false,
        }
    }

    pub const fn pattern(name: &'static str, pattern: &'static Lazy<Regex>) -> Self {
        Self {
            name,
            kind: FieldKind::Pattern(pattern),
            nullable: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn check(&self, value: Option<&str>) -> Result<(), ValidationError> {
        let Some(value) = value else {
            if self.nullable {
                return Ok(());
            }
            return Err(ValidationError::new(self.name, Constraint::Required));
        };
        if value.trim().is_empty() {
            return Err(ValidationError::new(self.name, Constraint::NonEmpty));
        }
        match self.kind {
            FieldKind::Text => Ok(()),
            FieldKind::Url => match Url::parse(value) {
                Ok(_) => Ok(()),
                Err(_) => Err(ValidationError::new(self.name, Constraint::AbsoluteUrl)),
            },
            FieldKind::OneOf(options) => {
                if options.contains(&value) {
                    Ok(())
                } else {
                    Err(ValidationError::new(self.name, Constraint::OneOf(options)))
                }
            }
            FieldKind::Pattern(regex) => {
                let regex: &'static Regex = regex;
                if regex.is_match(value) {
                    Ok(())
                } else {
                    Err(ValidationError::new(
                        self.name,
                        Constraint::Pattern(regex.as_str()),
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// A declared property with the value used when the request omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    pub name: &'static str,
    pub default: &'static str,
}

/// Schema-conforming configuration. Every schema field is present, either with a value or as an
/// explicit `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    layout: &'static str,
    values: BTreeMap<String, Option<String>>,
}

impl ResolvedConfig {
    pub fn layout(&self) -> &'static str {
        self.layout
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|value| value.as_deref())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn values(&self) -> &BTreeMap<String, Option<String>> {
        &self.values
    }

    /// Decodes the values into a layout's typed configuration.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let value = serde_json::to_value(&self.values)?;
        serde_json::from_value(value)
    }
}

/// Picks, for each schema field, the request value when it is present and not blank, otherwise
/// the declared default, otherwise `None`.
pub fn apply_defaults(
    schema: &Schema,
    properties: &[Property],
    raw: &RawParams,
) -> BTreeMap<String, Option<String>> {
    let mut values = BTreeMap::new();
    for field in schema.fields {
        let requested = raw
            .get(field.name)
            .filter(|value| !value.trim().is_empty())
            .cloned();
        let value = requested.or_else(|| {
            properties
                .iter()
                .find(|property| property.name == field.name)
                .map(|property| property.default.to_string())
        });
        values.insert(field.name.to_string(), value);
    }
    values
}

/// Checks merged values against the schema, reporting the first offending field in schema order.
pub fn validate(
    schema: &Schema,
    values: &BTreeMap<String, Option<String>>,
) -> Result<(), ValidationError> {
    for field in schema.fields {
        let value = values.get(field.name).and_then(|value| value.as_deref());
        field.check(value)?;
    }
    Ok(())
}

pub fn resolve(
    layout: &LayoutDefinition,
    raw: &RawParams,
) -> Result<ResolvedConfig, ValidationError> {
    let values = apply_defaults(&layout.schema, layout.properties, raw);
    validate(&layout.schema, &values)?;
    Ok(ResolvedConfig {
        layout: layout.name,
        values,
    })
}
