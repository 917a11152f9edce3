//! File-defined UI widgets ("pagelets") and their template variants.

use super::data::{QueryFilter, QuerySort};
use super::instance::TableSpec;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Data-query portion of a widget.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct Datalet {
    #[serde(default)]
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<QueryFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<QuerySort>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<DataletList>,
    /// Attached when the widget is served, never read from disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_spec: Option<TableSpec>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Datalet {
    /// Sort given on the datalet itself, else the one under `list`.
    pub fn effective_sort(&self) -> Option<&QuerySort> {
        self.sort
            .as_ref()
            .or_else(|| self.list.as_ref().and_then(|l| l.sort.as_ref()))
    }
}

/// List presentation settings of a datalet.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct DataletList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<QuerySort>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct TemplateLayout {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub width: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub height: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub style_class: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cols: Vec<TemplateLayout>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct TemplateNav {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display: String,
}

/// Raw markup, either inline or referenced by file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct TemplateHtml {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Layout(TemplateLayout),
    Nav(TemplateNav),
    Html(TemplateHtml),
}

impl Template {
    pub fn kind(&self) -> &'static str {
        match self {
            Template::Layout(_) => "layout",
            Template::Nav(_) => "nav",
            Template::Html(_) => "html",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct Pagelet {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datalet: Option<Datalet>,
    #[serde(
        default,
        deserialize_with = "template_or_empty",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Template>")]
    pub template: Option<Template>,
    /// Fields this crate does not interpret, kept for canonical write-back.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// An empty `template` object means no template.
fn template_or_empty<'de, D>(deserializer: D) -> Result<Option<Template>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => Template::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}
