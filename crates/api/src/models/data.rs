use super::instance::TableSpec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    #[default]
    Ok,
    BadRequest,
    NotFound,
    Conflict,
    Timeout,
    InternalError,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::BadRequest => "bad_request",
            StatusCode::NotFound => "not_found",
            StatusCode::Conflict => "conflict",
            StatusCode::Timeout => "timeout",
            StatusCode::InternalError => "internal_error",
        }
    }
}

/// Outcome of a backend call, carried inside every `DataResult`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct ServiceStatus {
    pub code: StatusCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ServiceStatus {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code.as_str())
        } else {
            write!(f, "{}: {}", self.code.as_str(), self.message)
        }
    }
}

/// Single-field equality filter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct QueryFilter {
    pub field: String,
    pub value: Value,
}

impl QueryFilter {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &DataRow) -> bool {
        row.fields.get(&self.field) == Some(&self.value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct QuerySort {
    pub field: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub desc: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct DataQuery {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_name: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<QueryFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<QuerySort>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub limit: u64,
}

impl DataQuery {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some(QueryFilter::new(field, value));
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct DataInsert {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_name: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl DataInsert {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct DataRow {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl DataRow {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

impl From<BTreeMap<String, Value>> for DataRow {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct DataResult {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<TableSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<DataRow>,
}

impl DataResult {
    pub fn ok(rows: Vec<DataRow>) -> Self {
        Self {
            status: Some(ServiceStatus::ok()),
            rows,
            ..Default::default()
        }
    }

    pub fn with_status(status: ServiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// A result without a status is not considered successful.
    pub fn is_ok(&self) -> bool {
        self.status.as_ref().is_some_and(ServiceStatus::is_ok)
    }
}

/// Batch response used by datalet runs and dictionary queries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct DataResults {
    pub kind: String,
    #[serde(default)]
    pub results: Vec<DataResult>,
}

impl Default for DataResults {
    fn default() -> Self {
        Self {
            kind: "DataResults".to_string(),
            results: Vec::new(),
        }
    }
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_defaults() {
        let rs = DataResult::default();
        assert!(!rs.is_ok());
        assert!(DataResult::ok(vec![]).is_ok());

        let status = ServiceStatus::new(StatusCode::Timeout, "status not found");
        assert_eq!(status.to_string(), "timeout: status not found");
        assert_eq!(ServiceStatus::ok().to_string(), "ok");
    }

    #[test]
    fn test_query_wire_format() {
        let q: DataQuery = serde_json::from_value(json!({
            "table_name": "lynk_dict",
            "filter": {"field": "ns", "value": "index"},
            "limit": 10
        }))
        .unwrap();
        assert_eq!(q.table_name, "lynk_dict");
        assert_eq!(q.limit, 10);
        assert!(q.instance_name.is_empty());

        let row = DataRow::from(
            [("ns".to_string(), json!("index"))]
                .into_iter()
                .collect::<BTreeMap<_, _>>(),
        );
        assert!(q.filter.as_ref().unwrap().matches(&row));
    }
}
