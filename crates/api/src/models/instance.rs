use super::data::ServiceStatus;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Schema of one physical table inside an instance.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct TableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_fields: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct InstanceSpec {
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

impl InstanceSpec {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct ConnectSpec {
    pub address: String,
}

/// A named backend. Instances with `connect` are served by a remote client.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct DataInstance {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<InstanceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect: Option<ConnectSpec>,
}

impl DataInstance {
    pub fn local(name: impl Into<String>, spec: InstanceSpec) -> Self {
        Self {
            name: name.into(),
            spec: Some(spec),
            connect: None,
        }
    }

    pub fn remote(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: None,
            connect: Some(ConnectSpec {
                address: address.into(),
            }),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.connect.is_some()
    }

    pub fn has_spec(&self) -> bool {
        self.spec.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn table_spec(&self, table: &str) -> Option<&TableSpec> {
        self.spec.as_ref().and_then(|s| s.table(table))
    }
}

/// Logical table exposed to widgets, mapped onto `(ref_instance, ref_table)`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct VirtualTable {
    pub name: String,
    #[serde(default)]
    pub ref_instance: String,
    #[serde(default)]
    pub ref_table: String,
}

impl VirtualTable {
    pub fn new(
        name: impl Into<String>,
        ref_instance: impl Into<String>,
        ref_table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ref_instance: ref_instance.into(),
            ref_table: ref_table.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.ref_instance.is_empty() && !self.ref_table.is_empty()
    }
}

/// Response of a remote schema discovery call: one entry per named instance.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct InstanceCatalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
    #[serde(default)]
    pub instances: Vec<DataInstance>,
}

impl InstanceCatalog {
    pub fn is_ok(&self) -> bool {
        self.status.as_ref().is_some_and(ServiceStatus::is_ok)
    }

    pub fn instance(&self, name: &str) -> Option<&DataInstance> {
        self.instances.iter().find(|i| i.name == name)
    }
}
