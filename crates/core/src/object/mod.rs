//! JSON-file backed in-process data service.
//!
//! Holds named tables of flat rows and persists them as
//! `{"<table>": [{<field>: <value>, ...}, ...]}`. It is the default local
//! backend for the dictionary table; it makes no attempt at being a storage
//! engine (no indexes, whole-file rewrites).

use crate::error::{LynkuiError, Result};
use crate::util::{to_canonical_json, write_atomic};
use async_trait::async_trait;
use lynkui_api::{
    DataInsert, DataInstance, DataQuery, DataResult, DataRow, DataService, FieldSpec,
    InstanceSpec, ServiceResult, ServiceStatus, StatusCode, TableSpec,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

pub const DICT_TABLE: &str = "lynk_dict";
pub const DEFAULT_QUERY_LIMIT: u64 = 10_000;

type RowMap = BTreeMap<String, Value>;

#[derive(Default)]
struct Tables {
    specs: BTreeMap<String, TableSpec>,
    rows: BTreeMap<String, Vec<RowMap>>,
}

pub struct ObjectService {
    name: String,
    path: Option<PathBuf>,
    tables: RwLock<Tables>,
}

impl ObjectService {
    /// Service without a backing file (for testing).
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Load rows from `path`; a missing file starts empty.
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows: BTreeMap<String, Vec<RowMap>> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| LynkuiError::Decode {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        let specs = rows
            .keys()
            .map(|table| (table.clone(), default_spec(table)))
            .collect();

        Ok(Self {
            name: name.into(),
            path: Some(path),
            tables: RwLock::new(Tables { specs, rows }),
        })
    }

    /// Like [`ObjectService::open`], but the data file must already exist.
    pub fn open_existing(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(LynkuiError::Config(format!(
                "data document {} not found",
                path.display()
            )));
        }
        Self::open(name, path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Declare a table. Existing rows are kept.
    pub fn table_setup(&self, table: &str) {
        let mut tables = self.write();
        tables
            .specs
            .entry(table.to_string())
            .or_insert_with(|| default_spec(table));
        tables.rows.entry(table.to_string()).or_default();
    }

    /// Insert the row unless one with the same key already exists.
    /// Returns whether a row was added.
    pub fn igsert(&self, req: &DataInsert) -> ServiceResult<bool> {
        let mut tables = self.write();
        let spec = tables
            .specs
            .get(&req.table_name)
            .cloned()
            .ok_or_else(|| lynkui_api::DataError::TableNotFound(req.table_name.clone()))?;
        let row = prepare_row(&spec, req.fields.clone());
        if !has_key(&spec, &row) {
            return Err(lynkui_api::DataError::InvalidArgument(format!(
                "row for ({}) carries no key",
                req.table_name
            )));
        }
        let rows = tables.rows.entry(req.table_name.clone()).or_default();

        if find_row(&spec, rows, &row).is_some() {
            return Ok(false);
        }
        rows.push(row);
        Ok(true)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.read().rows.get(table).map_or(0, Vec::len)
    }

    /// Rewrite the data file with every table.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = {
            let tables = self.read();
            to_canonical_json(&tables.rows)?
        };
        write_atomic(path, &bytes).map_err(|source| LynkuiError::PersistenceWrite {
            path: path.clone(),
            source,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DataService for ObjectService {
    fn instance(&self) -> DataInstance {
        let tables = self.read();
        DataInstance::local(
            self.name.clone(),
            InstanceSpec {
                tables: tables.specs.values().cloned().collect(),
            },
        )
    }

    async fn query(&self, req: &DataQuery) -> ServiceResult<DataResult> {
        let tables = self.read();
        let (Some(spec), Some(rows)) = (
            tables.specs.get(&req.table_name),
            tables.rows.get(&req.table_name),
        ) else {
            return Ok(table_not_found(&req.table_name));
        };

        let mut hits: Vec<&RowMap> = rows
            .iter()
            .filter(|row| {
                req.filter
                    .as_ref()
                    .is_none_or(|f| row.get(&f.field) == Some(&f.value))
            })
            .collect();

        if let Some(sort) = &req.sort {
            hits.sort_by(|a, b| {
                let ord = compare_values(a.get(&sort.field), b.get(&sort.field));
                if sort.desc { ord.reverse() } else { ord }
            });
        }

        let limit = if req.limit == 0 {
            DEFAULT_QUERY_LIMIT
        } else {
            req.limit
        };
        let rows = hits
            .into_iter()
            .take(limit as usize)
            .map(|fields| DataRow::from(fields.clone()))
            .collect();

        Ok(DataResult {
            spec: Some(spec.clone()),
            ..DataResult::ok(rows)
        })
    }

    async fn upsert(&self, req: &DataInsert) -> ServiceResult<DataResult> {
        if req.fields.is_empty() {
            return Ok(DataResult::with_status(ServiceStatus::new(
                StatusCode::BadRequest,
                "no fields to upsert",
            )));
        }

        let row = {
            let mut tables = self.write();
            let Some(spec) = tables.specs.get(&req.table_name).cloned() else {
                return Ok(table_not_found(&req.table_name));
            };
            let row = prepare_row(&spec, req.fields.clone());
            if !has_key(&spec, &row) {
                return Ok(DataResult::with_status(ServiceStatus::new(
                    StatusCode::BadRequest,
                    "primary fields or id required",
                )));
            }
            let rows = tables.rows.entry(req.table_name.clone()).or_default();
            match find_row(&spec, rows, &row) {
                Some(idx) => {
                    rows[idx].extend(row.clone());
                    rows[idx].clone()
                }
                None => {
                    rows.push(row.clone());
                    row
                }
            }
        };

        if let Err(e) = self.flush() {
            warn!("object service {} flush failed: {}", self.name, e);
        }
        Ok(DataResult::ok(vec![DataRow::from(row)]))
    }
}

fn table_not_found(table: &str) -> DataResult {
    DataResult::with_status(ServiceStatus::new(
        StatusCode::NotFound,
        format!("table ({}) not found", table),
    ))
}

fn default_spec(table: &str) -> TableSpec {
    if table == DICT_TABLE {
        return TableSpec {
            name: table.to_string(),
            fields: vec![
                FieldSpec::new("id", "string"),
                FieldSpec::new("ns", "string"),
                FieldSpec::new("name", "string"),
                FieldSpec::new("display_name", "string"),
                FieldSpec::new("ext_fields", "object"),
            ],
            primary_fields: vec!["ns".to_string(), "name".to_string()],
        };
    }
    TableSpec {
        name: table.to_string(),
        fields: vec![FieldSpec::new("id", "string")],
        primary_fields: vec!["id".to_string()],
    }
}

fn row_key(spec: &TableSpec, row: &RowMap) -> Option<Vec<String>> {
    spec.primary_fields
        .iter()
        .map(|f| row.get(f).map(value_key))
        .collect()
}

fn value_key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fill a missing `id` from the primary key when the table declares one.
fn prepare_row(spec: &TableSpec, mut row: RowMap) -> RowMap {
    let wants_id = spec.fields.iter().any(|f| f.name == "id");
    if wants_id && !row.contains_key("id") {
        if let Some(key) = row_key(spec, &row) {
            row.insert("id".to_string(), Value::String(key.join(".")));
        }
    }
    row
}

fn has_key(spec: &TableSpec, row: &RowMap) -> bool {
    row_key(spec, row).is_some() || row.contains_key("id")
}

/// Match on the primary fields when the row carries all of them, else on `id`.
fn find_row(spec: &TableSpec, rows: &[RowMap], row: &RowMap) -> Option<usize> {
    if let Some(key) = row_key(spec, row) {
        return rows
            .iter()
            .position(|r| row_key(spec, r).as_ref() == Some(&key));
    }
    let id = row.get("id")?;
    rows.iter().position(|r| r.get("id") == Some(id))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lynkui_api::QuerySort;
    use serde_json::json;

    fn dict_row(ns: &str, name: &str, display: &str) -> DataInsert {
        DataInsert::new(DICT_TABLE)
            .with_field("ns", ns)
            .with_field("name", name)
            .with_field("display_name", display)
    }

    #[tokio::test]
    async fn test_igsert_keeps_existing_rows() {
        let svc = ObjectService::in_memory("index");
        svc.table_setup(DICT_TABLE);

        assert!(svc.igsert(&dict_row("index", "topnav", "TopNav Menu")).unwrap());
        assert!(!svc.igsert(&dict_row("index", "topnav", "Renamed")).unwrap());
        assert_eq!(svc.row_count(DICT_TABLE), 1);

        let rs = svc
            .query(&DataQuery::new(DICT_TABLE).with_filter("ns", "index"))
            .await
            .unwrap();
        assert!(rs.is_ok());
        assert_eq!(rs.rows.len(), 1);
        assert_eq!(rs.rows[0].field_str("display_name"), Some("TopNav Menu"));
        assert_eq!(rs.rows[0].field_str("id"), Some("index.topnav"));
    }

    #[tokio::test]
    async fn test_query_sort_and_limit() {
        let svc = ObjectService::in_memory("index");
        svc.table_setup(DICT_TABLE);
        for name in ["b", "c", "a"] {
            svc.igsert(&dict_row("nav", name, name)).unwrap();
        }

        let mut q = DataQuery::new(DICT_TABLE).with_limit(2);
        q.sort = Some(QuerySort {
            field: "name".to_string(),
            desc: true,
        });
        let rs = svc.query(&q).await.unwrap();
        let names: Vec<_> = rs.rows.iter().filter_map(|r| r.field_str("name")).collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_unknown_table_reports_status() {
        let svc = ObjectService::in_memory("index");
        let rs = svc.query(&DataQuery::new("missing")).await.unwrap();
        assert!(!rs.is_ok());
        assert_eq!(rs.status.unwrap().code, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data-objects.json");
        let svc = ObjectService::open("index", &path).unwrap();
        svc.table_setup(DICT_TABLE);

        svc.upsert(&dict_row("index", "topnav", "TopNav"))
            .await
            .unwrap();
        let rs = svc
            .upsert(&dict_row("index", "topnav", "TopNav Menu").with_field("ext_fields", json!({"a": 1})))
            .await
            .unwrap();
        assert!(rs.is_ok());
        assert_eq!(svc.row_count(DICT_TABLE), 1);

        let reopened = ObjectService::open("index", &path).unwrap();
        let rs = reopened.query(&DataQuery::new(DICT_TABLE)).await.unwrap();
        assert_eq!(rs.rows.len(), 1);
        assert_eq!(rs.rows[0].field_str("display_name"), Some("TopNav Menu"));
        assert_eq!(rs.rows[0].field("ext_fields"), Some(&json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_upsert_by_id_updates_in_place() {
        let svc = ObjectService::in_memory("index");
        svc.table_setup(DICT_TABLE);
        svc.igsert(&dict_row("index", "topnav", "TopNav Menu")).unwrap();

        for display in ["X", "Y"] {
            let rs = svc
                .upsert(
                    &DataInsert::new(DICT_TABLE)
                        .with_field("id", "index.topnav")
                        .with_field("display_name", display),
                )
                .await
                .unwrap();
            assert!(rs.is_ok());
        }
        assert_eq!(svc.row_count(DICT_TABLE), 1);

        let rs = svc.query(&DataQuery::new(DICT_TABLE)).await.unwrap();
        assert_eq!(rs.rows[0].field_str("display_name"), Some("Y"));
        assert_eq!(rs.rows[0].field_str("ns"), Some("index"));
    }

    #[tokio::test]
    async fn test_keyless_rows_are_rejected() {
        let svc = ObjectService::in_memory("index");
        svc.table_setup(DICT_TABLE);

        let rs = svc
            .upsert(&DataInsert::new(DICT_TABLE).with_field("display_name", "orphan"))
            .await
            .unwrap();
        assert_eq!(rs.status.unwrap().code, StatusCode::BadRequest);

        let err = svc
            .igsert(&DataInsert::new(DICT_TABLE).with_field("ns", "index"))
            .unwrap_err();
        assert!(matches!(err, lynkui_api::DataError::InvalidArgument(_)));
        assert_eq!(svc.row_count(DICT_TABLE), 0);
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data-objects.json");
        let err = ObjectService::open_existing("index", &path).err().unwrap();
        assert!(matches!(err, LynkuiError::Config(_)));

        std::fs::write(&path, r#"{"lynk_dict":[{"id":"a.b","ns":"a","name":"b"}]}"#).unwrap();
        let svc = ObjectService::open_existing("index", &path).unwrap();
        assert_eq!(svc.row_count(DICT_TABLE), 1);
    }

    #[test]
    fn test_instance_reports_schema() {
        let svc = ObjectService::in_memory("index");
        svc.table_setup(DICT_TABLE);
        let inst = svc.instance();
        assert_eq!(inst.name, "index");
        assert!(!inst.is_remote());
        let spec = inst.table_spec(DICT_TABLE).unwrap();
        assert_eq!(spec.primary_fields, vec!["ns", "name"]);
    }
}
