use super::store::LayoutStore;
use crate::error::{LynkuiError, Result};
use lynkui_api::{
    ClientConnector, DataClient, DataError, DataInsert, DataInstance, DataQuery, DataResult,
    DataService, InstanceSpec, ServiceStatus, StatusCode, TableSpec, VirtualTable, is_valid_name,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

struct InstanceEntry {
    instance: DataInstance,
    /// Write-once schema cache, shared with in-flight discovery calls.
    schema: Arc<OnceCell<InstanceSpec>>,
}

impl InstanceEntry {
    fn new(instance: DataInstance) -> Self {
        let seeded = instance.spec.clone().filter(|s| !s.is_empty());
        Self {
            instance,
            schema: Arc::new(OnceCell::new_with(seeded)),
        }
    }
}

#[derive(Default)]
struct Backends {
    tables: HashMap<String, VirtualTable>,
    instances: HashMap<String, InstanceEntry>,
    services: HashMap<String, Arc<dyn DataService>>,
    clients: HashMap<String, Arc<dyn DataClient>>,
}

enum Backend {
    Local(Arc<dyn DataService>),
    Remote(Arc<dyn DataClient>),
}

/// Virtual table router and backend registry.
///
/// Maps logical table names onto `(instance, table)` pairs and dispatches
/// queries to a local [`DataService`] or a remote [`DataClient`]. The lock is
/// only held to snapshot handles; backend calls run without it.
pub struct DataLayout {
    state: RwLock<Backends>,
    store: Arc<LayoutStore>,
    connector: Option<Arc<dyn ClientConnector>>,
}

impl DataLayout {
    /// Build the routing tables from the store's current document.
    pub fn new(store: Arc<LayoutStore>) -> Self {
        let doc = store.snapshot();
        let mut backends = Backends::default();
        for table in doc.tables {
            backends.tables.insert(table.name.clone(), table);
        }
        for instance in doc.instances {
            backends
                .instances
                .insert(instance.name.clone(), InstanceEntry::new(instance));
        }
        Self {
            state: RwLock::new(backends),
            store,
            connector: None,
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn ClientConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn store(&self) -> &Arc<LayoutStore> {
        &self.store
    }

    pub fn tables(&self) -> Vec<VirtualTable> {
        let mut tables: Vec<_> = self.read().tables.values().cloned().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    pub fn table(&self, name: &str) -> Option<VirtualTable> {
        self.read().tables.get(name).cloned()
    }

    pub fn instance(&self, name: &str) -> Option<DataInstance> {
        self.read().instances.get(name).map(|e| e.instance.clone())
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.read().services.contains_key(name)
    }

    pub fn has_client(&self, name: &str) -> bool {
        self.read().clients.contains_key(name)
    }

    /// Register an in-process backend under the name it reports for itself.
    /// Re-registering a name replaces the previous service.
    pub fn register_service(&self, service: Arc<dyn DataService>) -> Result<()> {
        let instance = service.instance();
        validate_name(&instance.name)?;

        {
            let mut state = self.write();
            state
                .instances
                .insert(instance.name.clone(), InstanceEntry::new(instance.clone()));
            state.services.insert(instance.name.clone(), service);
        }
        info!("data service {} registered", instance.name);

        self.store.update(|doc| doc.upsert_instance(instance));
        self.flush_logged();
        Ok(())
    }

    /// Record an instance descriptor and, when it is remote, connect to it.
    pub fn register_instance(&self, instance: DataInstance) -> Result<()> {
        validate_name(&instance.name)?;

        {
            let mut state = self.write();
            state
                .instances
                .insert(instance.name.clone(), InstanceEntry::new(instance.clone()));
        }
        self.store.update(|doc| doc.upsert_instance(instance.clone()));
        self.flush_logged();

        self.connect(&instance)
    }

    /// Establish (once) the client for a remote instance.
    pub fn connect(&self, instance: &DataInstance) -> Result<()> {
        let Some(spec) = &instance.connect else {
            return Ok(());
        };

        let mut state = self.write();
        if state.clients.contains_key(&instance.name) {
            return Ok(());
        }
        let connector = self.connector.as_ref().ok_or_else(|| {
            LynkuiError::Data(DataError::Connect(format!(
                "no client connector for instance ({})",
                instance.name
            )))
        })?;
        let client = connector.connect(spec)?;
        state.clients.insert(instance.name.clone(), client);
        info!("instance {} connected to {}", instance.name, spec.address);
        Ok(())
    }

    /// Connect every remote instance known from the layout document.
    /// Failures are logged; the affected tables fail per request.
    pub fn connect_all(&self) {
        let remotes: Vec<DataInstance> = self
            .read()
            .instances
            .values()
            .filter(|e| e.instance.is_remote())
            .map(|e| e.instance.clone())
            .collect();
        for instance in remotes {
            if let Err(e) = self.connect(&instance) {
                warn!("instance {} connect failed: {}", instance.name, e);
            }
        }
    }

    /// Insert or replace a virtual table mapping.
    pub fn set_table(&self, table: VirtualTable) -> Result<()> {
        validate_name(&table.name)?;
        self.write().tables.insert(table.name.clone(), table.clone());
        self.store.update(|doc| doc.upsert_table(table));
        self.flush_logged();
        Ok(())
    }

    /// Make sure `defaults.name` exists, filling any empty ref field from
    /// `defaults` without touching configured ones.
    pub fn ensure_table(&self, defaults: VirtualTable) -> Result<()> {
        let mut table = self
            .table(&defaults.name)
            .unwrap_or_else(|| VirtualTable::new(defaults.name.clone(), "", ""));
        if table.ref_instance.is_empty() {
            table.ref_instance = defaults.ref_instance;
        }
        if table.ref_table.is_empty() {
            table.ref_table = defaults.ref_table;
        }
        self.set_table(table)
    }

    pub async fn query(&self, mut req: DataQuery) -> Result<DataResult> {
        let (table, backend) = self.resolve(&req.table_name)?;
        req.instance_name = table.ref_instance;
        req.table_name = table.ref_table;

        match backend {
            Backend::Local(service) => ensure_ok(service.query(&req).await?),
            Backend::Remote(client) => Ok(with_status(client.query(&req).await)),
        }
    }

    pub async fn upsert(&self, mut req: DataInsert) -> Result<DataResult> {
        let (table, backend) = self.resolve(&req.table_name)?;
        req.instance_name = table.ref_instance;
        req.table_name = table.ref_table;

        match backend {
            Backend::Local(service) => ensure_ok(service.upsert(&req).await?),
            Backend::Remote(client) => Ok(with_status(client.upsert(&req).await)),
        }
    }

    /// Schema of the physical table behind `name`.
    ///
    /// Remote instances without a cached schema run one discovery call;
    /// concurrent callers wait on the same call. Unknown tables, failed
    /// discovery and local instances without a schema all yield `None`.
    pub async fn table_spec(&self, name: &str) -> Option<TableSpec> {
        let (table, cell, service, client) = {
            let state = self.read();
            let table = state.tables.get(name)?.clone();
            if !table.is_configured() {
                return None;
            }
            let entry = state.instances.get(&table.ref_instance)?;
            (
                table.clone(),
                entry.schema.clone(),
                state.services.get(&table.ref_instance).cloned(),
                state.clients.get(&table.ref_instance).cloned(),
            )
        };

        if let Some(service) = service {
            return service.instance().table_spec(&table.ref_table).cloned();
        }
        if let Some(spec) = cell.get() {
            return spec.table(&table.ref_table).cloned();
        }

        let client = client?;
        let instance_name = table.ref_instance.as_str();
        let fetched = cell
            .get_or_try_init(|| async move {
                let catalog = client.describe().await;
                if !catalog.is_ok() {
                    return Err(catalog.status.unwrap_or_else(|| {
                        ServiceStatus::new(StatusCode::Timeout, "status not found")
                    }));
                }
                catalog
                    .instance(instance_name)
                    .and_then(|i| i.spec.clone())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ServiceStatus::new(StatusCode::NotFound, "instance schema not found")
                    })
            })
            .await;

        match fetched {
            Ok(spec) => {
                self.remember_spec(instance_name, spec);
                spec.table(&table.ref_table).cloned()
            }
            Err(status) => {
                debug!("schema discovery for {} failed: {}", instance_name, status);
                None
            }
        }
    }

    /// Persist the current layout document.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    fn resolve(&self, name: &str) -> Result<(VirtualTable, Backend)> {
        let state = self.read();
        let table = state
            .tables
            .get(name)
            .ok_or_else(|| LynkuiError::TableNotFound(name.to_string()))?;
        if !table.is_configured() {
            return Err(LynkuiError::RefNotConfigured(name.to_string()));
        }

        let backend = if let Some(service) = state.services.get(&table.ref_instance) {
            Backend::Local(service.clone())
        } else if let Some(client) = state.clients.get(&table.ref_instance) {
            Backend::Remote(client.clone())
        } else {
            return Err(LynkuiError::BackendNotFound(table.ref_instance.clone()));
        };
        Ok((table.clone(), backend))
    }

    fn remember_spec(&self, instance: &str, spec: &InstanceSpec) {
        let updated = {
            let mut state = self.write();
            state.instances.get_mut(instance).and_then(|entry| {
                if entry.instance.has_spec() {
                    return None;
                }
                entry.instance.spec = Some(spec.clone());
                Some(entry.instance.clone())
            })
        };
        if let Some(instance) = updated {
            self.store.update(|doc| doc.upsert_instance(instance));
            self.flush_logged();
        }
    }

    fn flush_logged(&self) {
        if let Err(e) = self.store.flush() {
            warn!("layout flush failed: {}", e);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Backends> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Backends> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || !is_valid_name(name) {
        return Err(LynkuiError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Local services must report success; anything else becomes an error.
fn ensure_ok(rs: DataResult) -> Result<DataResult> {
    if rs.is_ok() {
        Ok(rs)
    } else {
        Err(LynkuiError::Status(rs.status.unwrap_or_else(|| {
            ServiceStatus::new(StatusCode::InternalError, "status not found")
        })))
    }
}

/// Remote results are returned as data; a missing status reads as a timeout.
fn with_status(mut rs: DataResult) -> DataResult {
    if rs.status.is_none() {
        rs.status = Some(ServiceStatus::new(StatusCode::Timeout, "status not found"));
    }
    rs
}
