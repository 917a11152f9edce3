use crate::error::ServiceResult;
use crate::models::{ConnectSpec, DataInsert, DataInstance, DataQuery, DataResult, InstanceCatalog};
use async_trait::async_trait;
use std::sync::Arc;

/// An in-process backend registered under its own instance name.
///
/// Errors and non-OK statuses returned here are surfaced to callers as hard
/// errors by the layout router.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Describe the instance this service serves, including its schema.
    fn instance(&self) -> DataInstance;

    async fn query(&self, req: &DataQuery) -> ServiceResult<DataResult>;

    async fn upsert(&self, req: &DataInsert) -> ServiceResult<DataResult>;
}

/// Client side of a remote data endpoint.
///
/// Transport failures are reported through the status embedded in each
/// response rather than as errors.
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn query(&self, req: &DataQuery) -> DataResult;

    async fn upsert(&self, req: &DataInsert) -> DataResult;

    /// Schema discovery: one entry per instance served by the endpoint.
    async fn describe(&self) -> InstanceCatalog;
}

/// Builds clients for instances that carry a `connect` descriptor.
pub trait ClientConnector: Send + Sync {
    fn connect(&self, spec: &ConnectSpec) -> ServiceResult<Arc<dyn DataClient>>;
}
