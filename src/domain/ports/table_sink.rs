//! Table output port.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::errors::DomainResult;
use crate::domain::models::table::{FlatTables, TableName};

/// Destination for flattened campaign tables.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Persist both tables under `name`, returning the written locations.
    async fn write(&self, name: &TableName, tables: &FlatTables) -> DomainResult<Vec<PathBuf>>;
}
