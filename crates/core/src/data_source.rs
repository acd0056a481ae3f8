use async_trait::async_trait;
use thiserror::Error;

use crate::document::{Document, FieldValue};
use crate::query::{QuerySpec, SortSpec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DataSourceError {
    message: String,
}

impl DataSourceError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Remote collection the browser reads and mutates.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn count(&self, query: &QuerySpec) -> Result<u64, DataSourceError>;

    async fn find(
        &self,
        query: &QuerySpec,
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>, DataSourceError>;

    /// Partial update of a single field on the document identified by `id`.
    async fn update(
        &self,
        id: &FieldValue,
        field: &str,
        value: &FieldValue,
    ) -> Result<(), DataSourceError>;

    async fn delete(&self, id: &FieldValue) -> Result<(), DataSourceError>;
}
