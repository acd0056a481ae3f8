use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CatalogError {
    message: String,
}

impl CatalogError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Names of the databases and collections reachable through a connection.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<String>, CatalogError>;
    async fn list_collections(&self, database: &str) -> Result<Vec<String>, CatalogError>;
}

/// Sorted, deduplicated listing; system namespaces are dropped.
pub async fn database_names<B>(backend: &B) -> Result<Vec<String>, CatalogError>
where
    B: CatalogBackend + ?Sized,
{
    backend.list_databases().await.map(tidy_names)
}

pub async fn collection_names<B>(backend: &B, database: &str) -> Result<Vec<String>, CatalogError>
where
    B: CatalogBackend + ?Sized,
{
    backend.list_collections(database).await.map(tidy_names)
}

fn tidy_names(mut names: Vec<String>) -> Vec<String> {
    names.retain(|name| !name.starts_with("system."));
    names.sort_unstable();
    names.dedup();
    names
}
