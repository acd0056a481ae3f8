use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use leaf_core::catalog::{CatalogBackend, CatalogError};
use leaf_core::connection_manager::{BackendError, ConnectionBackend};
use leaf_core::data_source::{DataSource, DataSourceError};
use leaf_core::document::{Document, FieldValue};
use leaf_core::profiles::ConnectionProfile;
use leaf_core::query::{QuerySpec, SortSpec};
use mongodb::bson::{doc, Document as BsonDocument};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::debug;

use crate::convert::{
    document_from_bson, field_value_to_bson, id_filter, query_to_filter, sort_to_document,
};

pub const APP_NAME: &str = "leaf";
pub const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct MongoConnectionBackend;

#[async_trait]
impl ConnectionBackend for MongoConnectionBackend {
    type Connection = Client;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Connection, BackendError> {
        let options = client_options(&profile.url)
            .await
            .map_err(to_connection_error)?;
        Client::with_options(options).map_err(to_connection_error)
    }

    async fn ping(&self, connection: &Self::Connection) -> Result<(), BackendError> {
        connection
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(to_connection_error)
    }

    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError> {
        connection.shutdown().await;
        Ok(())
    }
}

/// Parses `url`, filling in the application name and a bounded server
/// selection timeout unless the URL sets them.
async fn client_options(url: &str) -> mongodb::error::Result<ClientOptions> {
    let mut options = ClientOptions::parse(url).await?;
    if options.app_name.is_none() {
        options.app_name = Some(APP_NAME.to_string());
    }
    if options.server_selection_timeout.is_none() {
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
    }
    Ok(options)
}

#[derive(Debug, Clone)]
pub struct MongoCatalog {
    client: Client,
}

impl MongoCatalog {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogBackend for MongoCatalog {
    async fn list_databases(&self) -> Result<Vec<String>, CatalogError> {
        self.client
            .list_database_names()
            .await
            .map_err(to_catalog_error)
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, CatalogError> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(to_catalog_error)
    }
}

/// One collection, read and written through the official driver.
#[derive(Debug, Clone)]
pub struct MongoCollectionSource {
    collection: Collection<BsonDocument>,
}

impl MongoCollectionSource {
    #[must_use]
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            collection: client.database(database).collection(collection),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> String {
        self.collection.namespace().to_string()
    }
}

#[async_trait]
impl DataSource for MongoCollectionSource {
    async fn count(&self, query: &QuerySpec) -> Result<u64, DataSourceError> {
        self.collection
            .count_documents(query_to_filter(query))
            .await
            .map_err(to_data_source_error)
    }

    async fn find(
        &self,
        query: &QuerySpec,
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>, DataSourceError> {
        let filter = query_to_filter(query);
        debug!(namespace = %self.collection.namespace(), %filter, skip, limit, "find");
        let cursor = self
            .collection
            .find(filter)
            .sort(sort_to_document(sort))
            .skip(skip)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(to_data_source_error)?;
        let documents: Vec<BsonDocument> =
            cursor.try_collect().await.map_err(to_data_source_error)?;
        Ok(documents.into_iter().map(document_from_bson).collect())
    }

    async fn update(
        &self,
        id: &FieldValue,
        field: &str,
        value: &FieldValue,
    ) -> Result<(), DataSourceError> {
        let mut changes = BsonDocument::new();
        changes.insert(field, field_value_to_bson(value));
        let result = self
            .collection
            .update_one(id_filter(id), doc! { "$set": changes })
            .await
            .map_err(to_data_source_error)?;
        if result.matched_count == 0 {
            return Err(DataSourceError::new(format!("no document with _id {id}")));
        }
        Ok(())
    }

    async fn delete(&self, id: &FieldValue) -> Result<(), DataSourceError> {
        let result = self
            .collection
            .delete_one(id_filter(id))
            .await
            .map_err(to_data_source_error)?;
        if result.deleted_count == 0 {
            return Err(DataSourceError::new(format!("no document with _id {id}")));
        }
        Ok(())
    }
}

fn to_connection_error(error: mongodb::error::Error) -> BackendError {
    BackendError::new(error.to_string())
}

fn to_catalog_error(error: mongodb::error::Error) -> CatalogError {
    CatalogError::new(error.to_string())
}

fn to_data_source_error(error: mongodb::error::Error) -> DataSourceError {
    DataSourceError::new(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{client_options, APP_NAME, SERVER_SELECTION_TIMEOUT};

    #[tokio::test]
    async fn client_options_fill_in_defaults() {
        let options = client_options("mongodb://localhost:27017")
            .await
            .expect("valid url");
        assert_eq!(options.app_name.as_deref(), Some(APP_NAME));
        assert_eq!(
            options.server_selection_timeout,
            Some(SERVER_SELECTION_TIMEOUT)
        );
    }

    #[tokio::test]
    async fn url_settings_take_precedence() {
        let options =
            client_options("mongodb://localhost:27017/?appName=ops&serverSelectionTimeoutMS=250")
                .await
                .expect("valid url");
        assert_eq!(options.app_name.as_deref(), Some("ops"));
        assert_eq!(
            options.server_selection_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[tokio::test]
    async fn malformed_urls_are_rejected() {
        assert!(client_options("postgres://localhost").await.is_err());
    }
}
