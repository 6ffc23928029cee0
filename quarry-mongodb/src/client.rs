//! MongoDB client wrapper.

use std::sync::Arc;

use bson::{Document, doc};
use mongodb::{Client, Collection, Database};
use quarry_mapping::Mapper;
use quarry_query::{Datastore, DatastoreOptions};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::engine::MongoEngine;
use crate::error::{MongoError, MongoResult};

/// A MongoDB client bound to one database.
///
/// The driver pools connections internally; cloning is cheap.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
}

impl MongoClient {
    /// Create a new client from configuration.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        let options = config.to_client_options().await?;

        let client = Client::with_options(options)
            .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;

        let database = client.database(&config.database);

        info!(
            database = %config.database,
            app_name = ?config.app_name,
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
        })
    }

    /// Create a builder for the client.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    /// Get a collection of raw documents.
    pub fn collection_doc(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// Get the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the underlying MongoDB client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Check if the client is healthy by pinging the server.
    pub async fn is_healthy(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }

    /// Run a database command.
    pub async fn run_command(&self, command: Document) -> MongoResult<Document> {
        debug!(command = %command, "Running command");
        let result = self.database.run_command(command, None).await?;
        Ok(result)
    }

    /// A datastore running queries through this client.
    pub fn datastore(&self, mapper: Arc<Mapper>) -> Datastore<MongoEngine> {
        Datastore::new(mapper, MongoEngine::new(self.clone()))
    }

    /// A datastore with explicit query options.
    pub fn datastore_with_options(
        &self,
        mapper: Arc<Mapper>,
        options: DatastoreOptions,
    ) -> Datastore<MongoEngine> {
        Datastore::with_options(mapper, MongoEngine::new(self.clone()), options)
    }
}

/// Builder for MongoClient.
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    connect_timeout: Option<std::time::Duration>,
    direct_connection: Option<bool>,
}

impl MongoClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: std::time::Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    fn into_config(self) -> MongoResult<MongoConfig> {
        let mut builder = MongoConfig::builder();

        if let Some(uri) = self.uri {
            builder = builder.uri(uri);
        }
        if let Some(database) = self.database {
            builder = builder.database(database);
        }
        if let Some(app_name) = self.app_name {
            builder = builder.app_name(app_name);
        }
        if let Some(max_pool) = self.max_pool_size {
            builder = builder.max_pool_size(max_pool);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(direct) = self.direct_connection {
            builder = builder.direct_connection(direct);
        }

        builder.build()
    }

    /// Build the client.
    pub async fn build(self) -> MongoResult<MongoClient> {
        MongoClient::new(self.into_config()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder_config() {
        let config = MongoClientBuilder::new()
            .uri("mongodb://localhost:27017")
            .database("shop")
            .max_pool_size(20)
            .direct_connection(true)
            .into_config()
            .unwrap();

        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "shop");
        assert_eq!(config.max_pool_size, Some(20));
        assert_eq!(config.direct_connection, Some(true));
    }

    #[test]
    fn test_client_builder_requires_database() {
        assert!(MongoClientBuilder::new().into_config().is_err());
    }
}
