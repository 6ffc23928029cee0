//! MongoDB connection configuration.

use std::time::Duration;

use mongodb::options::{self, ClientOptions, SelectionCriteria};
use quarry_mapping::QuarryConfig;
use quarry_query::{ReadConcern, ReadPreference};

use crate::error::{MongoError, MongoResult};

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_APP_NAME: &str = "quarry";

/// MongoDB connection configuration.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,
    /// Maximum idle time for connections.
    pub max_idle_time: Option<Duration>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Default read preference.
    pub read_preference: Option<ReadPreference>,
    /// Default read concern.
    pub read_concern: Option<ReadConcern>,
    /// Retry reads.
    pub retry_reads: Option<bool>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: String::new(),
            app_name: Some(DEFAULT_APP_NAME.to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            max_idle_time: Some(Duration::from_secs(300)),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            read_preference: None,
            read_concern: None,
            retry_reads: Some(true),
            direct_connection: None,
        }
    }
}

impl MongoConfig {
    /// Create a new configuration from a MongoDB URI.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Build from the `[database]` section of a `quarry.toml`.
    pub fn from_quarry_config(config: &QuarryConfig) -> MongoResult<Self> {
        let db = &config.database;
        let mut builder = Self::builder();

        if let Some(uri) = &db.uri {
            builder = builder.uri(uri.clone());
        }
        if let Some(database) = &db.database {
            builder = builder.database(database.clone());
        }
        if let Some(app_name) = &db.app_name {
            builder = builder.app_name(app_name.clone());
        }
        if let Some(pref) = &db.read_preference {
            let pref = pref
                .parse::<ReadPreference>()
                .map_err(|e| MongoError::config(e.message))?;
            builder = builder.read_preference(pref);
        }
        if let Some(concern) = &db.read_concern {
            let concern = concern
                .parse::<ReadConcern>()
                .map_err(|e| MongoError::config(e.message))?;
            builder = builder.read_concern(concern);
        }

        builder.build()
    }

    /// Convert to MongoDB ClientOptions.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }

        if let Some(min_pool) = self.min_pool_size {
            options.min_pool_size = Some(min_pool);
        }

        if let Some(max_pool) = self.max_pool_size {
            options.max_pool_size = Some(max_pool);
        }

        if let Some(max_idle) = self.max_idle_time {
            options.max_idle_time = Some(max_idle);
        }

        if let Some(timeout) = self.connect_timeout {
            options.connect_timeout = Some(timeout);
        }

        if let Some(timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(timeout);
        }

        if let Some(pref) = self.read_preference {
            options.selection_criteria = Some(selection_criteria(pref));
        }

        if let Some(concern) = self.read_concern {
            options.read_concern = Some(read_concern(concern));
        }

        if let Some(retry_reads) = self.retry_reads {
            options.retry_reads = Some(retry_reads);
        }

        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }
}

/// Driver selection criteria for a read preference.
pub(crate) fn selection_criteria(pref: ReadPreference) -> SelectionCriteria {
    let pref = match pref {
        ReadPreference::Primary => options::ReadPreference::Primary,
        ReadPreference::PrimaryPreferred => options::ReadPreference::PrimaryPreferred {
            options: Default::default(),
        },
        ReadPreference::Secondary => options::ReadPreference::Secondary {
            options: Default::default(),
        },
        ReadPreference::SecondaryPreferred => options::ReadPreference::SecondaryPreferred {
            options: Default::default(),
        },
        ReadPreference::Nearest => options::ReadPreference::Nearest {
            options: Default::default(),
        },
    };
    SelectionCriteria::ReadPreference(pref)
}

/// Driver read concern for a level.
pub(crate) fn read_concern(level: ReadConcern) -> options::ReadConcern {
    match level {
        ReadConcern::Local => options::ReadConcern::local(),
        ReadConcern::Available => options::ReadConcern::available(),
        ReadConcern::Majority => options::ReadConcern::majority(),
        ReadConcern::Linearizable => options::ReadConcern::linearizable(),
        ReadConcern::Snapshot => options::ReadConcern::snapshot(),
    }
}

/// Builder for MongoDB configuration.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    max_idle_time: Option<Duration>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    read_preference: Option<ReadPreference>,
    read_concern: Option<ReadConcern>,
    retry_reads: Option<bool>,
    direct_connection: Option<bool>,
}

impl MongoConfigBuilder {
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

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the maximum idle time for connections.
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.max_idle_time = Some(duration);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Set the default read preference.
    pub fn read_preference(mut self, pref: ReadPreference) -> Self {
        self.read_preference = Some(pref);
        self
    }

    /// Set the default read concern.
    pub fn read_concern(mut self, concern: ReadConcern) -> Self {
        self.read_concern = Some(concern);
        self
    }

    /// Enable or disable retry reads.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = Some(enabled);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoResult<MongoConfig> {
        let database = self
            .database
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MongoError::config("database name is required"))?;

        let defaults = MongoConfig::default();
        Ok(MongoConfig {
            uri: self.uri.unwrap_or(defaults.uri),
            database,
            app_name: self.app_name.or(defaults.app_name),
            min_pool_size: self.min_pool_size,
            max_pool_size: self.max_pool_size.or(defaults.max_pool_size),
            max_idle_time: self.max_idle_time.or(defaults.max_idle_time),
            connect_timeout: self.connect_timeout.or(defaults.connect_timeout),
            server_selection_timeout: self
                .server_selection_timeout
                .or(defaults.server_selection_timeout),
            read_preference: self.read_preference,
            read_concern: self.read_concern,
            retry_reads: self.retry_reads.or(defaults.retry_reads),
            direct_connection: self.direct_connection,
        })
    }
}
