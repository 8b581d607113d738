// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MongoDB store backend.
//!
//! One document per key: `{ _id: <key>, value: <binary>, updated_at: <date> }`.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Binary, DateTime as BsonDateTime, doc};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use zapkeep_config::model::DbConfig;
use zapkeep_core::{HealthStatus, StoreBackend, ZapkeepError};

use crate::key::validate_key;

const DEFAULT_COLLECTION: &str = "sessions";
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
struct TokenDocument {
    #[serde(rename = "_id")]
    id: String,
    value: Binary,
    updated_at: BsonDateTime,
}

pub struct MongoStore {
    client: Client,
    database: String,
    collection: Collection<TokenDocument>,
}

/// Builds the connection string from the descriptor.
///
/// Remote mode uses `mongo_url_remote` verbatim; local mode dials
/// `mongodb_host:mongodb_port` and attaches credentials separately so they
/// never need URL escaping.
fn connection_uri(db: &DbConfig) -> Result<String, ZapkeepError> {
    if db.mongo_is_remote {
        db.mongo_url_remote
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ZapkeepError::Config("db.mongo_url_remote is not set".to_string()))
    } else {
        let host = db
            .mongodb_host
            .as_deref()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ZapkeepError::Config("db.mongodb_host is not set".to_string()))?;
        Ok(format!("mongodb://{host}:{}", db.mongodb_port))
    }
}

impl MongoStore {
    /// Connects using the `db.mongo*` descriptor and verifies the server answers.
    pub async fn connect(db: &DbConfig) -> Result<Self, ZapkeepError> {
        let uri = connection_uri(db)?;
        let mut options = ClientOptions::parse(uri.as_str()).await.map_err(map_mongo_err)?;
        options.app_name = Some("zapkeep".to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);

        if !db.mongo_is_remote && db.mongodb_user.is_some() {
            let mut credential = Credential::default();
            credential.username = db.mongodb_user.clone();
            credential.password = db.mongodb_password.clone();
            options.credential = Some(credential);
        }

        let client = Client::with_options(options).map_err(map_mongo_err)?;
        let collection_name = db
            .mongodb_collection
            .as_deref()
            .unwrap_or(DEFAULT_COLLECTION);
        let collection = client
            .database(&db.mongodb_database)
            .collection::<TokenDocument>(collection_name);

        let store = Self {
            client,
            database: db.mongodb_database.clone(),
            collection,
        };
        store.ping().await?;

        debug!(
            database = %db.mongodb_database,
            collection = collection_name,
            remote = db.mongo_is_remote,
            "mongodb store connected"
        );
        Ok(store)
    }

    async fn ping(&self) -> Result<(), ZapkeepError> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }
}

/// Network, selection, and auth failures are transient.
fn map_mongo_err(err: mongodb::error::Error) -> ZapkeepError {
    use mongodb::error::ErrorKind;

    let unavailable = matches!(
        *err.kind,
        ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::Authentication { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. }
    );
    if unavailable {
        ZapkeepError::unavailable("mongodb", err)
    } else {
        ZapkeepError::storage(err)
    }
}

#[async_trait]
impl StoreBackend for MongoStore {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ZapkeepError> {
        validate_key(key)?;
        let found = self
            .collection
            .find_one(doc! { "_id": key })
            .await
            .map_err(map_mongo_err)?;
        found
            .map(|document| document.value.bytes)
            .ok_or_else(|| ZapkeepError::NotFound {
                key: key.to_string(),
            })
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ZapkeepError> {
        validate_key(key)?;
        let document = TokenDocument {
            id: key.to_string(),
            value: Binary {
                subtype: BinarySubtype::Generic,
                bytes: value.to_vec(),
            },
            updated_at: BsonDateTime::now(),
        };
        self.collection
            .replace_one(doc! { "_id": key }, &document)
            .upsert(true)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }

    async fn delete(&self, key: &str) -> Result<(), ZapkeepError> {
        validate_key(key)?;
        let result = self
            .collection
            .delete_one(doc! { "_id": key })
            .await
            .map_err(map_mongo_err)?;
        if result.deleted_count == 0 {
            return Err(ZapkeepError::NotFound {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, ZapkeepError> {
        let ids = self
            .collection
            .distinct("_id", doc! {})
            .await
            .map_err(map_mongo_err)?;
        let mut keys: Vec<String> = ids
            .iter()
            .filter_map(|id| id.as_str())
            .filter(|key| validate_key(key).is_ok())
            .map(str::to_string)
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, ZapkeepError> {
        validate_key(key)?;
        let count = self
            .collection
            .count_documents(doc! { "_id": key })
            .await
            .map_err(map_mongo_err)?;
        Ok(count > 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, ZapkeepError> {
        match self.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}
