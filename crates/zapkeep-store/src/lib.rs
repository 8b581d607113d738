// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session token persistence for the zapkeep session server.
//!
//! Three interchangeable [`StoreBackend`] implementations (local directory,
//! Redis, MongoDB) and the [`SessionTokenRegistry`] that owns session
//! lifecycle on top of whichever one the configuration selects.

pub mod key;
pub mod locks;
pub mod registry;

#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "mongodb")]
pub mod mongo_store;
#[cfg(feature = "redis")]
pub mod redis_store;

use std::sync::Arc;

use zapkeep_config::ZapkeepConfig;
#[cfg(any(feature = "file", feature = "redis", feature = "mongodb"))]
use zapkeep_config::model::TokenStoreType;
use zapkeep_core::{StoreBackend, ZapkeepError};

pub use key::validate_key;
pub use registry::SessionTokenRegistry;

#[cfg(feature = "file")]
pub use file::FileStore;
#[cfg(feature = "mongodb")]
pub use mongo_store::MongoStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

/// Opens the backend selected by `session.token_store`.
///
/// Called once at startup; the returned backend is never swapped.
pub async fn open_backend(config: &ZapkeepConfig) -> Result<Arc<dyn StoreBackend>, ZapkeepError> {
    let backend = connect(config).await?;
    tracing::info!(backend = backend.name(), "token store ready");
    Ok(backend)
}

async fn connect(config: &ZapkeepConfig) -> Result<Arc<dyn StoreBackend>, ZapkeepError> {
    match config.session.token_store {
        #[cfg(feature = "file")]
        TokenStoreType::File => Ok(Arc::new(FileStore::open(&config.session.token_dir)?)),
        #[cfg(feature = "redis")]
        TokenStoreType::Redis => Ok(Arc::new(RedisStore::connect(&config.db).await?)),
        #[cfg(feature = "mongodb")]
        TokenStoreType::Mongodb => Ok(Arc::new(MongoStore::connect(&config.db).await?)),
        #[allow(unreachable_patterns)]
        other => Err(ZapkeepError::Config(format!(
            "token store `{other}` is not compiled into this build"
        ))),
    }
}

#[cfg(all(test, feature = "file"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_file_backend_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ZapkeepConfig::default();
        config.session.token_dir = dir.path().join("tokens").display().to_string();
        let backend = open_backend(&config).await.unwrap();
        assert_eq!(backend.name(), "file");
        assert!(dir.path().join("tokens").is_dir());
    }
}

#[cfg(all(test, not(feature = "mongodb")))]
mod without_mongodb {
    use super::*;
    use zapkeep_config::model::TokenStoreType;

    #[tokio::test]
    async fn missing_backend_is_a_config_error() {
        let mut config = ZapkeepConfig::default();
        config.session.token_store = TokenStoreType::Mongodb;
        let err = match open_backend(&config).await {
            Ok(_) => panic!("mongodb is not compiled in"),
            Err(e) => e,
        };
        assert!(matches!(err, ZapkeepError::Config(ref m) if m.contains("mongodb")));
    }
}
