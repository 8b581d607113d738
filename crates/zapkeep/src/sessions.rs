// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `zapkeep sessions` subcommands.
//!
//! These open the configured store directly. The file store is locked by a
//! running server, so stop it first when using the file backend.

use tokio_util::sync::CancellationToken;

use zapkeep_config::ZapkeepConfig;
use zapkeep_core::ZapkeepError;
use zapkeep_store::SessionTokenRegistry;

async fn registry(config: &ZapkeepConfig) -> Result<SessionTokenRegistry, ZapkeepError> {
    let backend = zapkeep_store::open_backend(config).await?;
    Ok(SessionTokenRegistry::new(backend))
}

pub async fn list(config: &ZapkeepConfig) -> Result<(), ZapkeepError> {
    let registry = registry(config).await?;
    let sessions = registry.restore_all(&CancellationToken::new()).await?;
    if sessions.is_empty() {
        println!("no sessions");
        return Ok(());
    }
    for token in sessions {
        println!(
            "{}\tcreated {}\tlast seen {}\t{}",
            token.name,
            token.created_at.to_rfc3339(),
            token.last_seen.to_rfc3339(),
            token.self_jid.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

pub async fn create(config: &ZapkeepConfig, name: &str) -> Result<(), ZapkeepError> {
    let token = registry(config).await?.create_session(name).await?;
    println!("created session {}", token.name);
    Ok(())
}

pub async fn revoke(config: &ZapkeepConfig, name: &str) -> Result<(), ZapkeepError> {
    registry(config).await?.revoke(name).await?;
    println!("revoked session {name}");
    Ok(())
}
