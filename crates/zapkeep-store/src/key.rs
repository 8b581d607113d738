// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store key validation shared by every backend.

use zapkeep_core::ZapkeepError;

/// Longest accepted key, in bytes.
pub const MAX_KEY_LEN: usize = 128;

/// Rejects keys that could escape a directory or collide across backends.
///
/// Accepted keys are 1 to [`MAX_KEY_LEN`] characters drawn from
/// `[A-Za-z0-9_.@-]` and never contain `..`.
pub fn validate_key(key: &str) -> Result<(), ZapkeepError> {
    let invalid = |reason: &str| ZapkeepError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(invalid("key is longer than 128 characters"));
    }
    if key.contains("..") {
        return Err(invalid("key contains `..`"));
    }
    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '-')))
    {
        return Err(invalid(&format!("character `{c}` is not allowed")));
    }
    Ok(())
}
