// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Label prefixing applied to outgoing events.

use zapkeep_config::model::MapperConfig;

/// Prefixes label ids when enabled; identity otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMapper {
    prefix: Option<String>,
}

impl LabelMapper {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: (!prefix.is_empty()).then_some(prefix),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MapperConfig) -> Self {
        if config.enable {
            Self::new(config.prefix.clone())
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prefix.is_some()
    }

    /// Labels that already carry the prefix are left alone.
    pub fn apply(&self, labels: Vec<String>) -> Vec<String> {
        let Some(prefix) = &self.prefix else {
            return labels;
        };
        labels
            .into_iter()
            .map(|label| {
                if label.starts_with(prefix.as_str()) {
                    label
                } else {
                    format!("{prefix}{label}")
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn disabled_is_identity() {
        let mapper = LabelMapper::from_config(&MapperConfig::default());
        assert!(!mapper.is_enabled());
        assert_eq!(mapper.apply(labels(&["1", "2"])), labels(&["1", "2"]));
    }

    #[test]
    fn enabled_prefixes_each_label() {
        let mapper = LabelMapper::from_config(&MapperConfig {
            enable: true,
            prefix: "tagone-".into(),
        });
        assert_eq!(
            mapper.apply(labels(&["1", "vip"])),
            labels(&["tagone-1", "tagone-vip"])
        );
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mapper = LabelMapper::new("crm-");
        let once = mapper.apply(labels(&["7"]));
        assert_eq!(mapper.apply(once.clone()), once);
    }

    #[test]
    fn empty_prefix_disables() {
        assert!(!LabelMapper::new("").is_enabled());
    }
}
