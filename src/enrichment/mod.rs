//! Third-party reputation lookups for channel requesters.

pub mod amboss;
pub mod oneml;

pub use amboss::{AmbossClient, AmbossNodeInfo};
pub use oneml::{OneMlClient, OneMlNodeInfo};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::RulesSettings;

#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("graphql error: {0}")]
    GraphQl(String),

    #[error("node {0} not found")]
    NotFound(String),
}

/// Reputation gathered for one node. Sources that are inactive or failed
/// stay at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeReputation {
    pub oneml: OneMlNodeInfo,
    pub amboss: AmbossNodeInfo,
}

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Queries every active source concurrently.
#[derive(Debug, Clone)]
pub struct Enricher {
    oneml: OneMlClient,
    amboss: AmbossClient,
}

impl Enricher {
    pub fn new() -> Result<Self, EnrichmentError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("voltwall/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_clients(
            OneMlClient::new(http.clone()),
            AmbossClient::new(http),
        ))
    }

    pub fn with_clients(oneml: OneMlClient, amboss: AmbossClient) -> Self {
        Enricher { oneml, amboss }
    }

    /// Look up `pubkey` in the sources `settings` marks active.
    ///
    /// Nothing is fetched while rule scripts are disabled.
    pub async fn lookup(&self, settings: &RulesSettings, pubkey: &str) -> NodeReputation {
        if !settings.apply {
            return NodeReputation::default();
        }

        let oneml = async {
            if !settings.oneml.active {
                return OneMlNodeInfo::default();
            }
            self.oneml
                .get_node_info(pubkey, settings.oneml.timeout())
                .await
                .unwrap_or_else(|e| {
                    warn!(pubkey = %pubkey, error = %e, "1ML lookup failed");
                    OneMlNodeInfo::default()
                })
        };

        let amboss = async {
            if !settings.amboss.active {
                return AmbossNodeInfo::default();
            }
            self.amboss
                .get_node_info(pubkey, settings.amboss.timeout())
                .await
                .unwrap_or_else(|e| {
                    warn!(pubkey = %pubkey, error = %e, "Amboss lookup failed");
                    AmbossNodeInfo::default()
                })
        };

        let (oneml, amboss) = tokio::join!(oneml, amboss);
        NodeReputation { oneml, amboss }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceSettings;

    fn unreachable_enricher() -> Enricher {
        let http = reqwest::Client::new();
        Enricher::with_clients(
            OneMlClient::with_base_url(http.clone(), "http://127.0.0.1:9"),
            AmbossClient::with_url(http, "http://127.0.0.1:9/graphql"),
        )
    }

    fn active(timeout_secs: u64) -> SourceSettings {
        SourceSettings {
            active: true,
            timeout_secs,
        }
    }

    #[tokio::test]
    async fn test_disabled_rules_skip_lookup() {
        let settings = RulesSettings {
            apply: false,
            oneml: active(1),
            amboss: active(1),
        };

        let reputation = unreachable_enricher().lookup(&settings, "03ab").await;
        assert_eq!(reputation, NodeReputation::default());
    }

    #[tokio::test]
    async fn test_failed_sources_degrade_to_default() {
        let settings = RulesSettings {
            apply: true,
            oneml: active(1),
            amboss: active(1),
        };

        let reputation = unreachable_enricher().lookup(&settings, "03ab").await;
        assert_eq!(reputation, NodeReputation::default());
    }

    #[tokio::test]
    async fn test_unreachable_source_is_an_error() {
        let client = OneMlClient::with_base_url(reqwest::Client::new(), "http://127.0.0.1:9");
        let result = client
            .get_node_info("03ab", std::time::Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(EnrichmentError::Http(_))));
    }
}
