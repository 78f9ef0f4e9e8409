use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{null_as_default, EnrichmentError};

pub const AMBOSS_GRAPHQL_URL: &str = "https://api.amboss.space/graphql";

const NODE_QUERY: &str = r#"query Info($pubkey: String!) {
  getNode(pubkey: $pubkey) {
    socials {
      info {
        email
        telegram
        twitter
        lightning_address
        website
        message
        twitter_verified
      }
    }
    graph_info {
      metrics {
        capacity
        capacity_rank
        channels
        channels_rank
      }
    }
    amboss {
      is_favorite
      number_favorites
      notifications {
        number_subscribers
      }
    }
  }
}"#;

/// Subset of Amboss' `getNode` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbossNodeInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub socials: AmbossSocials,
    #[serde(deserialize_with = "null_as_default")]
    pub graph_info: AmbossGraphInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub amboss: AmbossStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbossSocials {
    #[serde(deserialize_with = "null_as_default")]
    pub info: AmbossContactInfo,
}

/// Contact details published by the node operator. Empty when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbossContactInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub telegram: String,
    #[serde(deserialize_with = "null_as_default")]
    pub twitter: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lightning_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub website: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub twitter_verified: bool,
}

impl AmbossContactInfo {
    pub fn has_contact(&self) -> bool {
        !(self.email.is_empty() && self.telegram.is_empty() && self.twitter.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbossGraphInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub metrics: AmbossMetrics,
}

/// Graph metrics; ranks are 0 when Amboss has none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbossMetrics {
    /// Capacity in sats, as a decimal string
    #[serde(deserialize_with = "null_as_default")]
    pub capacity: String,
    #[serde(deserialize_with = "null_as_default")]
    pub capacity_rank: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub channels: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub channels_rank: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbossStats {
    #[serde(deserialize_with = "null_as_default")]
    pub is_favorite: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub number_favorites: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub notifications: AmbossNotifications,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbossNotifications {
    #[serde(deserialize_with = "null_as_default")]
    pub number_subscribers: u64,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<NodeData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct NodeData {
    #[serde(rename = "getNode")]
    get_node: Option<AmbossNodeInfo>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl GraphQlResponse {
    fn into_node(self, pubkey: &str) -> Result<AmbossNodeInfo, EnrichmentError> {
        if let Some(error) = self.errors.first() {
            return Err(EnrichmentError::GraphQl(error.message.clone()));
        }
        self.data
            .and_then(|data| data.get_node)
            .ok_or_else(|| EnrichmentError::NotFound(pubkey.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct AmbossClient {
    http: reqwest::Client,
    url: String,
}

impl AmbossClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_url(http, AMBOSS_GRAPHQL_URL)
    }

    pub fn with_url(http: reqwest::Client, url: impl Into<String>) -> Self {
        AmbossClient {
            http,
            url: url.into(),
        }
    }

    pub async fn get_node_info(
        &self,
        pubkey: &str,
        timeout: Duration,
    ) -> Result<AmbossNodeInfo, EnrichmentError> {
        debug!(pubkey = %pubkey, "Querying Amboss");

        let body = json!({
            "query": NODE_QUERY,
            "variables": { "pubkey": pubkey },
        });

        let response: GraphQlResponse = self
            .http
            .post(&self.url)
            .header("Cache-Control", "no-cache")
            .json(&body)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_node(pubkey)
    }
}
