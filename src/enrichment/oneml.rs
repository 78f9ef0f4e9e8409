use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{null_as_default, EnrichmentError};

pub const ONEML_BASE_URL: &str = "https://1ml.com";

/// Node record from 1ML's public JSON endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneMlNodeInfo {
    pub last_update: i64,
    pub pub_key: String,
    pub alias: String,
    #[serde(deserialize_with = "null_as_default")]
    pub addresses: Vec<OneMlAddress>,
    pub color: String,
    pub capacity: i64,
    pub channelcount: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub noderank: OneMlNodeRank,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneMlAddress {
    pub network: String,
    pub addr: String,
}

/// 1ML rank positions; lower is better.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneMlNodeRank {
    pub capacity: i64,
    pub channelcount: i64,
    pub age: i64,
    pub growth: i64,
    pub availability: i64,
}

#[derive(Debug, Clone)]
pub struct OneMlClient {
    http: reqwest::Client,
    base_url: String,
}

impl OneMlClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, ONEML_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        OneMlClient {
            http,
            base_url: base_url.into(),
        }
    }

    pub async fn get_node_info(
        &self,
        pubkey: &str,
        timeout: Duration,
    ) -> Result<OneMlNodeInfo, EnrichmentError> {
        let url = format!("{}/node/{}/json", self.base_url.trim_end_matches('/'), pubkey);
        debug!(url = %url, "Querying 1ML");

        let info = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<OneMlNodeInfo>()
            .await?;

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_info() {
        let json = r##"{
            "last_update": 1650000000,
            "pub_key": "03abcd",
            "alias": "ACINQ",
            "addresses": [{"network": "tcp", "addr": "1.2.3.4:9735"}],
            "color": "#49daaa",
            "capacity": 123456789,
            "channelcount": 2000,
            "noderank": {"capacity": 3, "channelcount": 5, "age": 100, "growth": 40, "availability": 900},
            "unknown_field": true
        }"##;

        let info: OneMlNodeInfo = serde_json::from_str(json).unwrap();

        assert_eq!(info.alias, "ACINQ");
        assert_eq!(info.addresses.len(), 1);
        assert_eq!(info.noderank.availability, 900);
    }

    #[test]
    fn test_parse_sparse_node_info() {
        let info: OneMlNodeInfo =
            serde_json::from_str(r#"{"alias": "x", "noderank": null}"#).unwrap();

        assert_eq!(info.alias, "x");
        assert_eq!(info.noderank, OneMlNodeRank::default());
    }
}
