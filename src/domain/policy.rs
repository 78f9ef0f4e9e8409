use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a domain's list is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Deny unless listed
    #[serde(alias = "allow", alias = "whitelist")]
    Allowlist,
    /// Allow unless listed
    #[default]
    #[serde(alias = "deny", alias = "blacklist")]
    Denylist,
    /// Leave the decision to the node; no interceptor runs
    Passthrough,
}

impl PolicyMode {
    pub fn is_passthrough(&self) -> bool {
        *self == PolicyMode::Passthrough
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyMode::Allowlist => write!(f, "allowlist"),
            PolicyMode::Denylist => write!(f, "denylist"),
            PolicyMode::Passthrough => write!(f, "passthrough"),
        }
    }
}

/// Firewall policy snapshot, loaded from YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FirewallPolicy {
    pub channel_mode: PolicyMode,
    pub channel_allowlist: Vec<String>,
    pub channel_denylist: Vec<String>,
    /// Error string sent to peers whose channel is rejected
    pub channel_reject_message: String,

    pub forward_mode: PolicyMode,
    pub forward_allowlist: Vec<String>,
    pub forward_denylist: Vec<String>,

    pub rules: RulesSettings,
}

impl FirewallPolicy {
    /// Entries consulted by the channel acceptor under the current mode.
    pub fn channel_list(&self) -> &[String] {
        match self.channel_mode {
            PolicyMode::Allowlist => &self.channel_allowlist,
            PolicyMode::Denylist => &self.channel_denylist,
            PolicyMode::Passthrough => &[],
        }
    }

    /// Entries consulted by the HTLC interceptor under the current mode.
    pub fn forward_list(&self) -> &[String] {
        match self.forward_mode {
            PolicyMode::Allowlist => &self.forward_allowlist,
            PolicyMode::Denylist => &self.forward_denylist,
            PolicyMode::Passthrough => &[],
        }
    }
}

/// Rule script settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RulesSettings {
    /// Run the rule scripts; when false the script vote is always allow
    pub apply: bool,
    pub oneml: SourceSettings,
    pub amboss: SourceSettings,
}

/// One reputation source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SourceSettings {
    pub active: bool,
    #[serde(alias = "timeout")]
    pub timeout_secs: u64,
}

impl SourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        SourceSettings {
            active: false,
            timeout_secs: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_deserialization() {
        let yaml = r#"
channel-mode: allowlist
channel-allowlist:
  - "*"
channel-reject-message: "go away"
forward-mode: denylist
forward-denylist:
  - "700762x1327x1->690757x1005x1"
rules:
  apply: true
  oneml:
    active: true
    timeout-secs: 5
"#;

        let policy: FirewallPolicy = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(policy.channel_mode, PolicyMode::Allowlist);
        assert_eq!(policy.channel_list(), ["*"]);
        assert_eq!(policy.channel_reject_message, "go away");
        assert_eq!(policy.forward_list().len(), 1);
        assert!(policy.rules.apply);
        assert_eq!(policy.rules.oneml.timeout(), Duration::from_secs(5));
        assert!(!policy.rules.amboss.active);
        assert_eq!(policy.rules.amboss.timeout_secs, 2);
    }

    #[test]
    fn test_missing_modes_default_to_denylist() {
        let policy: FirewallPolicy = serde_yaml::from_str("channel-denylist: []").unwrap();

        assert_eq!(policy.channel_mode, PolicyMode::Denylist);
        assert_eq!(policy.forward_mode, PolicyMode::Denylist);
        assert!(!policy.rules.apply);
    }

    #[test]
    fn test_legacy_mode_names() {
        let policy: FirewallPolicy =
            serde_yaml::from_str("channel-mode: whitelist\nforward-mode: blacklist").unwrap();

        assert_eq!(policy.channel_mode, PolicyMode::Allowlist);
        assert_eq!(policy.forward_mode, PolicyMode::Denylist);
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let result: Result<FirewallPolicy, _> = serde_yaml::from_str("channel-mode: maybe");
        assert!(result.is_err());
    }

    #[test]
    fn test_passthrough_has_no_list() {
        let policy = FirewallPolicy {
            forward_mode: PolicyMode::Passthrough,
            forward_denylist: vec!["*".to_string()],
            ..Default::default()
        };

        assert!(policy.forward_mode.is_passthrough());
        assert!(policy.forward_list().is_empty());
    }
}
