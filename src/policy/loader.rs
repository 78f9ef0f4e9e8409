use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::domain::{FirewallPolicy, ShortChannelId};

use super::matcher::{ForwardEntry, WILDCARD};

/// Longest reject message, in bytes, the node passes on to a peer.
pub const MAX_REJECT_MESSAGE_LEN: usize = 500;

/// Errors that can occur during policy loading.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Load a firewall policy from a YAML file.
///
/// An empty file yields the default policy (deny-list mode, empty lists).
pub fn load_policy(path: impl AsRef<Path>) -> Result<FirewallPolicy, PolicyError> {
    let content = fs::read_to_string(path)?;
    parse_policy(&content)
}

/// Parse and normalize a policy document.
pub fn parse_policy(content: &str) -> Result<FirewallPolicy, PolicyError> {
    let mut policy: FirewallPolicy = if content.trim().is_empty() {
        FirewallPolicy::default()
    } else {
        serde_yaml::from_str(content)?
    };

    normalize_policy(&mut policy);
    warn_unmatchable_entries(&policy);

    Ok(policy)
}

/// Trim entries, lowercase pubkeys, drop blank entries and cap the reject
/// message.
fn normalize_policy(policy: &mut FirewallPolicy) {
    for list in [&mut policy.channel_allowlist, &mut policy.channel_denylist] {
        for entry in list.iter_mut() {
            *entry = entry.trim().to_lowercase();
        }
    }

    for list in [&mut policy.forward_allowlist, &mut policy.forward_denylist] {
        for entry in list.iter_mut() {
            *entry = entry.split_whitespace().collect();
        }
    }

    let lists = [
        ("channel-allowlist", &mut policy.channel_allowlist),
        ("channel-denylist", &mut policy.channel_denylist),
        ("forward-allowlist", &mut policy.forward_allowlist),
        ("forward-denylist", &mut policy.forward_denylist),
    ];
    for (name, list) in lists {
        let before = list.len();
        list.retain(|entry| !entry.is_empty());
        if list.len() < before {
            warn!(
                list = name,
                skipped = before - list.len(),
                "Skipping blank list entries"
            );
        }
    }

    let message = &mut policy.channel_reject_message;
    if message.len() > MAX_REJECT_MESSAGE_LEN {
        warn!(
            max_bytes = MAX_REJECT_MESSAGE_LEN,
            "channel-reject-message too long, truncating"
        );
        let cut = floor_char_boundary(message, MAX_REJECT_MESSAGE_LEN);
        message.truncate(cut);
    }
}

/// Largest char boundary of `s` not past `max`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    s.char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= max)
        .last()
        .unwrap_or(0)
}

/// Warn about forward entries that can never match.
fn warn_unmatchable_entries(policy: &FirewallPolicy) {
    for entry in policy
        .forward_allowlist
        .iter()
        .chain(policy.forward_denylist.iter())
    {
        if !forward_entry_is_well_formed(entry) {
            warn!(entry = %entry, "Forward list entry can never match");
        }
    }
}

fn is_channel_id(side: &str) -> bool {
    side == WILDCARD || side.parse::<ShortChannelId>().is_ok()
}

fn forward_entry_is_well_formed(entry: &str) -> bool {
    match ForwardEntry::parse(entry) {
        ForwardEntry::Channel(id) => is_channel_id(id),
        ForwardEntry::Pair { from, to } => is_channel_id(from) && is_channel_id(to),
    }
}

/// Policy loader bound to one file.
#[derive(Debug, Clone)]
pub struct PolicyLoader {
    policy_path: PathBuf,
}

impl PolicyLoader {
    /// Create a new policy loader.
    pub fn new(policy_path: impl Into<PathBuf>) -> Self {
        PolicyLoader {
            policy_path: policy_path.into(),
        }
    }

    pub fn load(&self) -> Result<FirewallPolicy, PolicyError> {
        load_policy(&self.policy_path)
    }

    /// Get the policy file path.
    pub fn policy_path(&self) -> &Path {
        &self.policy_path
    }
}
