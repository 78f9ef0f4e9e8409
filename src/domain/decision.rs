use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::proto::routerrpc::ResolveHoldForwardAction;

/// Final outcome for one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Let the node proceed (accept channel, resume HTLC)
    Allow,
    /// Stop it (reject channel, fail HTLC)
    Deny,
}

impl Decision {
    #[inline]
    pub fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    #[inline]
    pub fn is_allowed(&self) -> bool {
        *self == Decision::Allow
    }

    /// Interceptor action for an HTLC forward.
    pub fn forward_action(&self) -> ResolveHoldForwardAction {
        match self {
            Decision::Allow => ResolveHoldForwardAction::Resume,
            Decision::Deny => ResolveHoldForwardAction::Fail,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => write!(f, "allow"),
            Decision::Deny => write!(f, "deny"),
        }
    }
}

/// The two independent votes behind a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Allow/deny list outcome
    pub list: bool,
    /// Rule script outcome (`true` when scripts are disabled)
    pub script: bool,
}

impl Verdict {
    pub fn new(list: bool, script: bool) -> Self {
        Verdict { list, script }
    }

    /// Both votes must allow.
    #[inline]
    pub fn decision(&self) -> Decision {
        Decision::from_bool(self.list && self.script)
    }
}
