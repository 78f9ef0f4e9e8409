pub mod script;
pub mod traits;

pub use script::LuaEvaluator;
pub use traits::Evaluator;

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::domain::{FirewallEvent, RulesSettings};

/// Errors from evaluating a rule script.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("cannot read rule script {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("script error: {0}")]
    Script(String),

    #[error("script returned a {0}, expected a boolean")]
    NotBoolean(&'static str),
}

/// Runs the configured evaluator and turns every failure into a rejection.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    evaluator: Arc<dyn Evaluator>,
}

impl RuleEngine {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        RuleEngine { evaluator }
    }

    /// Engine backed by the Lua scripts in `rules_dir`.
    pub fn lua(rules_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(LuaEvaluator::new(rules_dir)))
    }

    /// Script vote for `event`. Always `true` while scripts are disabled.
    pub fn apply(&self, settings: &RulesSettings, event: &FirewallEvent<'_>) -> bool {
        if !settings.apply {
            return true;
        }

        match self.evaluator.evaluate(event) {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    evaluator = self.evaluator.name(),
                    event = event.kind().name(),
                    error = %e,
                    "Rule evaluation failed, rejecting"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HtlcForwardEvent, PeerInfo};
    use crate::node::proto::routerrpc::ForwardHtlcInterceptRequest;

    #[derive(Debug)]
    struct FixedEvaluator {
        result: Option<bool>,
    }

    impl Evaluator for FixedEvaluator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn evaluate(&self, _event: &FirewallEvent<'_>) -> Result<bool, RuleError> {
            self.result
                .ok_or_else(|| RuleError::Script("boom".to_string()))
        }
    }

    fn engine(result: Option<bool>) -> RuleEngine {
        RuleEngine::new(Arc::new(FixedEvaluator { result }))
    }

    fn event() -> HtlcForwardEvent {
        HtlcForwardEvent::new(
            &ForwardHtlcInterceptRequest::default(),
            PeerInfo::default(),
            PeerInfo::default(),
        )
    }

    fn enabled() -> RulesSettings {
        RulesSettings {
            apply: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_rules_allow() {
        let event = event();
        let event = FirewallEvent::HtlcForward(&event);

        assert!(engine(Some(false)).apply(&RulesSettings::default(), &event));
        assert!(engine(None).apply(&RulesSettings::default(), &event));
    }

    #[test]
    fn test_enabled_rules_pass_through_result() {
        let event = event();
        let event = FirewallEvent::HtlcForward(&event);

        assert!(engine(Some(true)).apply(&enabled(), &event));
        assert!(!engine(Some(false)).apply(&enabled(), &event));
    }

    #[test]
    fn test_evaluation_failure_rejects() {
        let event = event();
        let event = FirewallEvent::HtlcForward(&event);

        assert!(!engine(None).apply(&enabled(), &event));
    }

    #[test]
    fn test_missing_scripts_reject() {
        let dir = tempfile::TempDir::new().unwrap();
        let event = event();

        let engine = RuleEngine::lua(dir.path());
        assert!(!engine.apply(&enabled(), &FirewallEvent::HtlcForward(&event)));
    }
}
