use std::fmt::Debug;

use crate::domain::FirewallEvent;

use super::RuleError;

/// A rule backend deciding on one event at a time.
///
/// Evaluators are stateless between calls and run synchronously in the
/// decision path.
pub trait Evaluator: Send + Sync + Debug {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// `Ok(true)` allows the event, `Ok(false)` rejects it.
    fn evaluate(&self, event: &FirewallEvent<'_>) -> Result<bool, RuleError>;
}
