pub mod config;
pub mod domain;
pub mod enrichment;
pub mod interceptor;
pub mod node;
pub mod observability;
pub mod policy;
pub mod rules;
pub mod session;

pub use config::Config;
pub use domain::{Decision, FirewallEvent, FirewallPolicy, PolicyMode, ShortChannelId};
pub use rules::{Evaluator, RuleEngine};
pub use session::Supervisor;
