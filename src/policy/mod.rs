pub mod hot_reload;
pub mod loader;
pub mod matcher;

pub use hot_reload::PolicyWatcher;
pub use loader::{load_policy, PolicyError, PolicyLoader, MAX_REJECT_MESSAGE_LEN};
pub use matcher::{decide_pair, decide_single};
