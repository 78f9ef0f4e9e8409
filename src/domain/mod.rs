pub mod decision;
pub mod event;
pub mod policy;
pub mod scid;

pub use decision::{Decision, Verdict};
pub use event::{ChannelAcceptEvent, EventKind, FirewallEvent, HtlcForwardEvent, NodeStats, PeerInfo};
pub use policy::{FirewallPolicy, PolicyMode, RulesSettings, SourceSettings};
pub use scid::ShortChannelId;
