//! Lua rule scripts.
//!
//! Each event kind has its own script in the rules directory
//! (`ChannelAccept.lua`, `HtlcForward.lua`). The script is read from disk on
//! every evaluation and runs in a fresh sandboxed state with the event bound
//! to a global of the same name. Its final value must be a boolean.

use mlua::{HookTriggers, Lua, LuaSerdeExt, SerializeOptions, Table, Value, VmState};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::domain::FirewallEvent;

use super::{Evaluator, RuleError};

/// Memory available to one script run.
pub const DEFAULT_MEMORY_LIMIT: usize = 16 * 1024 * 1024;

/// Wall-clock budget of one script run.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(500);

const HOOK_INSTRUCTION_INTERVAL: u32 = 10_000;

#[derive(Debug, Clone)]
pub struct LuaEvaluator {
    rules_dir: PathBuf,
    memory_limit: usize,
    time_limit: Duration,
}

impl LuaEvaluator {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        LuaEvaluator {
            rules_dir: rules_dir.into(),
            memory_limit: DEFAULT_MEMORY_LIMIT,
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }

    pub fn with_limits(mut self, memory_limit: usize, time_limit: Duration) -> Self {
        self.memory_limit = memory_limit;
        self.time_limit = time_limit;
        self
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    fn sandbox(&self) -> Result<Lua, mlua::Error> {
        let lua = Lua::new();
        lua.set_memory_limit(self.memory_limit)?;

        let deadline = Instant::now() + self.time_limit;
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_INSTRUCTION_INTERVAL),
            move |_lua, _debug| {
                if Instant::now() > deadline {
                    return Err(mlua::Error::RuntimeError(
                        "script exceeded its time limit".to_string(),
                    ));
                }
                Ok(VmState::Continue)
            },
        );

        let globals = lua.globals();

        // Keep os.time and os.date, drop everything touching the host.
        if let Ok(os_table) = globals.get::<Table>("os") {
            for name in ["execute", "exit", "remove", "rename", "setlocale", "getenv", "tmpname"] {
                os_table.set(name, Value::Nil)?;
            }
        }
        for name in ["io", "loadfile", "dofile", "require", "debug", "package"] {
            globals.set(name, Value::Nil)?;
        }

        let api = lua.create_table()?;
        api.set(
            "log",
            lua.create_function(|_, (level, message): (String, String)| {
                match level.as_str() {
                    "debug" => tracing::debug!(target: "voltwall::script", "{}", message),
                    "warn" => tracing::warn!(target: "voltwall::script", "{}", message),
                    "error" => tracing::error!(target: "voltwall::script", "{}", message),
                    _ => tracing::info!(target: "voltwall::script", "{}", message),
                }
                Ok(())
            })?,
        )?;
        globals.set("voltwall", api)?;

        Ok(lua)
    }

    fn run(&self, source: &str, event: &FirewallEvent<'_>) -> Result<Value, mlua::Error> {
        let lua = self.sandbox()?;
        let kind = event.kind();

        let options = SerializeOptions::new()
            .serialize_none_to_null(false)
            .serialize_unit_to_null(false);
        let value = lua.to_value_with(event, options)?;
        lua.globals().set(kind.name(), value)?;

        lua.load(source).set_name(kind.script_file()).eval::<Value>()
    }
}

impl Evaluator for LuaEvaluator {
    fn name(&self) -> &str {
        "lua"
    }

    fn evaluate(&self, event: &FirewallEvent<'_>) -> Result<bool, RuleError> {
        let path = self.rules_dir.join(event.kind().script_file());
        let source = fs::read_to_string(&path).map_err(|source| RuleError::Load {
            path: path.clone(),
            source,
        })?;

        match self.run(&source, event) {
            Ok(Value::Boolean(allowed)) => {
                debug!(script = %path.display(), allowed, "Rule script evaluated");
                Ok(allowed)
            }
            Ok(other) => Err(RuleError::NotBoolean(other.type_name())),
            Err(e) => Err(RuleError::Script(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelAcceptEvent, HtlcForwardEvent, NodeStats, PeerInfo};
    use crate::enrichment::NodeReputation;
    use crate::node::proto::lnrpc::ChannelAcceptRequest;
    use crate::node::proto::routerrpc::{CircuitKey, ForwardHtlcInterceptRequest};
    use tempfile::TempDir;

    fn channel_event(funding_amt: u64) -> ChannelAcceptEvent {
        let request = ChannelAcceptRequest {
            node_pubkey: vec![0x03; 33],
            funding_amt,
            channel_flags: 1,
            ..Default::default()
        };
        ChannelAcceptEvent::new(&request, NodeStats::default(), NodeReputation::default())
    }

    fn forward_event() -> HtlcForwardEvent {
        let request = ForwardHtlcInterceptRequest {
            incoming_circuit_key: Some(CircuitKey {
                chan_id: 770495967390531585,
                htlc_id: 1,
            }),
            outgoing_requested_chan_id: 759495353533530113,
            incoming_amount_msat: 2_000,
            outgoing_amount_msat: 1_000,
            ..Default::default()
        };
        let peer = PeerInfo {
            pubkey: "02aa".to_string(),
            alias: "alice".to_string(),
        };
        HtlcForwardEvent::new(&request, peer.clone(), peer)
    }

    fn rules_dir(script_name: &str, source: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(script_name), source).unwrap();
        dir
    }

    #[test]
    fn test_expression_script() {
        let dir = rules_dir("ChannelAccept.lua", "ChannelAccept.funding_amt >= 750000");
        let evaluator = LuaEvaluator::new(dir.path());

        let big = channel_event(1_000_000);
        let small = channel_event(10_000);
        assert!(evaluator.evaluate(&FirewallEvent::ChannelAccept(&big)).unwrap());
        assert!(!evaluator.evaluate(&FirewallEvent::ChannelAccept(&small)).unwrap());
    }

    #[test]
    fn test_block_script_with_nested_fields() {
        let source = r#"
local fwd = HtlcForward
if fwd.from.alias ~= "alice" then
  return false
end
return fwd.incoming_channel == "700762x1327x1" and fwd.incoming_amount_msat > fwd.outgoing_amount_msat
"#;
        let dir = rules_dir("HtlcForward.lua", source);
        let event = forward_event();

        let allowed = LuaEvaluator::new(dir.path())
            .evaluate(&FirewallEvent::HtlcForward(&event))
            .unwrap();
        assert!(allowed);
    }

    #[test]
    fn test_missing_script() {
        let dir = TempDir::new().unwrap();
        let event = channel_event(1);

        let err = LuaEvaluator::new(dir.path())
            .evaluate(&FirewallEvent::ChannelAccept(&event))
            .unwrap_err();
        assert!(matches!(err, RuleError::Load { .. }));
    }

    #[test]
    fn test_non_boolean_result() {
        let dir = rules_dir("ChannelAccept.lua", "return 42");
        let event = channel_event(1);

        let err = LuaEvaluator::new(dir.path())
            .evaluate(&FirewallEvent::ChannelAccept(&event))
            .unwrap_err();
        assert!(matches!(err, RuleError::NotBoolean("integer")));
    }

    #[test]
    fn test_runtime_error() {
        let dir = rules_dir("ChannelAccept.lua", "return ChannelAccept.missing.field > 1");
        let event = channel_event(1);

        let err = LuaEvaluator::new(dir.path())
            .evaluate(&FirewallEvent::ChannelAccept(&event))
            .unwrap_err();
        assert!(matches!(err, RuleError::Script(_)));
    }

    #[test]
    fn test_state_does_not_persist() {
        let dir = rules_dir(
            "ChannelAccept.lua",
            "calls = (calls or 0) + 1\nreturn calls == 1",
        );
        let evaluator = LuaEvaluator::new(dir.path());
        let event = channel_event(1);

        assert!(evaluator.evaluate(&FirewallEvent::ChannelAccept(&event)).unwrap());
        assert!(evaluator.evaluate(&FirewallEvent::ChannelAccept(&event)).unwrap());
    }

    #[test]
    fn test_script_reloaded_from_disk() {
        let dir = rules_dir("ChannelAccept.lua", "return true");
        let evaluator = LuaEvaluator::new(dir.path());
        let event = channel_event(1);

        assert!(evaluator.evaluate(&FirewallEvent::ChannelAccept(&event)).unwrap());
        fs::write(dir.path().join("ChannelAccept.lua"), "return false").unwrap();
        assert!(!evaluator.evaluate(&FirewallEvent::ChannelAccept(&event)).unwrap());
    }

    #[test]
    fn test_sandbox_has_no_io() {
        let dir = rules_dir("ChannelAccept.lua", "return io == nil and os.execute == nil");
        let event = channel_event(1);

        assert!(LuaEvaluator::new(dir.path())
            .evaluate(&FirewallEvent::ChannelAccept(&event))
            .unwrap());
    }

    #[test]
    fn test_runaway_script_is_stopped() {
        let dir = rules_dir("ChannelAccept.lua", "while true do end");
        let evaluator =
            LuaEvaluator::new(dir.path()).with_limits(DEFAULT_MEMORY_LIMIT, Duration::from_millis(50));
        let event = channel_event(1);

        let err = evaluator
            .evaluate(&FirewallEvent::ChannelAccept(&event))
            .unwrap_err();
        assert!(matches!(err, RuleError::Script(_)));
    }
}
