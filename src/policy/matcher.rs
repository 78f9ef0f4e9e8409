//! Allow/deny list evaluation.
//!
//! Lists are ordered and the first matching entry flips the mode's default
//! exactly once. Later entries are never consulted.

use crate::domain::PolicyMode;

/// Matches every subject.
pub const WILDCARD: &str = "*";

/// Separator of a directional `from->to` forward entry.
pub const PAIR_SEPARATOR: &str = "->";

/// One forward list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardEntry<'a> {
    /// Matches on the incoming channel only
    Channel(&'a str),
    /// Matches on both channels; either side may be `*`
    Pair { from: &'a str, to: &'a str },
}

impl<'a> ForwardEntry<'a> {
    /// Anything that does not split into exactly two sides is a bare entry.
    pub fn parse(entry: &'a str) -> Self {
        let mut sides = entry.split(PAIR_SEPARATOR);
        match (sides.next(), sides.next(), sides.next()) {
            (Some(from), Some(to), None) => ForwardEntry::Pair { from, to },
            _ => ForwardEntry::Channel(entry),
        }
    }

    pub fn matches(&self, incoming: &str, outgoing: &str) -> bool {
        match *self {
            ForwardEntry::Channel(id) => id == WILDCARD || id == incoming,
            ForwardEntry::Pair { from, to } => {
                (from == WILDCARD || from == incoming) && (to == WILDCARD || to == outgoing)
            }
        }
    }
}

/// Decision before any entry matches.
#[inline]
pub fn initial_decision(mode: PolicyMode) -> bool {
    match mode {
        PolicyMode::Allowlist => false,
        PolicyMode::Denylist | PolicyMode::Passthrough => true,
    }
}

fn first_match_flips(mode: PolicyMode, mut hit: impl FnMut() -> bool) -> bool {
    let initial = initial_decision(mode);
    if mode.is_passthrough() {
        return initial;
    }
    if hit() {
        !initial
    } else {
        initial
    }
}

/// Channel domain: match `subject` (a pubkey) against the list.
pub fn decide_single(mode: PolicyMode, entries: &[String], subject: &str) -> bool {
    first_match_flips(mode, || {
        entries
            .iter()
            .any(|entry| entry == WILDCARD || entry == subject)
    })
}

/// Forward domain: match an `(incoming, outgoing)` channel pair against the list.
pub fn decide_pair(mode: PolicyMode, entries: &[String], incoming: &str, outgoing: &str) -> bool {
    first_match_flips(mode, || {
        entries
            .iter()
            .any(|entry| ForwardEntry::parse(entry).matches(incoming, outgoing))
    })
}
