//! State synchronization: JSON Patch deltas and message reconciliation.
//!
//! Snapshot events replace wholesale; STATE_DELTA applies RFC 6902
//! operations atomically; MESSAGES_SNAPSHOT is authoritative and gets
//! deduplicated against itself by id before replacing the history.

use std::collections::HashMap;

use json_patch::Patch;
use serde_json::Value;
use weft_protocol_ag_ui::Message;

/// Error applying a STATE_DELTA to the state document.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The delta is not a valid RFC 6902 operation list.
    #[error("malformed patch: {0}")]
    Malformed(#[source] serde_json::Error),
    /// An operation failed against the current document.
    #[error("patch failed: {0}")]
    Apply(#[source] json_patch::PatchError),
}

/// Apply RFC 6902 operations to `doc`, all or nothing.
///
/// The patch runs against a working copy, so a failing operation can never
/// leave the caller's document half-patched.
pub fn apply_delta(doc: &Value, ops: &[Value]) -> Result<Value, PatchError> {
    let patch: Patch =
        serde_json::from_value(Value::Array(ops.to_vec())).map_err(PatchError::Malformed)?;
    let mut next = doc.clone();
    json_patch::patch(&mut next, patch.0.as_slice()).map_err(PatchError::Apply)?;
    Ok(next)
}

/// Alias table mapping unstable upstream message ids to stable ones.
///
/// Some backends re-announce a status message under a fresh id on every
/// update. Registering an alias makes every event naming the unstable id
/// land on the stable one. When both an alias and a direct id match exist,
/// the alias wins.
#[derive(Debug, Clone, Default)]
pub struct MessageAliases {
    map: HashMap<String, String>,
}

impl MessageAliases {
    /// Map `alias` to `canonical`. A later registration replaces an earlier
    /// one for the same alias.
    pub fn insert(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.map.insert(alias.into(), canonical.into());
    }

    /// Resolve an id through the table. Single hop: aliases do not chain.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.map.get(id).map(String::as_str).unwrap_or(id)
    }
}

/// Deduplicate snapshot messages by alias-resolved id.
///
/// Ordering follows each id's first appearance; duplicate ids coalesce to
/// the latest value seen.
pub fn reconcile_messages(messages: Vec<Message>, aliases: &MessageAliases) -> Vec<Message> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, Message> = HashMap::new();
    for message in messages {
        let id = aliases.resolve(message.id()).to_string();
        if !latest.contains_key(&id) {
            order.push(id.clone());
        }
        latest.insert(id, message);
    }
    order
        .into_iter()
        .filter_map(|id| latest.remove(&id))
        .collect()
}
