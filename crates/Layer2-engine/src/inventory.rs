//! Prunable inventory - numbered list of currently prunable messages
//!
//! Callers refer to entries by short numeric IDs ("1", "2", ...). Numbers
//! stay stable while the prunable set is unchanged; when the set changes,
//! the whole list is renumbered from "1" in document order. Callers holding
//! a stale number across a structural change will see it move - a known,
//! deliberate simplification.

use crate::extract::content_chars;
use crate::protection::is_protected;
use dcp_foundation::{Inventory, InventoryEntry, Message, PruneConfig, SessionState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of resolving caller-facing numeric IDs to message IDs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedInventoryIds {
    pub resolved_message_ids: Vec<String>,
    pub missing_ids: Vec<String>,
}

/// Return the current prunable inventory, recomputing only when the
/// prunable set changed.
///
/// The cached list is returned untouched when the signature matches, so
/// repeated calls within a turn hand back identical numbering.
pub fn prunable_inventory<'a>(
    messages: &[Message],
    state: &'a mut SessionState,
    config: &PruneConfig,
) -> &'a Inventory {
    let prunable: Vec<(&Message, usize)> = messages
        .iter()
        .filter(|m| m.is_tool_like())
        .filter(|m| !state.prune.is_pruned(&m.id))
        .filter(|m| !is_protected(m, config))
        .map(|m| (m, content_chars(m)))
        .collect();

    let signature = signature_for(&prunable);

    let cached = state
        .inventory
        .as_ref()
        .is_some_and(|inv| inv.signature == signature);
    if !cached {
        let entries = prunable
            .iter()
            .enumerate()
            .map(|(i, (message, chars))| InventoryEntry {
                numeric_id: (i + 1).to_string(),
                message_id: message.id.clone(),
                tool_name: message.effective_tool_name().map(str::to_string),
                chars: *chars,
            })
            .collect();
        debug!(signature = %signature, "rebuilding prunable inventory");
        state.inventory = Some(Inventory { entries, signature });
    }

    state.inventory.as_ref().unwrap()
}

/// Resolve numeric inventory IDs against the current cached inventory.
/// Unknown numbers are reported in `missing_ids`, never raised.
pub fn resolve_inventory_ids(state: &SessionState, ids: &[String]) -> ResolvedInventoryIds {
    let mut result = ResolvedInventoryIds::default();

    for id in ids {
        let entry = state
            .inventory
            .as_ref()
            .and_then(|inv| inv.lookup(id));
        match entry {
            Some(entry) => result.resolved_message_ids.push(entry.message_id.clone()),
            None => result.missing_ids.push(id.clone()),
        }
    }
    result
}

fn signature_for(prunable: &[(&Message, usize)]) -> String {
    prunable
        .iter()
        .map(|(message, chars)| format!("{}:{}", message.id, chars))
        .collect::<Vec<_>>()
        .join("|")
}
