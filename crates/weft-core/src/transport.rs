//! Master→Slave handoff format for action batches.
//!
//! Master-side process plugins enqueue abstract actions through
//! [`BatchBuilder`]; the sealed batch is immutable and encoded as JSON for
//! transmission. The core's Master-side job ends here; how the bytes reach
//! the Slave host is the transport collaborator's business.

use anyhow::Context;

use crate::dispatch::{ActionBatch, ActionEnvelope};
use crate::types::{ActionId, ToolId};

/// Accumulates envelopes for one Master-side invocation.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    groups: std::collections::BTreeMap<ToolId, Vec<ActionEnvelope>>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue one action. Envelope order within a tool is preserved.
    pub fn enqueue(mut self, tool: ToolId, action: ActionId, parameters: Vec<String>) -> Self {
        self.groups
            .entry(tool)
            .or_default()
            .push(ActionEnvelope::new(tool, action, parameters));
        self
    }

    /// Freeze the batch. Nothing can be added once sealed.
    pub fn seal(self) -> ActionBatch {
        ActionBatch::from_groups(self.groups)
    }
}

/// Encode a sealed batch for transmission.
pub fn encode_batch(batch: &ActionBatch) -> anyhow::Result<String> {
    serde_json::to_string(batch).context("Failed to encode action batch")
}

/// Decode a received batch on the Slave side.
pub fn decode_batch(text: &str) -> anyhow::Result<ActionBatch> {
    serde_json::from_str(text).context("Failed to decode action batch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_groups_by_tool_preserving_order() {
        let batch = BatchBuilder::new()
            .enqueue(ToolId::Wiki, ActionId::new("Publish"), vec!["r1".into()])
            .enqueue(
                ToolId::TicketTracker,
                ActionId::new("AddLink"),
                vec!["42".into()],
            )
            .enqueue(ToolId::Wiki, ActionId::new("Announce"), vec![])
            .seal();

        assert_eq!(batch.len(), 3);
        let wiki: Vec<&str> = batch
            .envelopes_for(&ToolId::Wiki)
            .iter()
            .map(|e| e.action.as_str())
            .collect();
        assert_eq!(wiki, vec!["Publish", "Announce"]);
    }

    #[test]
    fn test_wire_roundtrip() {
        let batch = BatchBuilder::new()
            .enqueue(
                ToolId::TicketTracker,
                ActionId::new("AddLink"),
                vec!["42".into(), "rev7".into()],
            )
            .seal();

        let wire = encode_batch(&batch).unwrap();
        let decoded = decode_batch(&wire).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_batch("not json").is_err());
    }
}
