//! Per-namespace publish state machine.
//!
//! # States
//! - Clean: the distributed store holds what the durable store describes
//! - Dirty: unpublished association or content changes exist
//!
//! # State Transitions
//! ```text
//! (created) → Dirty
//! Clean | Dirty → Dirty: association set changed, associated content changed
//! Clean | Dirty → Clean: successful publish
//! ```
//!
//! No-op reconciliations and no-op edits fire no event at all, so they can
//! never move a namespace out of Clean.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    Clean,
    Dirty,
}

/// Something that happened to a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishEvent {
    /// Files were added to or removed from the association set.
    AssociationChanged,
    /// An associated file had at least one item updated or inserted.
    ContentChanged,
    /// The merged document was written to the distributed store.
    Published,
}

impl PublishState {
    /// State of a freshly created namespace: never published.
    pub const INITIAL: PublishState = PublishState::Dirty;

    pub fn on(self, event: PublishEvent) -> PublishState {
        match event {
            PublishEvent::AssociationChanged | PublishEvent::ContentChanged => PublishState::Dirty,
            PublishEvent::Published => PublishState::Clean,
        }
    }

    pub fn is_outdated(self) -> bool {
        matches!(self, PublishState::Dirty)
    }
}

impl From<bool> for PublishState {
    fn from(outdated: bool) -> Self {
        if outdated {
            PublishState::Dirty
        } else {
            PublishState::Clean
        }
    }
}

impl From<PublishState> for bool {
    fn from(state: PublishState) -> Self {
        state.is_outdated()
    }
}
