//! Client-side deletion tombstones.

use crate::event::TimedEvent;
use crate::time::Millis;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A locally recorded deletion awaiting server acknowledgement.
///
/// Tombstones are owned exclusively by the client: they are created when the
/// user deletes a record, uploaded as part of the next delta, and purged
/// only once the round that carried them succeeds. Losing one resurrects
/// the deleted record on the next merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionTombstone {
    /// Uuid of the deleted record.
    pub uuid: Uuid,
    /// Title snapshot for display in the pending-changes view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// When the user deleted the record.
    pub deleted_at: Millis,
    /// Optional free-form reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DeletionTombstone {
    /// Records the deletion of a timed event.
    pub fn for_event(event: &TimedEvent, deleted_at: Millis) -> Self {
        Self {
            uuid: event.uuid,
            title: Some(event.title.clone()),
            deleted_at,
            reason: None,
        }
    }

    /// Records a deletion known only by uuid.
    pub fn bare(uuid: Uuid, deleted_at: Millis) -> Self {
        Self {
            uuid,
            title: None,
            deleted_at,
            reason: None,
        }
    }

    /// Sets the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
