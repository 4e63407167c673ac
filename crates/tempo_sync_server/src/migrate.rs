//! One-time migration from the legacy per-device store.
//!
//! Earlier releases stored each device's data under its own key with no
//! user account. Migration is an explicit, versioned, run-once step per
//! device; nothing branches on legacy tables at request time.

use crate::error::{ServerError, ServerResult};
use crate::store::UserData;
use parking_lot::RwLock;
use std::collections::HashMap;
use tempo_sync_protocol::{ActivityEvent, MigrationSummary, TimedEvent, TimerSettings};
use uuid::Uuid;

/// The legacy schema version this server can import.
pub const SUPPORTED_LEGACY_VERSION: u32 = 1;

/// One device's legacy dataset.
#[derive(Debug, Clone, Default)]
pub struct LegacyDataset {
    /// Legacy store schema version.
    pub schema_version: u32,
    /// Timed events.
    pub events: Vec<TimedEvent>,
    /// Activity events.
    pub activity: Vec<ActivityEvent>,
    /// Timer settings.
    pub settings: Option<TimerSettings>,
}

/// The legacy per-device datasets awaiting migration.
#[derive(Debug, Default)]
pub struct LegacyStore {
    datasets: RwLock<HashMap<Uuid, LegacyDataset>>,
}

impl LegacyStore {
    /// Creates an empty legacy store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a device's legacy dataset.
    pub fn seed_device(&self, device_uuid: Uuid, dataset: LegacyDataset) {
        self.datasets.write().insert(device_uuid, dataset);
    }

    /// Returns a copy of a device's legacy dataset, leaving it in place.
    ///
    /// The dataset is only [`LegacyStore::take`]n out once the importing
    /// transaction has committed, so a failed import loses nothing.
    pub fn get(&self, device_uuid: &Uuid) -> Option<LegacyDataset> {
        self.datasets.read().get(device_uuid).cloned()
    }

    /// Takes a device's legacy dataset, removing it from the store.
    pub fn take(&self, device_uuid: &Uuid) -> Option<LegacyDataset> {
        self.datasets.write().remove(device_uuid)
    }
}

/// Imports a legacy dataset into the user's data, skipping duplicates.
///
/// Callers must have checked the run-once and version preconditions; this
/// function only moves records and counts what happened.
pub fn import_dataset(data: &mut UserData, legacy: &LegacyDataset) -> ServerResult<MigrationSummary> {
    if legacy.schema_version != SUPPORTED_LEGACY_VERSION {
        return Err(ServerError::InvalidRequest(format!(
            "unsupported legacy schema version {}",
            legacy.schema_version
        )));
    }

    let mut summary = MigrationSummary::default();

    for event in &legacy.events {
        event
            .validate()
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
        if data.events.contains_key(&event.uuid) {
            summary.skipped_duplicates += 1;
        } else {
            data.events.insert(event.uuid, event.clone());
            summary.pomodoro_events_migrated += 1;
        }
    }

    for event in &legacy.activity {
        if data.activity.contains_key(&event.uuid) {
            summary.skipped_duplicates += 1;
        } else {
            data.activity.insert(event.uuid, event.clone());
            summary.system_events_migrated += 1;
        }
    }

    if let Some(settings) = legacy.settings {
        if data.settings.is_none() {
            data.settings = Some(settings);
            summary.settings_migrated = true;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_sync_protocol::EventKind;

    fn legacy_with(events: Vec<TimedEvent>) -> LegacyDataset {
        LegacyDataset {
            schema_version: SUPPORTED_LEGACY_VERSION,
            events,
            activity: vec![ActivityEvent::new("screen_lock", 10, 10)],
            settings: Some(TimerSettings::new(1500, 300, 900, 50)),
        }
    }

    #[test]
    fn imports_and_counts() {
        let mut data = UserData::default();
        let legacy = legacy_with(vec![
            TimedEvent::new("a", EventKind::Focus, 1, 2, 3),
            TimedEvent::new("b", EventKind::Rest, 4, 5, 6),
        ]);

        let summary = import_dataset(&mut data, &legacy).unwrap();
        assert_eq!(summary.pomodoro_events_migrated, 2);
        assert_eq!(summary.system_events_migrated, 1);
        assert_eq!(summary.skipped_duplicates, 0);
        assert!(summary.settings_migrated);
        assert_eq!(data.events.len(), 2);
    }

    #[test]
    fn skips_duplicates_and_existing_settings() {
        let mut data = UserData::default();
        data.settings = Some(TimerSettings::new(9, 9, 9, 999));
        let existing = TimedEvent::new("already there", EventKind::Focus, 1, 2, 3);
        data.events.insert(existing.uuid, existing.clone());

        let legacy = legacy_with(vec![
            existing,
            TimedEvent::new("fresh", EventKind::Custom, 4, 5, 6),
        ]);
        let summary = import_dataset(&mut data, &legacy).unwrap();

        assert_eq!(summary.pomodoro_events_migrated, 1);
        assert_eq!(summary.skipped_duplicates, 1);
        assert!(!summary.settings_migrated);
        assert_eq!(data.settings.map(|s| s.pomodoro_time), Some(9));
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let mut data = UserData::default();
        let legacy = LegacyDataset {
            schema_version: 7,
            ..Default::default()
        };

        let err = import_dataset(&mut data, &legacy).unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[test]
    fn take_removes_dataset() {
        let store = LegacyStore::new();
        let device = Uuid::new_v4();
        store.seed_device(device, legacy_with(Vec::new()));

        assert!(store.take(&device).is_some());
        assert!(store.take(&device).is_none());
    }
}
