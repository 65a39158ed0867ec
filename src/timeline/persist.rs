//! Versioned on-disk formats
//!
//! Everything written to disk is wrapped in an envelope carrying a schema
//! version. Version 1 predates approval and territory; those nations load
//! with the defaults a freshly created nation would get. Anything newer than
//! this build understands is refused rather than guessed at.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{NacioError, Result};
use crate::core::types::{TimelineId, Turn};
use crate::nation::state::DEFAULT_APPROVAL;
use crate::timeline::manager::{BranchPoint, Inner, TimelineManager};
use crate::timeline::snapshot::Snapshot;

/// Version written by this build
pub const SCHEMA_VERSION: u32 = 2;

/// Territory given to nations loaded from version 1 files
const V1_DEFAULT_TERRITORY: u32 = 10;

/// A payload that can be written inside an envelope
pub trait Persisted: Serialize + DeserializeOwned {
    /// Tag stored next to the version so a save game is never read as a snapshot
    const KIND: &'static str;

    /// Rewrite a version-1 payload in place
    fn migrate_v1(payload: &mut Value);
}

#[derive(Serialize)]
struct Envelope<T> {
    schema_version: u32,
    kind: String,
    payload: T,
}

/// Every timeline of a game, in creation order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineArchive {
    pub timelines: Vec<TimelineRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineRecord {
    pub id: TimelineId,
    pub label: String,
    pub parent: Option<BranchPoint>,
    pub origin: Turn,
    /// Only the snapshots owned by this timeline
    pub snapshots: Vec<Snapshot>,
}

impl Persisted for Snapshot {
    const KIND: &'static str = "snapshot";

    fn migrate_v1(payload: &mut Value) {
        if let Some(nations) = payload
            .get_mut("world")
            .and_then(|world| world.get_mut("nations"))
            .and_then(Value::as_object_mut)
        {
            for nation in nations.values_mut().filter_map(Value::as_object_mut) {
                nation
                    .entry("approval")
                    .or_insert_with(|| Value::from(DEFAULT_APPROVAL));
                nation
                    .entry("territory")
                    .or_insert_with(|| Value::from(V1_DEFAULT_TERRITORY));
            }
        }
    }
}

impl Persisted for TimelineArchive {
    const KIND: &'static str = "timelines";

    fn migrate_v1(payload: &mut Value) {
        let Some(timelines) = payload.get_mut("timelines").and_then(Value::as_array_mut) else {
            return;
        };
        for timeline in timelines {
            if let Some(snapshots) = timeline.get_mut("snapshots").and_then(Value::as_array_mut) {
                snapshots.iter_mut().for_each(Snapshot::migrate_v1);
            }
        }
    }
}

pub fn encode<T: Persisted>(payload: &T) -> Result<String> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        kind: T::KIND.to_string(),
        payload,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Parse an envelope, migrating older versions forward
pub fn decode<T: Persisted>(content: &str) -> Result<T> {
    let mut root: Value = serde_json::from_str(content)?;

    // Files without a version field were written before versioning existed
    let version = match root.get("schema_version") {
        None => 1,
        Some(field) => field
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| (1..=SCHEMA_VERSION).contains(v))
            .ok_or_else(|| NacioError::SchemaVersion {
                found: field.to_string(),
                supported: SCHEMA_VERSION,
            })?,
    };

    if let Some(kind) = root.get("kind").and_then(Value::as_str) {
        if kind != T::KIND {
            return Err(NacioError::Validation(format!(
                "expected a {} file, found {}",
                T::KIND,
                kind
            )));
        }
    }

    let mut payload = root
        .get_mut("payload")
        .map(Value::take)
        .ok_or_else(|| NacioError::Validation("file has no payload".into()))?;

    if version == 1 {
        tracing::info!(kind = T::KIND, "Migrating schema v1 payload");
        T::migrate_v1(&mut payload);
    }
    Ok(serde_json::from_value(payload)?)
}

pub fn save<T: Persisted>(path: &Path, payload: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, encode(payload)?)?;
    Ok(())
}

pub fn load<T: Persisted>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    decode(&content)
}

/// Anything a game can be continued from
#[derive(Debug, Clone)]
pub enum SavedGame {
    /// A full save: every timeline
    Archive(TimelineArchive),
    /// A single autosaved turn
    Snapshot(Snapshot),
}

/// Load either a full save or one autosaved snapshot, by the envelope's kind
///
/// Files without a kind predate it and are read as snapshots.
pub fn load_game(path: &Path) -> Result<SavedGame> {
    let content = std::fs::read_to_string(path)?;
    let root: Value = serde_json::from_str(&content)?;
    if root.get("kind").and_then(Value::as_str) == Some(TimelineArchive::KIND) {
        Ok(SavedGame::Archive(decode(&content)?))
    } else {
        Ok(SavedGame::Snapshot(decode(&content)?))
    }
}

impl TimelineManager {
    /// Detached copy of every timeline, for saving
    pub fn export(&self) -> TimelineArchive {
        let inner = self.read_lock();
        let timelines = inner
            .ordered()
            .into_iter()
            .map(|t| TimelineRecord {
                id: t.id,
                label: t.label.clone(),
                parent: t.parent,
                origin: t.origin,
                snapshots: t.snapshots.iter().map(|s| Snapshot::clone(s)).collect(),
            })
            .collect();
        TimelineArchive { timelines }
    }

    /// Rebuild a manager, checking the archive is internally consistent
    pub fn import(archive: TimelineArchive) -> Result<Self> {
        let mut inner = Inner::default();
        for record in archive.timelines {
            if inner.timelines.contains_key(&record.id) {
                return Err(NacioError::Validation(format!(
                    "timeline {} appears twice",
                    record.id
                )));
            }
            if let Some(parent) = record.parent {
                if !inner.timelines.contains_key(&parent.timeline) {
                    return Err(NacioError::Validation(format!(
                        "timeline {} listed before its parent {}",
                        record.id, parent.timeline
                    )));
                }
                // The branch turn must already exist on the parent
                if record.origin != parent.turn + 1
                    || inner.read(parent.timeline, parent.turn)?.is_none()
                {
                    return Err(NacioError::InvalidBranchPoint {
                        timeline: parent.timeline,
                        turn: parent.turn,
                    });
                }
            }
            for (offset, snapshot) in record.snapshots.iter().enumerate() {
                let expected = record.origin + offset as Turn;
                if snapshot.turn() != expected {
                    return Err(NacioError::OutOfOrder {
                        timeline: record.id,
                        expected,
                        got: snapshot.turn(),
                    });
                }
            }

            let snapshots = record.snapshots.into_iter().map(Arc::new).collect();
            inner.insert(record.id, record.label, record.parent, record.origin, snapshots);
        }
        tracing::info!(timelines = inner.timelines.len(), "Timelines imported");
        Ok(TimelineManager::from_inner(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NationId;
    use crate::nation::{NationSeed, Registry};

    fn snapshot() -> Snapshot {
        let mut registry = Registry::new(1980);
        registry
            .create(
                NationId::from("a"),
                NationSeed::new("Alpha", 100.0, 1_000_000).with_neighbors(&["b"]),
            )
            .unwrap();
        registry
            .create(NationId::from("b"), NationSeed::new("Beta", 40.0, 1_000_000))
            .unwrap();
        registry.snapshot()
    }

    #[test]
    fn test_snapshot_survives_encoding() {
        let original = snapshot();
        let decoded: Snapshot = decode(&encode(&original).unwrap()).unwrap();
        assert_eq!(decoded.content_hash(), original.content_hash());
    }

    #[test]
    fn test_v1_migration_fills_defaults() {
        let mut payload = serde_json::to_value(snapshot()).unwrap();
        for nation in payload["world"]["nations"].as_object_mut().unwrap().values_mut() {
            let nation = nation.as_object_mut().unwrap();
            nation.remove("approval");
            nation.remove("territory");
        }
        let file = serde_json::json!({ "schema_version": 1, "payload": payload });

        let migrated: Snapshot = decode(&file.to_string()).unwrap();
        let nation = migrated.world().nation(&NationId::from("a")).unwrap();
        assert_eq!(nation.approval, DEFAULT_APPROVAL);
        assert_eq!(nation.territory, V1_DEFAULT_TERRITORY);
    }

    #[test]
    fn test_future_version_refused() {
        let file = serde_json::json!({ "schema_version": 99, "kind": "snapshot", "payload": {} });
        let err = decode::<Snapshot>(&file.to_string()).unwrap_err();
        assert!(matches!(
            err,
            NacioError::SchemaVersion { ref found, supported: SCHEMA_VERSION } if found == "99"
        ));
    }

    #[test]
    fn test_malformed_version_refused() {
        let payload = serde_json::to_value(snapshot()).unwrap();
        for bad in [
            serde_json::json!("banana"),
            serde_json::json!(-7),
            serde_json::json!(2.5),
            serde_json::json!(0),
            serde_json::json!(null),
            serde_json::json!(u64::from(u32::MAX) + 1),
        ] {
            let file = serde_json::json!({
                "schema_version": bad,
                "kind": "snapshot",
                "payload": payload,
            });
            let err = decode::<Snapshot>(&file.to_string()).unwrap_err();
            assert!(
                matches!(err, NacioError::SchemaVersion { .. }),
                "{} decoded as {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_missing_version_reads_as_v1() {
        let payload = serde_json::to_value(snapshot()).unwrap();
        let file = serde_json::json!({ "kind": "snapshot", "payload": payload });
        let decoded: Snapshot = decode(&file.to_string()).unwrap();
        assert_eq!(decoded.content_hash(), snapshot().content_hash());
    }

    #[test]
    fn test_kind_mismatch_refused() {
        let encoded = encode(&snapshot()).unwrap();
        assert!(matches!(
            decode::<TimelineArchive>(&encoded),
            Err(NacioError::Validation(_))
        ));
    }

    #[test]
    fn test_archive_round_trip_keeps_sharing() {
        let manager = TimelineManager::new();
        let root = manager.create_timeline();
        let base = snapshot();
        for turn in 0..3 {
            let mut world = base.to_world();
            world.turn = turn;
            manager.append(root, Snapshot::capture(world)).unwrap();
        }
        let child = manager.branch(root, 1).unwrap();

        let restored =
            TimelineManager::import(decode(&encode(&manager.export()).unwrap()).unwrap()).unwrap();
        assert_eq!(restored.list(), manager.list());
        assert!(Arc::ptr_eq(
            &restored.read(child, 1).unwrap(),
            &restored.read(root, 1).unwrap()
        ));
    }

    #[test]
    fn test_import_rejects_branch_past_parent() {
        let base = snapshot();
        let at = |turn: Turn| {
            let mut world = base.to_world();
            world.turn = turn;
            Snapshot::capture(world)
        };
        let root = TimelineId::new();
        let archive = TimelineArchive {
            timelines: vec![
                TimelineRecord {
                    id: root,
                    label: "main".into(),
                    parent: None,
                    origin: 0,
                    snapshots: vec![at(0), at(1)],
                },
                TimelineRecord {
                    id: TimelineId::new(),
                    label: "what-if".into(),
                    parent: Some(BranchPoint {
                        timeline: root,
                        turn: 3,
                    }),
                    origin: 4,
                    snapshots: vec![at(4)],
                },
            ],
        };
        assert!(matches!(
            TimelineManager::import(archive),
            Err(NacioError::InvalidBranchPoint { turn: 3, .. })
        ));
    }

    #[test]
    fn test_import_rejects_gaps() {
        let mut world = snapshot().to_world();
        world.turn = 2;
        let archive = TimelineArchive {
            timelines: vec![TimelineRecord {
                id: TimelineId::new(),
                label: "main".into(),
                parent: None,
                origin: 0,
                snapshots: vec![Snapshot::capture(world)],
            }],
        };
        assert!(matches!(
            TimelineManager::import(archive),
            Err(NacioError::OutOfOrder { expected: 0, got: 2, .. })
        ));
    }
}
