//! TimelineManager - branching, append-only snapshot store
//!
//! A branch does not copy its parent's history. It records the parent and the
//! branch turn; reads at or below that turn resolve through the parent. Since
//! appends only ever extend a timeline past its own latest turn, the shared
//! prefix can never change underneath a child.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{NacioError, Result};
use crate::core::types::{TimelineId, Turn};
use crate::timeline::snapshot::Snapshot;

/// Where a timeline split from its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPoint {
    pub timeline: TimelineId,
    pub turn: Turn,
}

/// Summary of one timeline, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineInfo {
    pub id: TimelineId,
    pub label: String,
    pub parent: Option<BranchPoint>,
    /// First turn stored by this timeline itself
    pub origin: Turn,
    /// Latest visible turn, `None` for an empty root
    pub latest_turn: Option<Turn>,
    /// Snapshots owned by this timeline (not inherited)
    pub owned: usize,
}

/// Requested turn was not available; `used` was read instead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    pub requested: Turn,
    pub used: Turn,
}

/// Outcome of a resume request
#[derive(Debug, Clone)]
pub struct Resumed {
    pub timeline: TimelineId,
    pub snapshot: Arc<Snapshot>,
    pub fallback: Option<Fallback>,
}

#[derive(Debug, Clone)]
pub(crate) struct Timeline {
    pub(crate) id: TimelineId,
    pub(crate) label: String,
    pub(crate) parent: Option<BranchPoint>,
    pub(crate) origin: Turn,
    pub(crate) snapshots: Vec<Arc<Snapshot>>,
    /// Creation sequence, for stable listing order
    pub(crate) seq: u64,
}

impl Timeline {
    fn next_turn(&self) -> Turn {
        self.origin + self.snapshots.len() as Turn
    }

    fn own(&self, turn: Turn) -> Option<&Arc<Snapshot>> {
        turn.checked_sub(self.origin)
            .and_then(|offset| self.snapshots.get(offset as usize))
    }
}

#[derive(Debug, Default)]
pub(crate) struct Inner {
    pub(crate) timelines: AHashMap<TimelineId, Timeline>,
    next_seq: u64,
}

impl Inner {
    fn get(&self, id: TimelineId) -> Result<&Timeline> {
        self.timelines
            .get(&id)
            .ok_or_else(|| NacioError::not_found(format!("timeline {}", id)))
    }

    pub(crate) fn insert(
        &mut self,
        id: TimelineId,
        label: String,
        parent: Option<BranchPoint>,
        origin: Turn,
        snapshots: Vec<Arc<Snapshot>>,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timelines.insert(
            id,
            Timeline {
                id,
                label,
                parent,
                origin,
                snapshots,
                seq,
            },
        );
    }

    /// Snapshot visible from `id` at `turn`, walking up the ancestry
    pub(crate) fn read(&self, id: TimelineId, turn: Turn) -> Result<Option<Arc<Snapshot>>> {
        let mut current = self.get(id)?;
        loop {
            if turn >= current.origin {
                return Ok(current.own(turn).cloned());
            }
            match current.parent {
                Some(parent) if turn <= parent.turn => current = self.get(parent.timeline)?,
                _ => return Ok(None),
            }
        }
    }

    fn latest(&self, id: TimelineId) -> Result<Option<Arc<Snapshot>>> {
        let timeline = self.get(id)?;
        if let Some(last) = timeline.snapshots.last() {
            return Ok(Some(Arc::clone(last)));
        }
        match timeline.parent {
            Some(parent) => self.read(parent.timeline, parent.turn),
            None => Ok(None),
        }
    }

    fn info(&self, timeline: &Timeline) -> TimelineInfo {
        let latest_turn = match (timeline.snapshots.last(), timeline.parent) {
            (Some(last), _) => Some(last.turn()),
            (None, Some(parent)) => Some(parent.turn),
            (None, None) => None,
        };
        TimelineInfo {
            id: timeline.id,
            label: timeline.label.clone(),
            parent: timeline.parent,
            origin: timeline.origin,
            latest_turn,
            owned: timeline.snapshots.len(),
        }
    }

    pub(crate) fn ordered(&self) -> Vec<&Timeline> {
        let mut all: Vec<&Timeline> = self.timelines.values().collect();
        all.sort_by_key(|t| t.seq);
        all
    }

    fn children(&self, id: TimelineId) -> Vec<TimelineId> {
        self.ordered()
            .into_iter()
            .filter(|t| t.parent.map(|p| p.timeline) == Some(id))
            .map(|t| t.id)
            .collect()
    }
}

/// Shared handle to every timeline of a game
///
/// Cloning is cheap and every clone sees the same store. Readers run
/// concurrently; `branch`, `append` and `delete` take the write lock, so a
/// branch never observes a half-finished append.
#[derive(Debug, Clone, Default)]
pub struct TimelineManager {
    inner: Arc<RwLock<Inner>>,
}

impl TimelineManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    // A panic while holding the lock cannot leave a half-written timeline:
    // every mutation is a single insert or push after validation.
    pub(crate) fn read_lock(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// New empty root timeline; its first append must be turn 0
    pub fn create_timeline(&self) -> TimelineId {
        self.create_labeled("main")
    }

    pub fn create_labeled(&self, label: impl Into<String>) -> TimelineId {
        self.create_at(label, 0)
    }

    /// New root timeline whose history starts at `origin`
    ///
    /// Used when play continues from a single saved snapshot: the first
    /// append must be turn `origin`, and nothing before it is readable.
    pub fn create_at(&self, label: impl Into<String>, origin: Turn) -> TimelineId {
        let id = TimelineId::new();
        let label = label.into();
        tracing::info!(timeline = %id.short(), label = %label, origin, "Timeline created");
        self.write_lock().insert(id, label, None, origin, Vec::new());
        id
    }

    /// New child of `id` sharing every snapshot up to and including `at_turn`
    pub fn branch(&self, id: TimelineId, at_turn: Turn) -> Result<TimelineId> {
        let mut inner = self.write_lock();
        inner.get(id)?;
        if inner.read(id, at_turn)?.is_none() {
            return Err(NacioError::InvalidBranchPoint {
                timeline: id,
                turn: at_turn,
            });
        }

        let child = TimelineId::new();
        let label = format!("{}@{}", id.short(), at_turn);
        inner.insert(
            child,
            label,
            Some(BranchPoint {
                timeline: id,
                turn: at_turn,
            }),
            at_turn + 1,
            Vec::new(),
        );
        tracing::info!(parent = %id.short(), child = %child.short(), turn = at_turn, "Timeline branched");
        Ok(child)
    }

    /// Commit the next snapshot; its turn must be exactly latest + 1
    pub fn append(&self, id: TimelineId, snapshot: Snapshot) -> Result<Arc<Snapshot>> {
        let mut inner = self.write_lock();
        let timeline = inner
            .timelines
            .get_mut(&id)
            .ok_or_else(|| NacioError::not_found(format!("timeline {}", id)))?;

        let expected = timeline.next_turn();
        if snapshot.turn() != expected {
            return Err(NacioError::OutOfOrder {
                timeline: id,
                expected,
                got: snapshot.turn(),
            });
        }

        let snapshot = Arc::new(snapshot);
        timeline.snapshots.push(Arc::clone(&snapshot));
        tracing::debug!(timeline = %id.short(), turn = expected, "Snapshot appended");
        Ok(snapshot)
    }

    /// Snapshot at `turn` as seen from `id`
    pub fn read(&self, id: TimelineId, turn: Turn) -> Result<Arc<Snapshot>> {
        self.read_lock()
            .read(id, turn)?
            .ok_or_else(|| NacioError::not_found(format!("turn {} on timeline {}", turn, id)))
    }

    pub fn latest(&self, id: TimelineId) -> Result<Arc<Snapshot>> {
        self.read_lock()
            .latest(id)?
            .ok_or_else(|| NacioError::not_found(format!("snapshots on timeline {}", id)))
    }

    /// Every visible snapshot of `id`, oldest first
    pub fn history(&self, id: TimelineId) -> Result<Vec<Arc<Snapshot>>> {
        let inner = self.read_lock();
        let mut segments = Vec::new();
        let mut current = inner.get(id)?;
        let mut upto = Turn::MAX;
        loop {
            let owned: Vec<Arc<Snapshot>> = current
                .snapshots
                .iter()
                .filter(|s| s.turn() <= upto)
                .cloned()
                .collect();
            segments.push(owned);
            match current.parent {
                Some(parent) => {
                    upto = parent.turn;
                    current = inner.get(parent.timeline)?;
                }
                None => break,
            }
        }
        Ok(segments.into_iter().rev().flatten().collect())
    }

    pub fn contains(&self, id: TimelineId) -> bool {
        self.read_lock().timelines.contains_key(&id)
    }

    pub fn info(&self, id: TimelineId) -> Result<TimelineInfo> {
        let inner = self.read_lock();
        let timeline = inner.get(id)?;
        Ok(inner.info(timeline))
    }

    /// Every timeline, in creation order
    pub fn list(&self) -> Vec<TimelineInfo> {
        let inner = self.read_lock();
        inner.ordered().into_iter().map(|t| inner.info(t)).collect()
    }

    /// Direct children of `id`
    pub fn children(&self, id: TimelineId) -> Result<Vec<TimelineId>> {
        let inner = self.read_lock();
        inner.get(id)?;
        Ok(inner.children(id))
    }

    pub fn set_label(&self, id: TimelineId, label: impl Into<String>) -> Result<()> {
        let mut inner = self.write_lock();
        let timeline = inner
            .timelines
            .get_mut(&id)
            .ok_or_else(|| NacioError::not_found(format!("timeline {}", id)))?;
        timeline.label = label.into();
        Ok(())
    }

    /// Remove `id` and all of its descendants; returns what was removed
    pub fn delete(&self, id: TimelineId) -> Result<Vec<TimelineId>> {
        let mut inner = self.write_lock();
        inner.get(id)?;

        let mut doomed = vec![id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let children = inner.children(doomed[cursor]);
            doomed.extend(children);
            cursor += 1;
        }
        for dead in &doomed {
            inner.timelines.remove(dead);
        }
        tracing::info!(timeline = %id.short(), removed = doomed.len(), "Timeline deleted");
        Ok(doomed)
    }

    /// Snapshot to continue play from
    ///
    /// `None` means the latest turn. A turn that is not visible from the
    /// timeline falls back to the latest snapshot and reports it.
    pub fn resume(&self, id: TimelineId, turn: Option<Turn>) -> Result<Resumed> {
        let inner = self.read_lock();
        let latest = inner
            .latest(id)?
            .ok_or_else(|| NacioError::not_found(format!("snapshots on timeline {}", id)))?;

        let Some(requested) = turn else {
            return Ok(Resumed {
                timeline: id,
                snapshot: latest,
                fallback: None,
            });
        };

        match inner.read(id, requested)? {
            Some(snapshot) => Ok(Resumed {
                timeline: id,
                snapshot,
                fallback: None,
            }),
            None => {
                let used = latest.turn();
                tracing::warn!(
                    timeline = %id.short(),
                    requested,
                    used,
                    "Requested turn not found, resuming from latest"
                );
                Ok(Resumed {
                    timeline: id,
                    snapshot: latest,
                    fallback: Some(Fallback { requested, used }),
                })
            }
        }
    }
}
