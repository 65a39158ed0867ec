//! Background snapshot writer
//!
//! Committing a turn only pushes the new snapshot onto a channel; a tokio
//! task drains it and writes one file per turn. The next turn's intake never
//! waits on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::error::{NacioError, Result};
use crate::core::types::{TimelineId, Turn};
use crate::timeline::persist;
use crate::timeline::snapshot::Snapshot;

struct Job {
    timeline: TimelineId,
    snapshot: Arc<Snapshot>,
}

pub struct Autosaver {
    tx: mpsc::UnboundedSender<Job>,
    task: JoinHandle<usize>,
    dir: PathBuf,
}

impl Autosaver {
    /// Start the writer task on `runtime`, saving under `dir`
    pub fn spawn(runtime: &Handle, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let task_dir = dir.clone();

        let task = runtime.spawn(async move {
            let mut written = 0;
            while let Some(job) = rx.recv().await {
                let turn = job.snapshot.turn();
                match write_job(&task_dir, job).await {
                    Ok(path) => {
                        written += 1;
                        tracing::debug!(path = %path.display(), "Autosaved");
                    }
                    Err(err) => tracing::warn!(%err, turn, "Autosave failed"),
                }
            }
            written
        });

        tracing::info!(dir = %dir.display(), "Autosave enabled");
        Self { tx, task, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Queue a committed snapshot; returns immediately
    pub fn submit(&self, timeline: TimelineId, snapshot: Arc<Snapshot>) -> Result<()> {
        self.tx
            .send(Job { timeline, snapshot })
            .map_err(|_| NacioError::IoError(std::io::Error::other("autosave writer has stopped")))
    }

    /// Flush everything queued and stop; returns the number of files written
    pub async fn shutdown(self) -> Result<usize> {
        drop(self.tx);
        self.task
            .await
            .map_err(|err| NacioError::IoError(std::io::Error::other(err)))
    }
}

/// File a snapshot is written to: `<dir>/<timeline>/turn-00042.json`
pub fn path_for(dir: &Path, timeline: TimelineId, turn: Turn) -> PathBuf {
    dir.join(timeline.to_string())
        .join(format!("turn-{:05}.json", turn))
}

async fn write_job(dir: &Path, job: Job) -> Result<PathBuf> {
    let path = path_for(dir, job.timeline, job.snapshot.turn());
    let content = persist::encode(job.snapshot.as_ref())?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, content).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nation::World;

    #[tokio::test]
    async fn test_autosaver_writes_every_submitted_snapshot() {
        let dir = std::env::temp_dir().join(format!("nacio-autosave-{}", TimelineId::new().short()));
        let timeline = TimelineId::new();
        let saver = Autosaver::spawn(&Handle::current(), &dir);

        for turn in 0..3 {
            let mut world = World::new(2000);
            world.turn = turn;
            saver
                .submit(timeline, Arc::new(Snapshot::capture(world)))
                .unwrap();
        }
        assert_eq!(saver.shutdown().await.unwrap(), 3);

        let restored: Snapshot = persist::load(&path_for(&dir, timeline, 2)).unwrap();
        assert_eq!(restored.turn(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
