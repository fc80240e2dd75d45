use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use comms::{Clock, Key, ModelId, ShardId, Val, WorkerId};
use log::debug;
use serde::{Deserialize, Serialize};

use super::SnapshotErr;

/// The persisted state of one model on one shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub model_id: ModelId,
    pub shard_id: ShardId,
    pub min_clock: Clock,
    pub progress: Vec<(WorkerId, Clock)>,
    pub entries: Vec<(Key, Val)>,
}

/// Writes and reads `Snapshot`s as json files inside a directory.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    dir: PathBuf,
}

impl Checkpointer {
    /// Creates a new `Checkpointer`.
    ///
    /// # Arguments
    /// * `dir` - The directory holding the snapshots, created on the first save.
    ///
    /// # Returns
    /// A new `Checkpointer` instance.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The file holding the snapshot of `model_id` at `shard_id`.
    pub fn path(&self, model_id: ModelId, shard_id: ShardId) -> PathBuf {
        self.dir
            .join(format!("model-{model_id}-shard-{shard_id}.json"))
    }

    /// Persists `snapshot`, replacing any previous one of the same model and shard.
    ///
    /// The content is first written to a temporary file which is then renamed, a
    /// crash midway leaves the previous snapshot untouched.
    ///
    /// # Arguments
    /// * `snapshot` - The state to persist.
    ///
    /// # Returns
    /// A `SnapshotErr` on io or serialization failures.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotErr> {
        let path = self.path(snapshot.model_id, snapshot.shard_id);
        let tmp = path.with_extension("json.tmp");

        fs::create_dir_all(&self.dir).map_err(|source| io_err(&self.dir, source))?;

        let file = File::create(&tmp).map_err(|source| io_err(&tmp, source))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, snapshot).map_err(|source| SnapshotErr::Format {
            path: tmp.clone(),
            source,
        })?;
        writer.flush().map_err(|source| io_err(&tmp, source))?;
        drop(writer);

        fs::rename(&tmp, &path).map_err(|source| io_err(&path, source))?;

        debug!(
            model_id = snapshot.model_id,
            shard_id = snapshot.shard_id,
            min_clock = snapshot.min_clock;
            "snapshot written"
        );
        Ok(())
    }

    /// Reads back the snapshot of `model_id` at `shard_id`.
    ///
    /// # Returns
    /// The snapshot, or a `SnapshotErr` if it's missing, unreadable or belongs
    /// to another model or shard.
    pub fn load(&self, model_id: ModelId, shard_id: ShardId) -> Result<Snapshot, SnapshotErr> {
        let path = self.path(model_id, shard_id);

        let file = File::open(&path).map_err(|source| io_err(&path, source))?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| SnapshotErr::Format {
                path: path.clone(),
                source,
            })?;

        let got = (snapshot.model_id, snapshot.shard_id);
        if got != (model_id, shard_id) {
            return Err(SnapshotErr::Mismatch {
                path,
                expected: (model_id, shard_id),
                got,
            });
        }

        Ok(snapshot)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> SnapshotErr {
    SnapshotErr::Io {
        path: path.to_path_buf(),
        source,
    }
}
