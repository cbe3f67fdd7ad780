use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
/// Per-episode statistics of a training run.  Both vectors always have one entry per
/// finished training episode.
pub struct TrainingHistory {
    /// Mean episode length across the population
    pub times: Vec<f32>,
    /// Mean particle fitness across the population
    pub rewards: Vec<f32>,
}

impl TrainingHistory {
    /// Appends an episode
    pub fn push(&mut self, time: f32, reward: f32) {
        self.times.push(time);
        self.rewards.push(reward);
    }

    /// Number of recorded episodes
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Latest (time, reward) pair
    pub fn last(&self) -> Option<(f32, f32)> {
        match (self.times.last(), self.rewards.last()) {
            (Some(t), Some(r)) => Some((*t, *r)),
            _ => None,
        }
    }

    /// Reads a history written by [`JsonHistoryFile`]
    pub fn read<A: Read>(reader: &mut A) -> io::Result<Self> {
        let h: TrainingHistory = serde_json::from_reader(reader)?;
        if h.times.len() != h.rewards.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "times and rewards have different lengths",
            ));
        }
        Ok(h)
    }
}

/// Receives training progress.  `observe` sees every episode as it finishes while
/// `flush` gets the cumulative history.
pub trait HistorySink {
    /// Called once per training episode with its statistics
    fn observe(&mut self, _episode: usize, _time: f32, _reward: f32) {}

    /// Persists the whole history
    fn flush(&mut self, history: &TrainingHistory) -> io::Result<()>;
}

/// Keeps the history as a json document on disk, replacing the file on every flush
pub struct JsonHistoryFile {
    path: PathBuf,
}

impl JsonHistoryFile {
    /// Sink writing to `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonHistoryFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads what was last flushed
    pub fn read(&self) -> io::Result<TrainingHistory> {
        TrainingHistory::read(&mut File::open(&self.path)?)
    }
}

impl HistorySink for JsonHistoryFile {
    fn flush(&mut self, history: &TrainingHistory) -> io::Result<()> {
        // Write next to the target so the rename stays on one filesystem
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, history)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_push() {
        let mut h = TrainingHistory::default();
        assert!(h.is_empty());
        assert_eq!(h.last(), None);
        h.push(3.0, 10.0);
        h.push(4.5, 12.0);
        assert_eq!(h.len(), 2);
        assert_eq!(h.last(), Some((4.5, 12.0)));
        assert_eq!(h.times, vec![3.0, 4.5]);
        assert_eq!(h.rewards, vec![10.0, 12.0]);
    }

    #[test]
    fn test_overwrite() {
        let dir = tempdir().expect("temp dir");
        let mut sink = JsonHistoryFile::new(dir.path().join("info.json"));

        let mut h = TrainingHistory::default();
        h.push(1.0, 2.0);
        h.push(3.0, 4.0);
        sink.flush(&h).unwrap();
        assert_eq!(sink.read().unwrap(), h);

        let mut shorter = TrainingHistory::default();
        shorter.push(5.0, 6.0);
        sink.flush(&shorter).unwrap();
        assert_eq!(sink.read().unwrap(), shorter);

        let raw = std::fs::read_to_string(sink.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["times"], serde_json::json!([5.0]));
        assert_eq!(doc["rewards"], serde_json::json!([6.0]));
    }

    #[test]
    fn test_mismatched_lengths() {
        let doc = br#"{"times": [1.0, 2.0], "rewards": [1.0]}"#;
        assert!(TrainingHistory::read(&mut &doc[..]).is_err());
    }
}
