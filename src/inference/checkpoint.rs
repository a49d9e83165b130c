//! Parameter snapshots stored as `model-<step>.safetensors` under a run directory

use std::path::{Path, PathBuf};

use candle_nn::VarMap;
use tracing::{debug, info, warn};

use crate::error::{Result, TacotronError};

const PREFIX: &str = "model-";
const EXTENSION: &str = "safetensors";
/// Names the most recently written snapshot of a run
pub const LATEST_MARKER: &str = "latest";

/// Snapshots of one run
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at a run directory
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Run directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot path for `step`
    pub fn path_for(&self, step: usize) -> PathBuf {
        self.dir.join(format!("{}{}.{}", PREFIX, step, EXTENSION))
    }

    /// Write every variable of `varmap` as the snapshot for `step`
    pub fn save(&self, varmap: &VarMap, step: usize) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(step);
        varmap.save(&path)?;
        self.update_latest_marker(&path)?;
        info!("Saved checkpoint {:?}", path);
        Ok(path)
    }

    fn update_latest_marker(&self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TacotronError::Config(format!("unnamed checkpoint {:?}", path)))?;
        std::fs::write(self.dir.join(LATEST_MARKER), name)?;
        Ok(())
    }

    /// All snapshots ordered by step. A missing run directory has none.
    pub fn list(&self) -> Result<Vec<(usize, PathBuf)>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(step) = parse_step(&path) {
                found.push((step, path));
            }
        }
        found.sort_by_key(|(step, _)| *step);
        Ok(found)
    }

    /// Most recently written snapshot, if any.
    ///
    /// Follows the `latest` marker; runs without a usable marker fall back
    /// to the highest step.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        let marker = self.dir.join(LATEST_MARKER);
        if marker.is_file() {
            let name = std::fs::read_to_string(&marker)?;
            let path = self.dir.join(name.trim());
            if parse_step(&path).is_some() && path.is_file() {
                return Ok(Some(path));
            }
            warn!("Ignoring stale latest marker {:?}", marker);
        }
        Ok(self.list()?.pop().map(|(_, path)| path))
    }

    /// The explicit file when given, otherwise the most recent snapshot.
    ///
    /// # Errors
    /// [`TacotronError::NoCheckpoint`] when the explicit file does not exist
    /// or the run directory holds no snapshot.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let resolved = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => return Err(TacotronError::NoCheckpoint(path.to_path_buf())),
            None => self
                .latest()?
                .ok_or_else(|| TacotronError::NoCheckpoint(self.dir.clone()))?,
        };
        debug!("Resolved checkpoint {:?}", resolved);
        Ok(resolved)
    }
}

/// Step encoded in a snapshot file name
pub fn parse_step(path: &Path) -> Option<usize> {
    if path.extension()? != EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(PREFIX)?
        .parse()
        .ok()
}
