use std::{fs, io, path::PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;

use super::StateData;

/// On-disk persistence for the sync state document.
///
/// Writes go to a temp file in the same directory and are renamed over
/// the target, so a crash mid-write leaves the previous state intact.
/// A missing or unreadable file is treated as empty state.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, state: &StateData) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut file, state)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    pub fn load(&self) -> StateData {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(err) => {
                    warn!(
                        "corrupt state file {}, starting from empty state: {err}",
                        self.path.display()
                    );
                    StateData::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "no previously saved state at {}",
                    self.path.display()
                );
                StateData::default()
            }
            Err(err) => {
                warn!(
                    "unreadable state file {}, starting from empty state: {err}",
                    self.path.display()
                );
                StateData::default()
            }
        }
    }
}
