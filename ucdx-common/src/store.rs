// Persisted cache-validation metadata, one document for the whole cache.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{Result, UcdError};
use super::model::FileState;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDoc {
    last_update: Option<DateTime<Utc>>,
    files: BTreeMap<String, FileState>,
}

/// Flat JSON document mapping logical filenames to [`FileState`],
/// rewritten in full on every mutation. There is no partial-write
/// protocol: single writer, last write wins, and concurrent writers
/// against the same backing file are a caller responsibility.
pub struct StateStore {
    path: Option<PathBuf>,
    doc: StateDoc,
}

impl StateStore {
    /// Store with no backing file; mutations are never persisted.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: StateDoc::default(),
        }
    }

    /// Load the whole document from `path`. An absent file initializes an
    /// empty store; unreadable or malformed content is fatal.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                UcdError::Store(format!(
                    "Malformed state file {}: {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty", path.display());
                StateDoc::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path),
            doc,
        })
    }

    pub fn get(&self, name: &str) -> Option<&FileState> {
        self.doc.files.get(name)
    }

    /// Record `state` for `name`, stamping `last_checked`, and rewrite the
    /// persisted document.
    pub fn set(&mut self, name: &str, state: FileState) -> Result<()> {
        let state = FileState {
            last_checked: Utc::now(),
            ..state
        };
        self.doc.files.insert(name.to_string(), state);
        self.flush()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.doc.last_update
    }

    pub fn len(&self) -> usize {
        self.doc.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.files.is_empty()
    }

    fn flush(&mut self) -> Result<()> {
        self.doc.last_update = Some(Utc::now());
        if let Some(path) = &self.path {
            debug!("Rewriting state file {}", path.display());
            let text = serde_json::to_string(&self.doc)?;
            fs::write(path, text)?;
        }
        Ok(())
    }
}
