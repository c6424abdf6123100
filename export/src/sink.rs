//! Sink implementations.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use crate::{ExportError, ExportResult};

/// A destination for serialized documents, addressed by location.
pub trait Sink {
    /// Write the content to a location, replacing earlier content.
    fn write(&mut self, location: &str, content: &str) -> ExportResult<()>;

    /// Make all written content durable.
    fn sync(&mut self) -> ExportResult<()> {
        Ok(())
    }
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Content per location
    documents: BTreeMap<String, String>,
    /// Locations in write order
    writes: Vec<String>,
    /// Fail every write after this many successful ones
    fail_after: Option<usize>,
}

impl MemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that rejects every write.
    pub fn failing() -> Self {
        Self::default().fail_after(0)
    }

    /// Reject writes after the given number of successful ones.
    pub fn fail_after(mut self, successful: usize) -> Self {
        self.fail_after = Some(successful);
        self
    }

    /// Content written to a location.
    pub fn get(&self, location: &str) -> Option<&str> {
        self.documents.get(location).map(String::as_str)
    }

    /// Locations in write order.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Sink for MemorySink {
    fn write(&mut self, location: &str, content: &str) -> ExportResult<()> {
        if self.fail_after.is_some_and(|n| self.writes.len() >= n) {
            return Err(ExportError::write_failed(location, "sink rejects writes"));
        }
        self.documents.insert(location.to_string(), content.to_string());
        self.writes.push(location.to_string());
        Ok(())
    }
}

/// File-based sink below a root directory.
#[derive(Debug)]
pub struct FileSink {
    /// Root directory; locations are relative to it.
    root: PathBuf,
    /// Files written since the last sync
    pending: Vec<PathBuf>,
}

impl FileSink {
    /// Create a sink writing below the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            pending: Vec::new(),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a location to a path below the root.
    fn resolve(&self, location: &str) -> ExportResult<PathBuf> {
        let relative = Path::new(location);
        let inside = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if location.is_empty() || !inside {
            return Err(ExportError::invalid_location(location));
        }
        Ok(self.root.join(relative))
    }
}

impl Sink for FileSink {
    fn write(&mut self, location: &str, content: &str) -> ExportResult<()> {
        let path = self.resolve(location)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "exported document");
        self.pending.push(path);
        Ok(())
    }

    fn sync(&mut self) -> ExportResult<()> {
        for path in self.pending.drain(..) {
            File::open(&path)?.sync_all()?;
        }
        Ok(())
    }
}
