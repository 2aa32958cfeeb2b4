//! Event list - persist and restore the entries that passed a run
//!
//! A run configured with an event-list path works in one of two modes,
//! decided once when the list is initialized:
//!
//! - **Producing**: no file exists at the path. Every entry is visited and
//!   the entries passing the full selection are written at the end.
//! - **Consuming**: a file exists. Only the entries it lists are visited.
//!
//! Without a path the list is **disabled** and every entry is visited.
//!
//! # File Format
//!
//! JSON, with a SHA-256 checksum over the canonical entry list:
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "producer_run": "<uuid>",
//!   "source_entries": 5,
//!   "entries": [2],
//!   "checksum": "<sha256 hex>"
//! }
//! ```
//!
//! # Critical Invariants
//!
//! - A missing file is not an error: it selects producing mode.
//! - A file that is present but unreadable, unparsable, fails its checksum,
//!   or lists entries outside the source is fatal.
//! - `save` then `load` yields the same set of entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Current on-disk format version
pub const EVENT_LIST_FORMAT_VERSION: u32 = 1;

/// Errors loading or saving an event list
#[derive(Debug, Error)]
pub enum EventListError {
    #[error("I/O error on event list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed event list {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Event list serialization failed: {0}")]
    Serialization(String),

    #[error("Event list already initialized")]
    AlreadyInitialized,
}

impl EventListError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        EventListError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        EventListError::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Which run mode the event list selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventListMode {
    /// No path configured; visit everything, record nothing
    Disabled,
    /// Visit only the loaded entries
    Consuming,
    /// Visit everything, record passing entries, save at the end
    Producing,
}

/// Serialized event list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListFile {
    pub format_version: u32,
    pub producer_run: Uuid,
    /// Entries in the source the list was produced from, if known
    #[serde(default)]
    pub source_entries: Option<u64>,
    /// Strictly increasing entry indices
    pub entries: Vec<u64>,
    pub checksum: String,
}

impl EventListFile {
    /// Build a file body for `entries` with a fresh producer id
    pub fn new(entries: &BTreeSet<u64>, source_entries: Option<u64>) -> Result<Self, EventListError> {
        let entries: Vec<u64> = entries.iter().copied().collect();
        let checksum = compute_entries_checksum(&entries)?;
        Ok(Self {
            format_version: EVENT_LIST_FORMAT_VERSION,
            producer_run: Uuid::new_v4(),
            source_entries,
            entries,
            checksum,
        })
    }

    /// Check version, ordering, and checksum
    fn validate(&self, path: &Path) -> Result<(), EventListError> {
        if self.format_version != EVENT_LIST_FORMAT_VERSION {
            return Err(EventListError::malformed(
                path,
                format!(
                    "unsupported format version {} (expected {})",
                    self.format_version, EVENT_LIST_FORMAT_VERSION
                ),
            ));
        }
        if let Some(pair) = self.entries.windows(2).find(|w| w[0] >= w[1]) {
            return Err(EventListError::malformed(
                path,
                format!("entries not strictly increasing at {} -> {}", pair[0], pair[1]),
            ));
        }
        let expected = compute_entries_checksum(&self.entries)?;
        if expected != self.checksum {
            return Err(EventListError::malformed(path, "checksum mismatch"));
        }
        Ok(())
    }
}

/// SHA-256 over the canonical JSON form of `entries`
pub fn compute_entries_checksum(entries: &[u64]) -> Result<String, EventListError> {
    let json = serde_json::to_string(entries)
        .map_err(|e| EventListError::Serialization(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Read and validate an event list file
///
/// Returns `Ok(None)` when nothing exists at `path`.
pub fn read_event_list_file(path: &Path) -> Result<Option<EventListFile>, EventListError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(EventListError::io(path, e)),
    };
    let mut text = String::new();
    file.read_to_string(&mut text).map_err(|e| match e.kind() {
        ErrorKind::InvalidData => EventListError::malformed(path, e.to_string()),
        _ => EventListError::io(path, e),
    })?;

    let parsed: EventListFile =
        serde_json::from_str(&text).map_err(|e| EventListError::malformed(path, e.to_string()))?;
    parsed.validate(path)?;
    Ok(Some(parsed))
}

/// Write an event list file
///
/// The body goes to a sibling temporary file which is renamed over `path`
/// once fully flushed, so a failed save never leaves a truncated list that
/// a later run would pick up.
pub fn write_event_list_file(path: &Path, body: &EventListFile) -> Result<(), EventListError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| EventListError::io(path, ErrorKind::InvalidInput.into()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| -> Result<(), EventListError> {
        let file = File::create(&tmp_path).map_err(|e| EventListError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, body)
            .map_err(|e| EventListError::Serialization(e.to_string()))?;
        writer.flush().map_err(|e| EventListError::io(&tmp_path, e))?;
        drop(writer);
        fs::rename(&tmp_path, path).map_err(|e| EventListError::io(path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Owns the event list for one run
///
/// # Example
///
/// ```
/// use hlfv_selector_core::eventlist::{EventListManager, EventListMode};
///
/// let dir = std::env::temp_dir().join(format!("evlist-doc-{}", std::process::id()));
/// std::fs::create_dir_all(&dir).unwrap();
/// let path = dir.join("passing.json");
///
/// // No file yet: produce
/// let mut producer = EventListManager::new(Some(path.clone()));
/// assert_eq!(producer.initialize(5).unwrap(), EventListMode::Producing);
/// producer.record(2);
/// producer.persist().unwrap();
///
/// // File exists now: consume
/// let mut consumer = EventListManager::new(Some(path.clone()));
/// assert_eq!(consumer.initialize(5).unwrap(), EventListMode::Consuming);
/// assert!(consumer.contains(2));
/// assert!(!consumer.should_visit(3));
/// # std::fs::remove_dir_all(&dir).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct EventListManager {
    path: Option<PathBuf>,
    mode: Option<EventListMode>,
    entries: BTreeSet<u64>,
    source_entries: u64,
}

impl EventListManager {
    /// `path` of None disables the feature
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            mode: None,
            entries: BTreeSet::new(),
            source_entries: 0,
        }
    }

    /// Load the set of entries stored at `path`
    ///
    /// `Ok(None)` means the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<BTreeSet<u64>>, EventListError> {
        Ok(read_event_list_file(path.as_ref())?.map(|f| f.entries.into_iter().collect()))
    }

    /// Store `entries` at `path`
    pub fn save(path: impl AsRef<Path>, entries: &BTreeSet<u64>) -> Result<(), EventListError> {
        write_event_list_file(path.as_ref(), &EventListFile::new(entries, None)?)
    }

    /// Decide the mode for this run; called once, after normalization has
    /// seen the full source
    pub fn initialize(&mut self, source_entries: u64) -> Result<EventListMode, EventListError> {
        if self.mode.is_some() {
            return Err(EventListError::AlreadyInitialized);
        }
        self.source_entries = source_entries;

        let path = match &self.path {
            Some(path) => path.clone(),
            None => {
                self.mode = Some(EventListMode::Disabled);
                return Ok(EventListMode::Disabled);
            }
        };

        let mode = match read_event_list_file(&path)? {
            Some(file) => {
                if let Some(stored) = file.source_entries {
                    if stored != source_entries {
                        return Err(EventListError::malformed(
                            &path,
                            format!(
                                "produced from a source with {} entries, bound source has {}",
                                stored, source_entries
                            ),
                        ));
                    }
                }
                if let Some(&last) = file.entries.last() {
                    if last >= source_entries {
                        return Err(EventListError::malformed(
                            &path,
                            format!("entry {} beyond source range {}", last, source_entries),
                        ));
                    }
                }
                self.entries = file.entries.into_iter().collect();
                tracing::info!(
                    path = %path.display(),
                    entries = self.entries.len(),
                    "using existing event list"
                );
                EventListMode::Consuming
            }
            None => {
                self.entries.clear();
                tracing::info!(path = %path.display(), "no event list found, producing one");
                EventListMode::Producing
            }
        };
        self.mode = Some(mode);
        Ok(mode)
    }

    /// Mode chosen by `initialize` (None before)
    pub fn mode(&self) -> Option<EventListMode> {
        self.mode
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Membership in the loaded (or recorded) list
    pub fn contains(&self, index: u64) -> bool {
        self.entries.contains(&index)
    }

    /// Whether the event loop should process `index`
    pub fn should_visit(&self, index: u64) -> bool {
        match self.mode {
            Some(EventListMode::Consuming) => self.contains(index),
            _ => true,
        }
    }

    /// Record a passing entry (producing mode only)
    pub fn record(&mut self, index: u64) {
        if self.mode == Some(EventListMode::Producing) {
            self.entries.insert(index);
        }
    }

    /// Entries loaded or recorded so far
    pub fn entries(&self) -> &BTreeSet<u64> {
        &self.entries
    }

    /// Save the recorded list in producing mode
    ///
    /// Returns the path written, or None when there is nothing to save.
    pub fn persist(&self) -> Result<Option<PathBuf>, EventListError> {
        match (self.mode, &self.path) {
            (Some(EventListMode::Producing), Some(path)) => {
                let body = EventListFile::new(&self.entries, Some(self.source_entries))?;
                write_event_list_file(path, &body)?;
                tracing::info!(
                    path = %path.display(),
                    entries = self.entries.len(),
                    "event list saved"
                );
                Ok(Some(path.clone()))
            }
            _ => Ok(None),
        }
    }
}
