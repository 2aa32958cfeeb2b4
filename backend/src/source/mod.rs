//! Sequential event source
//!
//! The selector only ever asks a source two things: how many entries it
//! holds, and the record at a given index. Sources are read-only.
//!
//! `VecEventSource` is the in-memory implementation, loadable from JSON
//! lines (one `Event` object per line).

use crate::models::Event;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Errors reading from an event source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Entry {index} out of range (source has {entries} entries)")]
    IndexOutOfRange { index: u64, entries: u64 },

    #[error("I/O error reading event source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed event on line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Read-only, index-addressable event data
pub trait EventSource {
    /// Dataset name used in log messages
    fn name(&self) -> &str;

    /// Total number of entries (the unfiltered range is `0..entries()`)
    fn entries(&self) -> u64;

    /// Read the event at `index`
    fn read(&self, index: u64) -> Result<Event, SourceError>;
}

/// Events held in memory
#[derive(Debug, Clone, Default)]
pub struct VecEventSource {
    name: String,
    events: Vec<Event>,
}

impl VecEventSource {
    /// Wrap an existing list of events
    pub fn new(name: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }

    /// Parse JSON lines; blank lines are skipped
    pub fn from_json_lines<R: BufRead>(name: impl Into<String>, reader: R) -> Result<Self, SourceError> {
        let mut events = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = serde_json::from_str(&line).map_err(|e| SourceError::Parse {
                line: i + 1,
                message: e.to_string(),
            })?;
            events.push(event);
        }
        Ok(Self::new(name, events))
    }

    /// Load a JSON-lines file; the source is named after the file stem
    pub fn from_json_lines_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)?;
        Self::from_json_lines(name, BufReader::new(file))
    }

    /// All events, in index order
    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl EventSource for VecEventSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> u64 {
        self.events.len() as u64
    }

    fn read(&self, index: u64) -> Result<Event, SourceError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.events.get(i))
            .cloned()
            .ok_or(SourceError::IndexOutOfRange {
                index,
                entries: self.entries(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_out_of_range() {
        let source = VecEventSource::new("empty", Vec::new());
        assert_eq!(source.entries(), 0);
        assert!(matches!(
            source.read(0),
            Err(SourceError::IndexOutOfRange { index: 0, entries: 0 })
        ));
    }

    #[test]
    fn test_from_json_lines() {
        let text = "{\"run_number\": 1, \"event_number\": 10}\n\n{\"run_number\": 1, \"event_number\": 11, \"mc_channel\": 361000}\n";
        let source = VecEventSource::from_json_lines("sample", text.as_bytes()).unwrap();
        assert_eq!(source.entries(), 2);
        assert_eq!(source.read(1).unwrap().mc_channel, Some(361000));
        assert_eq!(source.name(), "sample");
    }

    #[test]
    fn test_from_json_lines_reports_line() {
        let text = "{\"run_number\": 1, \"event_number\": 10}\nnot json\n";
        let err = VecEventSource::from_json_lines("bad", text.as_bytes()).unwrap_err();
        assert!(matches!(err, SourceError::Parse { line: 2, .. }));
    }
}
