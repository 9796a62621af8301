use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use grasp_core::{Event, EventKind, PersistenceError};
use serde::Serialize;
use tracing::info;

/// Destination of a participant's trial record.
pub trait PersistenceSink {
    /// Checks the destination is writable before the session starts.
    fn probe(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// Refuses participant ids this sink cannot store without colliding with
    /// another participant.
    fn check_participant(&self, _participant_id: &str) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// Writes the participant's whole record, replacing any earlier write.
    fn write_trial(&mut self, participant_id: &str, events: &[Event])
    -> Result<(), PersistenceError>;
}

#[derive(Serialize)]
struct Row {
    event: EventKind,
    timestamp: f64,
}

/// Checks that `participant_id` can name a data file as-is: non-empty and
/// made of ASCII letters, digits, `-` and `_` only.
pub fn validate_participant_id(participant_id: &str) -> Result<(), PersistenceError> {
    if participant_id.is_empty() {
        return Err(PersistenceError::Rejected("participant id is empty".into()));
    }
    if let Some(c) = participant_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(PersistenceError::Rejected(format!(
            "participant id {participant_id:?} contains {c:?}; use letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

/// Writes `participant_{id}_data.csv` with `event,timestamp` columns.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for `participant_id`. Only meaningful for ids accepted by
    /// [`validate_participant_id`].
    pub fn path_for(&self, participant_id: &str) -> PathBuf {
        self.dir.join(format!("participant_{participant_id}_data.csv"))
    }
}

impl PersistenceSink for CsvSink {
    fn check_participant(&self, participant_id: &str) -> Result<(), PersistenceError> {
        validate_participant_id(participant_id)
    }

    fn probe(&mut self) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let meta = fs::metadata(&self.dir)?;
        if meta.permissions().readonly() {
            return Err(PersistenceError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", self.dir.display()),
            )));
        }
        Ok(())
    }

    fn write_trial(
        &mut self,
        participant_id: &str,
        events: &[Event],
    ) -> Result<(), PersistenceError> {
        self.check_participant(participant_id)?;
        let path = self.path_for(participant_id);
        let mut writer = csv::Writer::from_path(&path).map_err(io::Error::from)?;
        if events.is_empty() {
            writer
                .write_record(["event", "timestamp"])
                .map_err(io::Error::from)?;
        }
        for event in events {
            writer
                .serialize(Row {
                    event: event.kind(),
                    timestamp: event.timestamp().as_secs_f64(),
                })
                .map_err(io::Error::from)?;
        }
        writer.flush()?;
        info!(path = %path.display(), events = events.len(), "data saved");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<(String, Vec<Event>)>,
    failures_left: usize,
}

/// Keeps written records in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The next `n` writes are rejected.
    pub fn fail_next(&self, n: usize) {
        self.state().failures_left = n;
    }

    /// Every successful write, oldest first.
    pub fn records(&self) -> Vec<(String, Vec<Event>)> {
        self.state().records.clone()
    }

    /// Most recent successful write for `participant_id`.
    pub fn latest(&self, participant_id: &str) -> Option<Vec<Event>> {
        self.state()
            .records
            .iter()
            .rev()
            .find(|(id, _)| id == participant_id)
            .map(|(_, events)| events.clone())
    }
}

impl PersistenceSink for MemorySink {
    fn write_trial(
        &mut self,
        participant_id: &str,
        events: &[Event],
    ) -> Result<(), PersistenceError> {
        let mut state = self.state();
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(PersistenceError::Rejected("injected failure".into()));
        }
        state
            .records
            .push((participant_id.to_string(), events.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use grasp_core::Timestamp;
    use tempfile::TempDir;

    fn events() -> Vec<Event> {
        vec![
            Event::new(EventKind::GogglesOpaque, Timestamp::from_nanos(1_700_000_000_000_000_000)),
            Event::new(EventKind::Beep, Timestamp::from_nanos(1_700_000_000_500_000_000)),
        ]
    }

    #[test]
    fn writes_two_column_csv() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path());
        sink.probe().unwrap();

        sink.write_trial("P01", &events()).unwrap();

        let contents = fs::read_to_string(dir.path().join("participant_P01_data.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "event,timestamp");
        assert_eq!(lines[1], "goggles_opaque,1700000000.0");
        assert_eq!(lines[2], "beep,1700000000.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path());

        sink.write_trial("P01", &events()).unwrap();
        sink.write_trial("P01", &events()[..1]).unwrap();

        let contents = fs::read_to_string(sink.path_for("P01")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn empty_record_still_has_header() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path());

        sink.write_trial("P02", &[]).unwrap();
        let contents = fs::read_to_string(sink.path_for("P02")).unwrap();
        assert_eq!(contents.trim_end(), "event,timestamp");
    }

    #[test]
    fn participant_ids_outside_file_safe_set_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path());

        for id in ["../etc/x", "P/1", "P 1", ""] {
            let err = sink.write_trial(id, &events()).unwrap_err();
            assert!(matches!(err, PersistenceError::Rejected(_)), "{id:?}");
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        sink.write_trial("P_1", &events()).unwrap();
        assert!(dir.path().join("participant_P_1_data.csv").is_file());
    }

    #[test]
    fn distinct_valid_ids_get_distinct_files() {
        let sink = CsvSink::new("/data");
        assert_ne!(sink.path_for("P_1"), sink.path_for("P-1"));
        assert!(validate_participant_id("S12-b_3").is_ok());
    }

    #[test]
    fn probe_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("sessions").join("2026");
        let mut sink = CsvSink::new(&nested);
        sink.probe().unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn missing_directory_fails_write() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path().join("absent"));
        let err = sink.write_trial("P01", &events()).unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
    }

    #[test]
    fn memory_sink_injects_failures() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        sink.fail_next(1);

        assert!(writer.write_trial("P01", &events()).is_err());
        writer.write_trial("P01", &events()).unwrap();
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.latest("P01"), Some(events()));
    }
}
