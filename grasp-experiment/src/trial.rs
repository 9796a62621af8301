use crate::log::EventLog;

/// Events of one participant's session, written out as a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub participant_id: String,
    pub log: EventLog,
    pub trials_completed: usize,
}

impl TrialRecord {
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            log: EventLog::new(),
            trials_completed: 0,
        }
    }
}
