use std::fmt;

/// States reported by the job-status command, plus `Submitting` for a job
/// whose handle is known but whose status has not been queried yet. A job
/// cut short by its deadline or a cancel token ends as a `JobError` instead
/// of a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Submitting,
    Pending,
    Active,
    Unsubmitted,
    Done,
    Failed,
    StageOut,
    Suspended,
    /// Any text the status command printed that is not a known state. Terminal.
    Other(String),
}

impl JobStatus {
    /// Parses status command output; surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "PENDING" => JobStatus::Pending,
            "ACTIVE" => JobStatus::Active,
            "UNSUBMITTED" => JobStatus::Unsubmitted,
            "DONE" => JobStatus::Done,
            "FAILED" => JobStatus::Failed,
            "STAGE_OUT" => JobStatus::StageOut,
            "SUSPENDED" => JobStatus::Suspended,
            other => JobStatus::Other(other.to_string()),
        }
    }

    /// Whether the submitter keeps polling in this state.
    pub fn is_polling(&self) -> bool {
        matches!(
            self,
            JobStatus::Submitting
                | JobStatus::Pending
                | JobStatus::Active
                | JobStatus::Unsubmitted
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JobStatus::Submitting => "SUBMITTING",
            JobStatus::Pending => "PENDING",
            JobStatus::Active => "ACTIVE",
            JobStatus::Unsubmitted => "UNSUBMITTED",
            JobStatus::Done => "DONE",
            JobStatus::Failed => "FAILED",
            JobStatus::StageOut => "STAGE_OUT",
            JobStatus::Suspended => "SUSPENDED",
            JobStatus::Other(text) => text,
        };
        f.write_str(text)
    }
}
