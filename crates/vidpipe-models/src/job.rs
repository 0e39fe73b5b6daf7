//! Encode job wire type and state classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire code of the success terminal state.
pub const FINISHED_CODE: i32 = 3;

/// A submitted transcode request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    /// Raw state code as reported by the service. Use [`Job::state`] /
    /// [`Job::state_class`] for the classified view.
    #[serde(rename = "State")]
    pub state: i32,
}

impl Job {
    /// The job's state as a known enumeration value, `None` for codes this
    /// crate does not recognize.
    pub fn state(&self) -> Option<JobState> {
        JobState::from_code(self.state)
    }

    /// Terminal classification of the job's state, defined for every code.
    pub fn state_class(&self) -> JobStateClass {
        JobStateClass::from_code(self.state)
    }
}

/// Closed enumeration of the remote service's job states.
///
/// States advance monotonically except for the canceling→canceled pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Scheduled,
    Processing,
    Finished,
    Error,
    Canceled,
    Canceling,
}

impl JobState {
    /// Map a wire code to a known state.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(JobState::Queued),
            1 => Some(JobState::Scheduled),
            2 => Some(JobState::Processing),
            3 => Some(JobState::Finished),
            4 => Some(JobState::Error),
            5 => Some(JobState::Canceled),
            6 => Some(JobState::Canceling),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            JobState::Queued => 0,
            JobState::Scheduled => 1,
            JobState::Processing => 2,
            JobState::Finished => 3,
            JobState::Error => 4,
            JobState::Canceled => 5,
            JobState::Canceling => 6,
        }
    }

    pub fn class(&self) -> JobStateClass {
        JobStateClass::from_code(self.code())
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Scheduled => "scheduled",
            JobState::Processing => "processing",
            JobState::Finished => "finished",
            JobState::Error => "error",
            JobState::Canceled => "canceled",
            JobState::Canceling => "canceling",
        };
        write!(f, "{}", s)
    }
}

/// Terminal classification of a job state, used by the polling loop.
///
/// Known codes use the explicit table below. Unrecognized codes above the
/// `Finished` code classify as `Cancelled` so new cancellation-family codes
/// halt monitoring instead of spinning; unrecognized codes at or below it
/// classify as `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStateClass {
    /// Queued, scheduled, or processing: keep polling
    Active,
    /// Finished: publish the output
    Succeeded,
    /// Error terminal state
    Failed,
    /// Canceling or canceled
    Cancelled,
}

impl JobStateClass {
    pub fn from_code(code: i32) -> Self {
        match JobState::from_code(code) {
            Some(JobState::Queued) | Some(JobState::Scheduled) | Some(JobState::Processing) => {
                JobStateClass::Active
            }
            Some(JobState::Finished) => JobStateClass::Succeeded,
            Some(JobState::Error) => JobStateClass::Failed,
            Some(JobState::Canceled) | Some(JobState::Canceling) => JobStateClass::Cancelled,
            None if code > FINISHED_CODE => JobStateClass::Cancelled,
            None => JobStateClass::Active,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStateClass::Active)
    }
}

/// Terminal outcome a monitor reports for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobOutcome {
    /// Output published, record can go live
    Ready,
    /// Job errored, or completion handling failed
    Failed,
    /// Job was cancelled remotely
    Cancelled,
}
