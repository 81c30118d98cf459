//! Request parameters.
//!
//! These values are read once by the serializer and never retained.

use std::fmt;

use crate::error::{JobsError, Result};

/// Longest client token the service accepts.
pub const MAX_CLIENT_TOKEN_LEN: usize = 64;

/// Longest job ID the service accepts.
pub const MAX_JOB_ID_LEN: usize = 64;

/// Largest step timeout, in minutes (7 days).
pub const MAX_STEP_TIMEOUT_MINUTES: u32 = 10080;

/// Job ID that addresses the next pending execution in Describe requests.
pub const NEXT_JOB_ID: &str = "$next";

/// The four request kinds of the jobs protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// List pending job executions.
    GetPending,
    /// Start the next pending job execution.
    StartNext,
    /// Describe one job execution.
    Describe,
    /// Update the status of a job execution.
    Update,
}

impl OperationKind {
    /// All kinds, in protocol order.
    pub const ALL: [OperationKind; 4] = [
        OperationKind::GetPending,
        OperationKind::StartNext,
        OperationKind::Describe,
        OperationKind::Update,
    ];

    /// Human-readable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::GetPending => "GET PENDING",
            OperationKind::StartNext => "START NEXT",
            OperationKind::Describe => "DESCRIBE",
            OperationKind::Update => "UPDATE",
        }
    }

    /// Whether requests of this kind are addressed to a specific job ID.
    pub fn requires_job_id(&self) -> bool {
        matches!(self, OperationKind::Describe | OperationKind::Update)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job execution states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobState {
    Queued,
    #[default]
    InProgress,
    Failed,
    Succeeded,
    Canceled,
    TimedOut,
    Rejected,
    Removed,
}

impl JobState {
    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "QUEUED",
            JobState::InProgress => "IN_PROGRESS",
            JobState::Failed => "FAILED",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Canceled => "CANCELED",
            JobState::TimedOut => "TIMED_OUT",
            JobState::Rejected => "REJECTED",
            JobState::Removed => "REMOVED",
        }
    }

    /// Parse a wire name, with or without surrounding quotes.
    pub fn from_wire(value: &[u8]) -> Option<Self> {
        let value = crate::json::unquote(value).unwrap_or(value);
        Some(match value {
            b"QUEUED" => JobState::Queued,
            b"IN_PROGRESS" => JobState::InProgress,
            b"FAILED" => JobState::Failed,
            b"SUCCEEDED" => JobState::Succeeded,
            b"CANCELED" => JobState::Canceled,
            b"TIMED_OUT" => JobState::TimedOut,
            b"REJECTED" => JobState::Rejected,
            b"REMOVED" => JobState::Removed,
            _ => return None,
        })
    }

    /// Whether a device may report this state in an Update request.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            JobState::InProgress | JobState::Failed | JobState::Succeeded | JobState::Rejected
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step timeout carried by StartNext and Update requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepTimeout {
    /// Leave `stepTimeoutInMinutes` out of the request.
    #[default]
    NotSet,
    /// Cancel a previously set step timeout (sent as `-1`).
    Cancel,
    /// New step timeout in minutes.
    Minutes(u32),
}

impl StepTimeout {
    /// Wire value, or `None` when the field is omitted.
    pub fn wire_value(&self) -> Option<i64> {
        match self {
            StepTimeout::NotSet => None,
            StepTimeout::Cancel => Some(-1),
            StepTimeout::Minutes(minutes) => Some(i64::from(*minutes)),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            StepTimeout::Minutes(minutes) if !(1..=MAX_STEP_TIMEOUT_MINUTES).contains(minutes) => {
                Err(JobsError::BadParameter(format!(
                    "step timeout must be 1..={} minutes, got {}",
                    MAX_STEP_TIMEOUT_MINUTES, minutes
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Per-request options shared by every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// Custom client token. A token is generated when `None`.
    pub client_token: Option<String>,
    /// Target job ID for Describe and Update.
    pub job_id: Option<String>,
}

impl RequestInfo {
    /// Empty request info: generated token, no job ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom client token.
    pub fn with_client_token(mut self, token: impl Into<String>) -> Self {
        self.client_token = Some(token.into());
        self
    }

    /// Address a specific job ID.
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Check the info against the requirements of `kind`.
    pub fn validate(&self, kind: OperationKind) -> Result<()> {
        if let Some(token) = &self.client_token {
            super::token::validate_client_token(token)?;
        }

        match (&self.job_id, kind.requires_job_id()) {
            (None, true) => Err(JobsError::BadParameter(format!(
                "{} requests need a job ID",
                kind
            ))),
            (Some(job_id), true) => validate_job_id(job_id, kind),
            _ => Ok(()),
        }
    }
}

fn validate_job_id(job_id: &str, kind: OperationKind) -> Result<()> {
    if job_id == NEXT_JOB_ID {
        return match kind {
            OperationKind::Describe => Ok(()),
            _ => Err(JobsError::BadParameter(format!(
                "{} is only valid for DESCRIBE",
                NEXT_JOB_ID
            ))),
        };
    }

    let valid_chars = job_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if job_id.is_empty() || job_id.len() > MAX_JOB_ID_LEN || !valid_chars {
        return Err(JobsError::BadParameter(format!("invalid job ID {:?}", job_id)));
    }

    Ok(())
}

/// Parameters of StartNext and Update requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateInfo {
    /// New status (Update only).
    pub new_status: JobState,
    /// Expected job execution version (Update only), sent as a quoted string.
    /// `Some(0)` is treated as unset.
    pub expected_version: Option<u32>,
    /// Execution number (Update only). `Some(0)` is treated as unset.
    pub execution_number: Option<u32>,
    /// Step timeout.
    pub step_timeout: StepTimeout,
    /// Ask the service to return the execution state (Update only).
    pub include_job_execution_state: bool,
    /// Ask the service to return the job document (Update only).
    pub include_job_document: bool,
    /// Raw JSON object copied verbatim into `statusDetails`.
    pub status_details: Option<String>,
}

impl UpdateInfo {
    /// Update info reporting `status`.
    pub fn new(status: JobState) -> Self {
        Self {
            new_status: status,
            ..Self::default()
        }
    }

    /// Check the info against the requirements of `kind`.
    pub fn validate(&self, kind: OperationKind) -> Result<()> {
        self.step_timeout.validate()?;

        if kind == OperationKind::Update && !self.new_status.is_reportable() {
            return Err(JobsError::BadParameter(format!(
                "{} cannot be reported by a device",
                self.new_status
            )));
        }

        Ok(())
    }
}

/// Parameters of Describe requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescribeInfo {
    /// Execution to describe; latest when `None` or `Some(0)`.
    pub execution_number: Option<u32>,
    /// Ask the service to return the job document.
    pub include_job_document: bool,
}

/// A request kind bound to its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestContents<'a> {
    GetPending,
    StartNext(&'a UpdateInfo),
    Describe(&'a DescribeInfo),
    Update(&'a UpdateInfo),
}

impl RequestContents<'_> {
    /// Kind of the request.
    pub fn kind(&self) -> OperationKind {
        match self {
            RequestContents::GetPending => OperationKind::GetPending,
            RequestContents::StartNext(_) => OperationKind::StartNext,
            RequestContents::Describe(_) => OperationKind::Describe,
            RequestContents::Update(_) => OperationKind::Update,
        }
    }

    /// Validate the parameters for this kind.
    pub fn validate(&self) -> Result<()> {
        match self {
            RequestContents::StartNext(info) | RequestContents::Update(info) => {
                info.validate(self.kind())
            }
            RequestContents::GetPending | RequestContents::Describe(_) => Ok(()),
        }
    }
}
