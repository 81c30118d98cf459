//! Jobs topic names.
//!
//! ```text
//! $aws/things/<thing>/jobs/get[/accepted|/rejected]                 GetPending
//! $aws/things/<thing>/jobs/start-next[/accepted|/rejected]          StartNext
//! $aws/things/<thing>/jobs/<jobId>/get[/accepted|/rejected]         Describe
//! $aws/things/<thing>/jobs/<jobId>/update[/accepted|/rejected]      Update
//! ```
//!
//! # Example
//!
//! ```
//! use iot_jobs_client::request::OperationKind;
//! use iot_jobs_client::response::ResponseClass;
//! use iot_jobs_client::topic::JobsTopics;
//!
//! let topics = JobsTopics::new("sensor-1");
//! assert_eq!(
//!     topics.request_topic(OperationKind::Update, Some("job-7")),
//!     "$aws/things/sensor-1/jobs/job-7/update"
//! );
//! assert_eq!(
//!     topics.classify("$aws/things/sensor-1/jobs/job-7/update/rejected"),
//!     Some((OperationKind::Update, ResponseClass::Rejected))
//! );
//! ```

use crate::request::OperationKind;
use crate::response::ResponseClass;

/// Topic prefix shared by every thing.
pub const THING_PREFIX: &str = "$aws/things/";

/// Longest thing name the service accepts.
pub const MAX_THING_NAME_LEN: usize = 128;

/// Single-level wildcard used in subscription filters.
const WILDCARD: &str = "+";

/// Builds and classifies jobs topics for one thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsTopics {
    prefix: String,
}

impl JobsTopics {
    /// Topics for `thing_name`.
    pub fn new(thing_name: &str) -> Self {
        Self {
            prefix: format!("{}{}/jobs/", THING_PREFIX, thing_name),
        }
    }

    /// `$aws/things/<thing>/jobs/`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Topic a request of `kind` is published on.
    ///
    /// `job_id` is used by Describe and Update only.
    pub fn request_topic(&self, kind: OperationKind, job_id: Option<&str>) -> String {
        let job_id = job_id.unwrap_or(WILDCARD);
        match kind {
            OperationKind::GetPending => format!("{}get", self.prefix),
            OperationKind::StartNext => format!("{}start-next", self.prefix),
            OperationKind::Describe => format!("{}{}/get", self.prefix, job_id),
            OperationKind::Update => format!("{}{}/update", self.prefix, job_id),
        }
    }

    /// Topic the service answers a request on.
    pub fn response_topic(
        &self,
        kind: OperationKind,
        job_id: Option<&str>,
        class: ResponseClass,
    ) -> String {
        format!("{}/{}", self.request_topic(kind, job_id), class)
    }

    /// Subscription filter covering every response of `kind` and `class`.
    pub fn subscription_filter(&self, kind: OperationKind, class: ResponseClass) -> String {
        self.response_topic(kind, None, class)
    }

    /// All subscription filters the client needs.
    pub fn subscription_filters(&self) -> Vec<String> {
        OperationKind::ALL
            .iter()
            .flat_map(|&kind| {
                [ResponseClass::Accepted, ResponseClass::Rejected]
                    .into_iter()
                    .map(move |class| self.subscription_filter(kind, class))
            })
            .collect()
    }

    /// Identify a response topic of this thing.
    ///
    /// Returns `None` for request topics, notifications and other things.
    pub fn classify(&self, topic: &str) -> Option<(OperationKind, ResponseClass)> {
        let rest = topic.strip_prefix(self.prefix.as_str())?;
        let parts: Vec<&str> = rest.split('/').collect();

        let (kind, class) = match parts.as_slice() {
            ["get", class] => (OperationKind::GetPending, *class),
            ["start-next", class] => (OperationKind::StartNext, *class),
            [job_id, "get", class] if !job_id.is_empty() => (OperationKind::Describe, *class),
            [job_id, "update", class] if !job_id.is_empty() => (OperationKind::Update, *class),
            _ => return None,
        };

        let class = match class {
            "accepted" => ResponseClass::Accepted,
            "rejected" => ResponseClass::Rejected,
            _ => return None,
        };

        Some((kind, class))
    }
}
