//! Application: a request for time-bounded flight permission.
//!
//! An application is editable by its applicant only while in `DRAFT`.
//! From `SUBMITTED` on, only authority decisions move it, and only forward.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::transition::{AuthorityRole, Decision};
use crate::types::{ApplicationId, DroneId, UserId};

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    ApprovedByAtc,
    RejectedByAtc,
    ApprovedByAfmlu,
    RejectedByAfmlu,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Every status, in declaration order.
    pub const ALL: [ApplicationStatus; 8] = [
        Self::Draft,
        Self::Submitted,
        Self::ApprovedByAtc,
        Self::RejectedByAtc,
        Self::ApprovedByAfmlu,
        Self::RejectedByAfmlu,
        Self::Approved,
        Self::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::ApprovedByAtc => "APPROVEDBYATC",
            Self::RejectedByAtc => "REJECTEDBYATC",
            Self::ApprovedByAfmlu => "APPROVEDBYAFMLU",
            Self::RejectedByAfmlu => "REJECTEDBYAFMLU",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Statuses directly reachable from this one.
    pub fn successors(self) -> &'static [ApplicationStatus] {
        match self {
            Self::Draft => &[Self::Submitted],
            Self::Submitted => &[
                Self::ApprovedByAtc,
                Self::RejectedByAtc,
                Self::Approved,
                Self::Rejected,
            ],
            Self::ApprovedByAtc => &[Self::ApprovedByAfmlu, Self::RejectedByAfmlu],
            Self::RejectedByAtc
            | Self::ApprovedByAfmlu
            | Self::RejectedByAfmlu
            | Self::Approved
            | Self::Rejected => &[],
        }
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        self.successors().contains(&next)
    }

    /// No further transition leaves this status.
    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// The permit is granted: artifacts can be fetched and logs filed.
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved | Self::ApprovedByAfmlu)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown application status: {}", s))
    }
}

/// A point on the fly-area polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLong {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLong {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Applicant-editable content of an application.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub drone_id: DroneId,
    pub pilot_id: Option<String>,
    pub flight_purpose: Option<String>,
    pub payload_weight_kg: Option<f64>,
    pub max_altitude_ft: Option<u32>,
    pub fly_area: Vec<LatLong>,

    /// Start of the authorized window (Unix ms).
    pub start_at: i64,

    /// End of the authorized window (Unix ms).
    pub end_at: i64,

    /// Recurrence schedule in the registry's cron grammar.
    pub recurring_time_expression: Option<String>,
    pub recurring_time_duration_minutes: Option<i64>,
}

/// Whether a create/update keeps the application as a draft or submits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Submission {
    #[default]
    Draft,
    Submit,
}

impl Submission {
    pub fn is_submit(self) -> bool {
        self == Submission::Submit
    }
}

/// One authority decision, as recorded on the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub role: AuthorityRole,
    pub decision: Decision,
    pub approver: UserId,
    pub decided_at: i64,
    pub comments: Option<String>,
    pub resulting_status: ApplicationStatus,
}

/// A persisted application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub applicant_id: UserId,

    /// UIN of the drone, copied from the registry when the form is saved.
    pub drone_uin: Option<String>,

    pub form: ApplicationForm,
    pub status: ApplicationStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub submitted_at: Option<i64>,

    /// Authority decisions in the order they were made.
    pub decisions: Vec<DecisionRecord>,
}

impl Application {
    /// Build a new application from applicant input.
    pub fn new(
        id: ApplicationId,
        applicant_id: UserId,
        form: ApplicationForm,
        drone_uin: Option<String>,
        submission: Submission,
        now: i64,
    ) -> Self {
        let mut application = Self {
            id,
            applicant_id,
            drone_uin,
            form,
            status: ApplicationStatus::Draft,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            decisions: Vec::new(),
        };
        if submission.is_submit() {
            application.mark_submitted(now);
        }
        application
    }

    pub fn drone_id(&self) -> DroneId {
        self.form.drone_id
    }

    pub fn start_at(&self) -> i64 {
        self.form.start_at
    }

    pub fn end_at(&self) -> i64 {
        self.form.end_at
    }

    /// Only drafts accept applicant edits.
    pub fn can_be_modified(&self) -> bool {
        self.status == ApplicationStatus::Draft
    }

    /// Replace the editable content. Callers check `can_be_modified` first.
    pub fn apply_form(
        &mut self,
        form: ApplicationForm,
        drone_uin: Option<String>,
        submission: Submission,
        now: i64,
    ) {
        self.form = form;
        self.drone_uin = drone_uin;
        self.updated_at = now;
        if submission.is_submit() {
            self.mark_submitted(now);
        }
    }

    fn mark_submitted(&mut self, now: i64) {
        self.status = ApplicationStatus::Submitted;
        self.submitted_at = Some(now);
    }

    /// Record an authority decision and move to its resulting status.
    pub fn record_decision(&mut self, record: DecisionRecord) {
        self.status = record.resulting_status;
        self.updated_at = record.decided_at;
        self.decisions.push(record);
    }

    /// Whether the authorized window has fully elapsed at `now`.
    pub fn flight_complete(&self, now: i64) -> bool {
        now >= self.form.end_at
    }
}
