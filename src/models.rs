use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Terminal outcome of an application. Set only by the close/offer
/// operations on the engine, never by a plain field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalResult {
    Offered,
    Accepted,
    Rejected,
    Declined,
    Ghosted,
    Withdrawn,
}

impl FinalResult {
    /// The subset of results that close an application "for cause".
    pub fn is_close_reason(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Declined | Self::Ghosted | Self::Withdrawn
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "offered" => Some(Self::Offered),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "declined" => Some(Self::Declined),
            "ghosted" => Some(Self::Ghosted),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }
}

impl fmt::Display for FinalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Offered => "offered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Declined => "declined",
            Self::Ghosted => "ghosted",
            Self::Withdrawn => "withdrawn",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// HR reached out (resets the ghosting counter).
    HrCalled,
    /// The user sent a follow-up nudge.
    FollowedUp,
    /// Offer letter, assignment, etc. received (resets the ghosting counter).
    DocumentReceived,
    /// An interview round was scheduled or logged.
    InterviewRound,
    /// Free-form note, including automatic stage-change annotations.
    Note,
}

impl InteractionKind {
    /// Stable identifier used in storage and on the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HrCalled => "hr_called",
            Self::FollowedUp => "followed_up",
            Self::DocumentReceived => "document_received",
            Self::InterviewRound => "interview_round",
            Self::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hr_called" => Some(Self::HrCalled),
            "followed_up" => Some(Self::FollowedUp),
            "document_received" => Some(Self::DocumentReceived),
            "interview_round" => Some(Self::InterviewRound),
            "note" => Some(Self::Note),
            _ => None,
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HrCalled => "HR contacted me",
            Self::FollowedUp => "I followed up",
            Self::DocumentReceived => "document received",
            Self::InterviewRound => "interview round",
            Self::Note => "note",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    Video,
    Onsite,
    Phone,
}

impl InterviewMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "onsite" => Some(Self::Onsite),
            "phone" => Some(Self::Phone),
            _ => None,
        }
    }
}

impl fmt::Display for InterviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Video => "video",
            Self::Onsite => "onsite",
            Self::Phone => "phone",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl InterviewStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "rescheduled" => Some(Self::Rescheduled),
            _ => None,
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Pending,
    Cleared,
    NotCleared,
}

impl RoundOutcome {
    /// Stable identifier used in storage and on the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cleared => "cleared",
            Self::NotCleared => "not_cleared",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "cleared" => Some(Self::Cleared),
            "not_cleared" => Some(Self::NotCleared),
            _ => None,
        }
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Cleared => "cleared",
            Self::NotCleared => "not cleared",
        };
        f.write_str(s)
    }
}

/// Immutable timestamped log entry attached to an application.
/// Never edited once created; only appended or removed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub kind: InteractionKind,
    pub notes: String,
    pub at: DateTime<Utc>,
    /// Set when `kind` is `InterviewRound`, linking to the interview.
    #[serde(default)]
    pub interview_id: Option<String>,
}

impl Interaction {
    pub fn new(kind: InteractionKind, notes: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            notes: notes.into(),
            at,
            interview_id: None,
        }
    }

    pub fn with_interview(mut self, interview_id: impl Into<String>) -> Self {
        self.interview_id = Some(interview_id.into());
        self
    }
}

/// Per-application follow-up sub-state. Exactly one per application,
/// created inactive. Mutated only through the follow-up service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FollowUpTracker {
    pub is_active: bool,
    /// Follow-ups sent since the last HR response.
    pub attempts: u32,
    pub last_follow_up_at: Option<DateTime<Utc>>,
    /// When the next nudge should fire. Cleared on stop/dismiss.
    pub next_reminder_at: Option<DateTime<Utc>>,
    /// Override of the default initial wait, in days.
    pub hr_deadline_days: Option<i64>,
    /// What is being waited on, e.g. "screening" or "feedback_round_2".
    pub waiting_context: Option<String>,
}

/// One job opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub company: String,
    pub role: String,
    pub contact: Option<String>,
    /// Via a staffing vendor rather than direct HR.
    #[serde(default)]
    pub via_vendor: bool,
    pub vendor_name: Option<String>,
    pub opportunity_type: Option<String>,
    pub work_mode: Option<String>,
    pub city: Option<String>,
    pub expected_salary: Option<i64>,
    pub notice_period: Option<String>,
    /// Ordered, duplicates disallowed.
    #[serde(default)]
    pub skills: Vec<String>,
    pub description: Option<String>,
    /// Always a registered stage code; 0 is terminal.
    pub current_stage: u8,
    pub final_result: Option<FinalResult>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub follow_up: FollowUpTracker,
}

impl Application {
    pub fn is_closed(&self) -> bool {
        self.current_stage == crate::stages::CLOSED
    }

    /// Refresh `last_updated`, keeping it monotonically non-decreasing.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_updated {
            self.last_updated = now;
        }
    }
}

/// Field set accepted from the outside for create/update. Lifecycle
/// fields (stage, result, tracker) are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub company: String,
    pub role: String,
    pub contact: Option<String>,
    #[serde(default)]
    pub via_vendor: bool,
    pub vendor_name: Option<String>,
    pub opportunity_type: Option<String>,
    pub work_mode: Option<String>,
    pub city: Option<String>,
    pub expected_salary: Option<i64>,
    pub notice_period: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub description: Option<String>,
}

impl ApplicationDraft {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.company.trim().is_empty() {
            errors.push("company name is required".to_string());
        }
        if self.role.trim().is_empty() {
            errors.push("role is required".to_string());
        }
        errors
    }

    pub fn into_application(self, now: DateTime<Utc>, initial_stage: u8) -> Application {
        Application {
            id: Uuid::new_v4().to_string(),
            company: self.company.trim().to_string(),
            role: self.role.trim().to_string(),
            contact: self.contact,
            via_vendor: self.via_vendor,
            vendor_name: self.vendor_name,
            opportunity_type: self.opportunity_type,
            work_mode: self.work_mode,
            city: self.city,
            expected_salary: self.expected_salary,
            notice_period: self.notice_period,
            skills: dedup_skills(self.skills),
            description: self.description,
            current_stage: initial_stage,
            final_result: None,
            created_at: now,
            last_updated: now,
            interactions: Vec::new(),
            follow_up: FollowUpTracker::default(),
        }
    }
}

/// Drop duplicate tags while preserving first-seen order.
pub fn dedup_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for skill in skills {
        let trimmed = skill.trim().to_string();
        if trimmed.is_empty() {
            continue;
        }
        if !seen.iter().any(|s| s.eq_ignore_ascii_case(&trimmed)) {
            seen.push(trimmed);
        }
    }
    seen
}

/// One scheduled interview round, 1:N per application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: String,
    pub application_id: String,
    /// Unique and increasing per application; assigned as max + 1.
    pub round: u32,
    /// Free-form category, e.g. "technical", "hr", "managerial".
    pub kind: String,
    pub mode: InterviewMode,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    /// Meeting link (video) or address (onsite), as relevant for the mode.
    pub location: Option<String>,
    pub interviewer: Option<String>,
    pub prep_notes: Option<String>,
    pub status: InterviewStatus,
    pub round_outcome: RoundOutcome,
    /// Lead time before `scheduled_at` at which the reminder fires.
    pub reminder_minutes: u32,
    #[serde(default)]
    pub reminder_sent: bool,
    pub outcome_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inputs for scheduling a round. Required fields are optional here so
/// that validation can report everything missing in one pass.
#[derive(Debug, Clone, Default)]
pub struct InterviewDraft {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub kind: Option<String>,
    pub mode: Option<InterviewMode>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub interviewer: Option<String>,
    pub prep_notes: Option<String>,
    pub reminder_minutes: Option<u32>,
}

/// Editable subset of an interview. `id`, `application_id`, `round` and
/// `created_at` are immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct InterviewUpdate {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub kind: Option<String>,
    pub mode: Option<InterviewMode>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub interviewer: Option<String>,
    pub prep_notes: Option<String>,
    pub status: Option<InterviewStatus>,
    pub reminder_minutes: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_requires_company_and_role() {
        let draft = ApplicationDraft::default();
        let errors = draft.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("company"));
        assert!(errors[1].contains("role"));
    }

    #[test]
    fn skills_dedup_preserves_order() {
        let skills = vec![
            "rust".to_string(),
            "SQL".to_string(),
            "Rust".to_string(),
            "".to_string(),
            "sql".to_string(),
        ];
        assert_eq!(dedup_skills(skills), vec!["rust", "SQL"]);
    }

    #[test]
    fn touch_never_goes_backwards() {
        let now = Utc::now();
        let draft = ApplicationDraft {
            company: "Acme".into(),
            role: "Engineer".into(),
            ..Default::default()
        };
        let mut app = draft.into_application(now, 1);
        let earlier = now - chrono::Duration::hours(1);
        app.touch(earlier);
        assert_eq!(app.last_updated, now);
        let later = now + chrono::Duration::hours(1);
        app.touch(later);
        assert_eq!(app.last_updated, later);
    }

    #[test]
    fn final_result_round_trips_through_parse() {
        for s in ["offered", "accepted", "rejected", "declined", "ghosted", "withdrawn"] {
            let result = FinalResult::parse(s).unwrap();
            assert_eq!(result.to_string(), s);
        }
        assert!(FinalResult::parse("hired").is_none());
    }
}
